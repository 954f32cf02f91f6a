//! The adapter: command surface, committed state, and event pump.
//!
//! An [`Adapter`] owns the state of one local radio and the registry of
//! remote devices it has seen. Commands go to the [`Transport`] one at a
//! time; state is only committed after the transport confirmed the request.
//! Driver events arrive through the sink handed to [`Transport::open`] and
//! are applied by a background pump task.
//!
//! Failed transport calls are reported twice: the command returns
//! [`Error::Transport`], and an [`AdapterEvent::Error`] carrying a
//! human-readable message is broadcast to subscribers.

use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use ble_adapter_types::{
    AdapterState, Address, AddressCycleMode, AddressType, AdvertisingOptions, AdvertisingParams,
    ConnectOptions, ConnectionParams, Device, DriverEvent, DriverLog, HciStatus, LogSeverity,
    ScanParams,
};

use crate::advertising::AdvertisingData;
use crate::config::AdapterConfig;
use crate::diff::AdapterStatePatch;
use crate::dispatch::EventDispatcher;
use crate::error::{Error, Result};
use crate::events::{EventReceiver, Notifier};
use crate::store::AdapterStore;
use crate::transport::{Transport, TransportError, TransportResult, TransportStreams, sink_channel};

/// Handle to one local BLE adapter.
///
/// Cloning is cheap; clones share the same state, registry, and transport.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ble_adapter_core::{Adapter, AdapterConfig, MockTransport, ScanParams};
///
/// #[tokio::main]
/// async fn main() -> ble_adapter_core::Result<()> {
///     let transport = Arc::new(MockTransport::new());
///     let adapter = Adapter::new(transport, AdapterConfig::new("demo", "/dev/ttyACM0"));
///
///     adapter.open().await?;
///     adapter.start_scan(ScanParams::default()).await?;
///     assert!(adapter.state().await.scanning);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Adapter {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    config: AdapterConfig,
    store: Mutex<AdapterStore>,
    /// Serializes transport requests.
    command_lock: Mutex<()>,
    notifier: Notifier,
    shutdown: CancellationToken,
    /// Token of the running event pump, while open.
    pump: Mutex<Option<CancellationToken>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("instance_id", &self.inner.config.instance_id)
            .field("port", &self.inner.config.port)
            .finish()
    }
}

impl Adapter {
    /// Create a closed adapter.
    pub fn new(transport: Arc<dyn Transport>, config: AdapterConfig) -> Self {
        let notifier = Notifier::new(config.notification_capacity.max(1));
        let state = AdapterState::new(config.instance_id.clone(), config.port.clone());
        Self {
            inner: Arc::new(Inner {
                transport,
                store: Mutex::new(AdapterStore::new(state, notifier.clone())),
                command_lock: Mutex::new(()),
                notifier,
                shutdown: CancellationToken::new(),
                pump: Mutex::new(None),
                config,
            }),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.inner.config.instance_id
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.inner.config
    }

    /// Subscribe to adapter notifications.
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.notifier.subscribe()
    }

    /// Snapshot of the adapter state.
    pub async fn state(&self) -> AdapterState {
        self.inner.store.lock().await.state().clone()
    }

    /// Snapshot of all known devices. Order is not significant.
    pub async fn devices(&self) -> Vec<Device> {
        self.inner.store.lock().await.registry().list()
    }

    /// Snapshot of one device.
    pub async fn device(&self, address: &Address) -> Option<Device> {
        self.inner.store.lock().await.registry().get(address).cloned()
    }

    // --- Link ---

    /// Open the serial link and start the event pump.
    ///
    /// Serial settings are taken from the configuration and recorded in the
    /// adapter state once the link is up. Opening an open adapter restarts
    /// the pump on the new sink.
    #[tracing::instrument(level = "info", skip(self), fields(instance = %self.inner.config.instance_id, port = %self.inner.config.port))]
    pub async fn open(&self) -> Result<()> {
        self.inner.config.validate()?;
        let _guard = self.inner.command_lock.lock().await;

        let settings = self.inner.config.serial_settings();
        let (sink, streams) = sink_channel(self.inner.config.event_channel_capacity);

        if let Err(e) = self
            .inner
            .transport
            .open(&self.inner.config.port, &settings, sink)
            .await
        {
            return Err(self
                .fail(format!("Error occurred opening serial port: {}", e), e)
                .await);
        }

        let token = self.inner.shutdown.child_token();
        if let Some(previous) = self.inner.pump.lock().await.replace(token.clone()) {
            previous.cancel();
        }
        spawn_pump(Arc::downgrade(&self.inner), streams, token);

        let patch = AdapterStatePatch::new()
            .serial(settings.baud_rate, settings.parity, settings.flow_control)
            .available(true);
        self.inner.store.lock().await.change_adapter_state(&patch);
        info!("Adapter opened");
        Ok(())
    }

    /// Stop the event pump and close the serial link.
    ///
    /// Closing is best effort: a transport error is logged and the adapter
    /// is marked unavailable regardless. Activity flags are cleared and every
    /// device loses its connection handle, each announced as
    /// [`crate::AdapterEvent::DeviceChanged`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] if the adapter was not opened.
    #[tracing::instrument(level = "info", skip(self), fields(instance = %self.inner.config.instance_id))]
    pub async fn close(&self) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;

        let Some(token) = self.inner.pump.lock().await.take() else {
            return Err(Error::NotOpen);
        };
        token.cancel();

        if let Err(e) = self.inner.transport.close().await {
            warn!(error = %e, "Transport close failed, marking adapter unavailable anyway");
        }

        let patch = AdapterStatePatch::new()
            .available(false)
            .scanning(false)
            .advertising(false)
            .connecting(false)
            .connected(false);
        let mut store = self.inner.store.lock().await;
        // Handles die with the link; the driver may reuse them after a reopen.
        let released = store.release_connections();
        store.change_adapter_state(&patch);
        drop(store);
        info!(released = released.len(), "Adapter closed");
        Ok(())
    }

    /// Apply a batch of driver events.
    ///
    /// The pump calls this for every batch it receives; it is public so
    /// events can also be fed from outside a transport.
    pub async fn process_events(&self, batch: &[DriverEvent]) {
        self.inner.dispatch(batch).await;
    }

    /// Query firmware version, device name, and address from the radio.
    ///
    /// The three reads run in that order. A failed read is broadcast as an
    /// error and skipped; the others still run. All successful reads are
    /// committed together and the resulting snapshot is returned.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_adapter_state(&self) -> Result<AdapterState> {
        let _guard = self.inner.command_lock.lock().await;
        let transport = &self.inner.transport;
        let mut patch = AdapterStatePatch::new();

        match transport.get_version().await {
            Ok(version) => patch = patch.firmware_version(version),
            Err(e) => {
                self.fail("Failed to retrieve firmware version", e).await;
            }
        }
        match transport.get_device_name().await {
            Ok(name) => patch = patch.device_name(name),
            Err(e) => {
                self.fail("Failed to retrieve device name", e).await;
            }
        }
        match transport.get_address().await {
            Ok(address) => patch = patch.address(address),
            Err(e) => {
                self.fail("Failed to retrieve device address", e).await;
            }
        }

        let mut store = self.inner.store.lock().await;
        store.change_adapter_state(&patch);
        Ok(store.state().clone())
    }

    // --- Central role ---

    #[tracing::instrument(level = "info", skip(self))]
    pub async fn start_scan(&self, params: ScanParams) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;
        let outcome = self.inner.transport.start_scan(&params).await;
        self.commit(
            outcome,
            "Error occurred when starting scan",
            AdapterStatePatch::new().scanning(true),
        )
        .await
    }

    #[tracing::instrument(level = "info", skip(self))]
    pub async fn stop_scan(&self) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;
        let outcome = self.inner.transport.stop_scan().await;
        self.commit(
            outcome,
            "Error occurred when stopping scan",
            AdapterStatePatch::new().scanning(false),
        )
        .await
    }

    /// Start connecting to `address`.
    ///
    /// The radio stops scanning while it connects. The connection itself is
    /// reported later by a connected event.
    #[tracing::instrument(level = "info", skip(self, address, options), fields(address = %address))]
    pub async fn connect(&self, address: Address, options: ConnectOptions) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;
        let outcome = self
            .inner
            .transport
            .connect(address, &options.scan_params, &options.conn_params)
            .await;
        self.commit(
            outcome,
            format!("Could not connect to {}", address),
            AdapterStatePatch::new().scanning(false).connecting(true),
        )
        .await
    }

    #[tracing::instrument(level = "info", skip(self))]
    pub async fn cancel_connect(&self) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;
        let outcome = self.inner.transport.cancel_connect().await;
        self.commit(
            outcome,
            "Error occurred when canceling connection",
            AdapterStatePatch::new().connecting(false),
        )
        .await
    }

    // --- Peripheral role ---

    /// Set advertising payloads and start advertising.
    ///
    /// Payloads are encoded before anything is sent; an oversized payload
    /// fails with [`Error::InvalidConfig`] without touching the radio.
    #[tracing::instrument(level = "info", skip_all, fields(interval = options.interval, timeout = options.timeout))]
    pub async fn start_advertising(
        &self,
        adv_data: &AdvertisingData,
        scan_rsp_data: &AdvertisingData,
        options: AdvertisingOptions,
    ) -> Result<()> {
        let adv_bytes = adv_data.encode()?;
        let scan_rsp_bytes = scan_rsp_data.encode()?;

        let _guard = self.inner.command_lock.lock().await;
        let transport = &self.inner.transport;

        if let Err(e) = transport
            .set_advertising_data(adv_bytes, scan_rsp_bytes)
            .await
        {
            return Err(self.fail("Failed to set advertising data", e).await);
        }

        let params = AdvertisingParams::from(&options);
        let outcome = transport.start_advertising(&params).await;
        self.commit(
            outcome,
            "Failed to start advertising",
            AdapterStatePatch::new().advertising(true),
        )
        .await
    }

    #[tracing::instrument(level = "info", skip(self))]
    pub async fn stop_advertising(&self) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;
        let outcome = self.inner.transport.stop_advertising().await;
        self.commit(
            outcome,
            "Error occurred when stopping advertising",
            AdapterStatePatch::new().advertising(false),
        )
        .await
    }

    // --- Connections ---

    /// Disconnect from a connected device.
    ///
    /// The device stays in the registry; its handle is released when the
    /// driver reports the disconnection.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceNotFound`] or [`Error::NotConnected`] if there is no
    /// connection to `address`. These are not broadcast.
    #[tracing::instrument(level = "info", skip(self, address), fields(address = %address))]
    pub async fn disconnect(&self, address: &Address) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;
        let handle = self.connection_handle(address).await?;
        let outcome = self
            .inner
            .transport
            .disconnect(handle, HciStatus::REMOTE_USER_TERMINATED_CONNECTION)
            .await;
        self.commit(
            outcome,
            "Failed to disconnect",
            AdapterStatePatch::new().connected(false),
        )
        .await
    }

    /// Request new connection parameters for the link to `address`.
    #[tracing::instrument(level = "info", skip(self, address, params), fields(address = %address))]
    pub async fn update_connection_parameters(
        &self,
        address: &Address,
        params: ConnectionParams,
    ) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;
        let handle = self.connection_handle(address).await?;
        let outcome = self
            .inner
            .transport
            .update_connection_parameters(handle, Some(&params))
            .await;
        self.commit(
            outcome,
            "Failed to update connection parameters",
            AdapterStatePatch::new(),
        )
        .await
    }

    /// Reject a parameter update requested by the peer at `address`.
    #[tracing::instrument(level = "info", skip(self, address), fields(address = %address))]
    pub async fn reject_connection_parameters(&self, address: &Address) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;
        let handle = self.connection_handle(address).await?;
        let outcome = self
            .inner
            .transport
            .update_connection_parameters(handle, None)
            .await;
        self.commit(
            outcome,
            "Failed to reject connection parameters",
            AdapterStatePatch::new(),
        )
        .await
    }

    // --- GAP configuration ---

    /// Set the GAP device name of the adapter.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn set_name(&self, name: &str) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;
        let outcome = self.inner.transport.set_device_name(name).await;
        self.commit(
            outcome,
            "Failed to set name to adapter",
            AdapterStatePatch::new().device_name(name),
        )
        .await
    }

    /// Set the adapter address. Address cycling is disabled.
    #[tracing::instrument(level = "info", skip(self, address), fields(address = %address))]
    pub async fn set_address(&self, address: Address, address_type: AddressType) -> Result<()> {
        let _guard = self.inner.command_lock.lock().await;
        let outcome = self
            .inner
            .transport
            .set_address(address, address_type, AddressCycleMode::None)
            .await;
        self.commit(
            outcome,
            "Failed to set address",
            AdapterStatePatch::new().address(address),
        )
        .await
    }

    // --- Helpers ---

    async fn connection_handle(&self, address: &Address) -> Result<u16> {
        let store = self.inner.store.lock().await;
        let device = store
            .registry()
            .get(address)
            .ok_or(Error::DeviceNotFound(*address))?;
        device.connection_handle.ok_or(Error::NotConnected(*address))
    }

    /// Commit `patch` if the transport call succeeded, otherwise report it.
    async fn commit(
        &self,
        outcome: TransportResult<()>,
        message: impl Into<String>,
        patch: AdapterStatePatch,
    ) -> Result<()> {
        match outcome {
            Ok(()) => {
                if !patch.is_empty() {
                    self.inner.store.lock().await.change_adapter_state(&patch);
                }
                Ok(())
            }
            Err(e) => Err(self.fail(message, e).await),
        }
    }

    /// Broadcast a failed transport call and convert it into an [`Error`].
    async fn fail(&self, message: impl Into<String>, err: TransportError) -> Error {
        debug!(error = %err, "Transport call failed");
        // Held so the error is ordered with state notifications.
        let _store = self.inner.store.lock().await;
        self.inner.notifier.error(message);
        Error::Transport(err)
    }
}

impl Inner {
    async fn dispatch(&self, batch: &[DriverEvent]) {
        let mut store = self.store.lock().await;
        EventDispatcher::new(&mut store).dispatch_batch(batch);
    }
}

/// Drain transport traffic until cancelled, the transport drops its sink,
/// or the adapter goes away.
fn spawn_pump(inner: Weak<Inner>, streams: TransportStreams, token: CancellationToken) {
    let TransportStreams {
        mut events,
        mut logs,
    } = streams;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Event pump cancelled");
                    break;
                }
                batch = events.recv() => {
                    let Some(batch) = batch else {
                        debug!("Transport closed the event channel, stopping pump");
                        break;
                    };
                    let Some(inner) = inner.upgrade() else {
                        break;
                    };
                    inner.dispatch(&batch).await;
                }
                Some(log) = logs.recv() => forward_log(&log),
            }
        }
    });
}

fn forward_log(log: &DriverLog) {
    let message = &log.message;
    match log.severity {
        LogSeverity::Trace => trace!(target: "ble_adapter_core::driver", "{}", message),
        LogSeverity::Debug => debug!(target: "ble_adapter_core::driver", "{}", message),
        LogSeverity::Info => info!(target: "ble_adapter_core::driver", "{}", message),
        LogSeverity::Warning => warn!(target: "ble_adapter_core::driver", "{}", message),
        LogSeverity::Error | LogSeverity::Fatal => {
            error!(target: "ble_adapter_core::driver", "{}", message)
        }
    }
}
