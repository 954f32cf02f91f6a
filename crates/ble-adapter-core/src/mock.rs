//! Mock transport implementation for testing.
//!
//! This module provides a transport that can be used for unit testing
//! without requiring a radio on a serial port.
//!
//! The [`MockTransport`] implements the [`Transport`] trait, so an
//! [`Adapter`](crate::Adapter) can be driven end to end in tests.
//!
//! # Features
//!
//! - **Failure injection**: Fail chosen operations, permanently or a set number of times
//! - **Latency simulation**: Add artificial delays to simulate a slow serial link
//! - **Call recording**: Inspect which driver calls were made and with what arguments
//! - **Event injection**: Push event batches and log records into an open adapter

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use ble_adapter_types::{
    Address, AddressCycleMode, AddressType, AdvertisingParams, ConnectionParams, DriverLog,
    EventBatch, HciStatus, ScanParams,
};

use crate::transport::{SerialSettings, Transport, TransportError, TransportResult, TransportSink};

/// Driver calls of the [`Transport`] trait, for failure injection and call
/// recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Open,
    Close,
    GetVersion,
    GetDeviceName,
    GetAddress,
    SetDeviceName,
    SetAddress,
    StartScan,
    StopScan,
    Connect,
    CancelConnect,
    SetAdvertisingData,
    StartAdvertising,
    StopAdvertising,
    Disconnect,
    UpdateConnectionParameters,
}

impl Operation {
    /// Name of the driver call, as used in [`TransportError::operation`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::GetVersion => "get_version",
            Self::GetDeviceName => "gap_get_device_name",
            Self::GetAddress => "gap_get_address",
            Self::SetDeviceName => "gap_set_device_name",
            Self::SetAddress => "gap_set_address",
            Self::StartScan => "gap_start_scan",
            Self::StopScan => "gap_stop_scan",
            Self::Connect => "gap_connect",
            Self::CancelConnect => "gap_cancel_connect",
            Self::SetAdvertisingData => "gap_set_adv_data",
            Self::StartAdvertising => "gap_start_advertising",
            Self::StopAdvertising => "gap_stop_advertising",
            Self::Disconnect => "gap_disconnect",
            Self::UpdateConnectionParameters => "gap_update_connection_parameters",
        }
    }
}

/// Error code returned by injected failures (`NRF_ERROR_INVALID_STATE`).
pub const MOCK_ERROR_CODE: u32 = 0x08;

/// A mock radio transport for testing.
///
/// # Example
///
/// ```
/// use ble_adapter_core::{MockTransport, Operation, Transport};
///
/// #[tokio::main]
/// async fn main() {
///     let transport = MockTransport::builder()
///         .version("4.1.4")
///         .fail_on(Operation::StartScan)
///         .build();
///
///     assert_eq!(transport.get_version().await.unwrap(), "4.1.4");
///     assert!(transport.stop_scan().await.is_ok());
///     assert_eq!(transport.calls().await.len(), 2);
/// }
/// ```
pub struct MockTransport {
    version: String,
    device_name: RwLock<String>,
    address: RwLock<Address>,
    latency_ms: AtomicU64,
    /// Operations that always fail.
    failing: RwLock<HashSet<Operation>>,
    /// Operations that fail for their next N calls.
    transient: RwLock<HashMap<Operation, u32>>,
    sink: RwLock<Option<TransportSink>>,
    settings: RwLock<Option<SerialSettings>>,
    calls: RwLock<Vec<Operation>>,
    disconnects: RwLock<Vec<(u16, HciStatus)>>,
    advertising_data: RwLock<Option<(Bytes, Bytes)>>,
    parameter_updates: RwLock<Vec<(u16, Option<ConnectionParams>)>>,
    open_count: AtomicU32,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("version", &self.version)
            .field("open_count", &self.open_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock transport where every call succeeds.
    pub fn new() -> Self {
        MockTransportBuilder::new().build()
    }

    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::new()
    }

    /// Make `operation` fail (or succeed again) from now on.
    pub async fn set_fail(&self, operation: Operation, fail: bool) {
        let mut failing = self.failing.write().await;
        if fail {
            failing.insert(operation);
        } else {
            failing.remove(&operation);
        }
    }

    /// Fail the next `count` calls of `operation`, then succeed.
    pub async fn set_transient_failures(&self, operation: Operation, count: u32) {
        self.transient.write().await.insert(operation, count);
    }

    /// Add artificial delay to every call.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Push an event batch to the adapter, as the driver would.
    ///
    /// Returns `false` if the transport is not open or the adapter stopped listening.
    pub async fn push_events(&self, batch: EventBatch) -> bool {
        let sink = self.sink.read().await.clone();
        match sink {
            Some(sink) => sink.send_events(batch).await,
            None => false,
        }
    }

    /// Push a driver log record to the adapter.
    pub async fn push_log(&self, log: DriverLog) -> bool {
        let sink = self.sink.read().await.clone();
        match sink {
            Some(sink) => sink.send_log(log).await,
            None => false,
        }
    }

    /// Drop the sink, as a driver that went away would.
    pub async fn drop_sink(&self) {
        self.sink.write().await.take();
    }

    /// Every call made so far, in order, including failed ones.
    pub async fn calls(&self) -> Vec<Operation> {
        self.calls.read().await.clone()
    }

    /// Serial settings of the last successful open.
    pub async fn serial_settings(&self) -> Option<SerialSettings> {
        *self.settings.read().await
    }

    /// Handles and reasons of successful disconnect calls.
    pub async fn disconnects(&self) -> Vec<(u16, HciStatus)> {
        self.disconnects.read().await.clone()
    }

    /// Last advertising and scan response payloads set.
    pub async fn advertising_data(&self) -> Option<(Bytes, Bytes)> {
        self.advertising_data.read().await.clone()
    }

    /// Connection parameter updates and rejections (`None`) sent.
    pub async fn parameter_updates(&self) -> Vec<(u16, Option<ConnectionParams>)> {
        self.parameter_updates.read().await.clone()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> u32 {
        self.open_count.load(Ordering::Relaxed)
    }

    /// Record a call and decide whether it fails.
    async fn call(&self, operation: Operation) -> TransportResult<()> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        self.calls.write().await.push(operation);

        if let Some(remaining) = self.transient.write().await.get_mut(&operation)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(mock_error(operation));
        }

        if self.failing.read().await.contains(&operation) {
            return Err(mock_error(operation));
        }
        Ok(())
    }
}

fn mock_error(operation: Operation) -> TransportError {
    TransportError::new(operation.name(), MOCK_ERROR_CODE, "Mock failure")
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(
        &self,
        _port: &str,
        settings: &SerialSettings,
        sink: TransportSink,
    ) -> TransportResult<()> {
        self.call(Operation::Open).await?;
        *self.settings.write().await = Some(*settings);
        *self.sink.write().await = Some(sink);
        self.open_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&self) -> TransportResult<()> {
        self.call(Operation::Close).await?;
        self.sink.write().await.take();
        Ok(())
    }

    async fn get_version(&self) -> TransportResult<String> {
        self.call(Operation::GetVersion).await?;
        Ok(self.version.clone())
    }

    async fn get_device_name(&self) -> TransportResult<String> {
        self.call(Operation::GetDeviceName).await?;
        Ok(self.device_name.read().await.clone())
    }

    async fn get_address(&self) -> TransportResult<Address> {
        self.call(Operation::GetAddress).await?;
        Ok(*self.address.read().await)
    }

    async fn set_device_name(&self, name: &str) -> TransportResult<()> {
        self.call(Operation::SetDeviceName).await?;
        *self.device_name.write().await = name.to_string();
        Ok(())
    }

    async fn set_address(
        &self,
        address: Address,
        _address_type: AddressType,
        _cycle_mode: AddressCycleMode,
    ) -> TransportResult<()> {
        self.call(Operation::SetAddress).await?;
        *self.address.write().await = address;
        Ok(())
    }

    async fn start_scan(&self, _params: &ScanParams) -> TransportResult<()> {
        self.call(Operation::StartScan).await
    }

    async fn stop_scan(&self) -> TransportResult<()> {
        self.call(Operation::StopScan).await
    }

    async fn connect(
        &self,
        _address: Address,
        _scan_params: &ScanParams,
        _conn_params: &ConnectionParams,
    ) -> TransportResult<()> {
        self.call(Operation::Connect).await
    }

    async fn cancel_connect(&self) -> TransportResult<()> {
        self.call(Operation::CancelConnect).await
    }

    async fn set_advertising_data(
        &self,
        adv_data: Bytes,
        scan_rsp_data: Bytes,
    ) -> TransportResult<()> {
        self.call(Operation::SetAdvertisingData).await?;
        *self.advertising_data.write().await = Some((adv_data, scan_rsp_data));
        Ok(())
    }

    async fn start_advertising(&self, _params: &AdvertisingParams) -> TransportResult<()> {
        self.call(Operation::StartAdvertising).await
    }

    async fn stop_advertising(&self) -> TransportResult<()> {
        self.call(Operation::StopAdvertising).await
    }

    async fn disconnect(&self, conn_handle: u16, reason: HciStatus) -> TransportResult<()> {
        self.call(Operation::Disconnect).await?;
        self.disconnects.write().await.push((conn_handle, reason));
        Ok(())
    }

    async fn update_connection_parameters(
        &self,
        conn_handle: u16,
        params: Option<&ConnectionParams>,
    ) -> TransportResult<()> {
        self.call(Operation::UpdateConnectionParameters).await?;
        self.parameter_updates
            .write()
            .await
            .push((conn_handle, params.copied()));
        Ok(())
    }
}

/// Builder for creating mock transports with custom settings.
#[derive(Debug)]
pub struct MockTransportBuilder {
    version: String,
    device_name: String,
    address: Address,
    failing: HashSet<Operation>,
    latency: Duration,
}

impl Default for MockTransportBuilder {
    fn default() -> Self {
        Self {
            version: "4.1.4".to_string(),
            device_name: "nRF5x".to_string(),
            address: Address::new([0xE4, 0x5F, 0x01, 0x00, 0x00, 0x01]),
            failing: HashSet::new(),
            latency: Duration::ZERO,
        }
    }
}

impl MockTransportBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the firmware version reported by `get_version`.
    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Set the name reported by `get_device_name`.
    #[must_use]
    pub fn device_name(mut self, name: &str) -> Self {
        self.device_name = name.to_string();
        self
    }

    /// Set the address reported by `get_address`.
    #[must_use]
    pub fn address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Make `operation` always fail.
    #[must_use]
    pub fn fail_on(mut self, operation: Operation) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Build the mock transport.
    #[must_use]
    pub fn build(self) -> MockTransport {
        MockTransport {
            version: self.version,
            device_name: RwLock::new(self.device_name),
            address: RwLock::new(self.address),
            latency_ms: AtomicU64::new(self.latency.as_millis() as u64),
            failing: RwLock::new(self.failing),
            transient: RwLock::new(HashMap::new()),
            sink: RwLock::new(None),
            settings: RwLock::new(None),
            calls: RwLock::new(Vec::new()),
            disconnects: RwLock::new(Vec::new()),
            advertising_data: RwLock::new(None),
            parameter_updates: RwLock::new(Vec::new()),
            open_count: AtomicU32::new(0),
        }
    }
}
