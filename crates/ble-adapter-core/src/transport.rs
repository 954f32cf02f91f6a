//! The driver seam.
//!
//! The adapter talks to the radio exclusively through the [`Transport`]
//! trait. Requests are async calls that resolve once the driver acknowledged
//! them. Driver-initiated traffic (event batches and log records) flows the
//! other way through the [`TransportSink`] handed to [`Transport::open`].

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use ble_adapter_types::{
    Address, AddressCycleMode, AddressType, AdvertisingParams, ConnectionParams, DriverLog,
    EventBatch, FlowControl, HciStatus, Parity, ScanParams,
};

/// A failed driver call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed with code 0x{code:04X}: {message}")]
pub struct TransportError {
    /// Name of the driver call.
    pub operation: String,
    /// Driver error code.
    pub code: u32,
    /// Human-readable description.
    pub message: String,
}

impl TransportError {
    /// Create a transport error.
    pub fn new(operation: impl Into<String>, code: u32, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            code,
            message: message.into(),
        }
    }
}

/// Result type for driver calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Serial link settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

/// Where a transport delivers driver-initiated traffic.
///
/// Batches must be sent in the order the driver produced them. Dropping the
/// sink (all clones) ends the adapter's event pump.
#[derive(Debug, Clone)]
pub struct TransportSink {
    events: mpsc::Sender<EventBatch>,
    logs: mpsc::Sender<DriverLog>,
}

impl TransportSink {
    /// Deliver an event batch. Returns `false` once the adapter stopped listening.
    pub async fn send_events(&self, batch: EventBatch) -> bool {
        self.events.send(batch).await.is_ok()
    }

    /// Deliver a driver log record. Returns `false` once the adapter stopped listening.
    pub async fn send_log(&self, log: DriverLog) -> bool {
        self.logs.send(log).await.is_ok()
    }

    /// Whether the adapter side has gone away.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

/// Receiving half of a [`TransportSink`].
#[derive(Debug)]
pub struct TransportStreams {
    pub events: mpsc::Receiver<EventBatch>,
    pub logs: mpsc::Receiver<DriverLog>,
}

/// Create a connected sink/streams pair, each channel bounded to `capacity`.
pub fn sink_channel(capacity: usize) -> (TransportSink, TransportStreams) {
    let (events_tx, events_rx) = mpsc::channel(capacity);
    let (logs_tx, logs_rx) = mpsc::channel(capacity);
    (
        TransportSink {
            events: events_tx,
            logs: logs_tx,
        },
        TransportStreams {
            events: events_rx,
            logs: logs_rx,
        },
    )
}

/// Requests the adapter issues to the radio driver.
///
/// Each call resolves exactly once. Implementations do not need to serialize
/// calls themselves; the adapter keeps at most one request in flight.
#[async_trait]
pub trait Transport: Send + Sync {
    // --- Link ---

    /// Open the serial link and start delivering traffic to `sink`.
    async fn open(
        &self,
        port: &str,
        settings: &SerialSettings,
        sink: TransportSink,
    ) -> TransportResult<()>;

    /// Close the serial link.
    async fn close(&self) -> TransportResult<()>;

    // --- Queries ---

    async fn get_version(&self) -> TransportResult<String>;

    async fn get_device_name(&self) -> TransportResult<String>;

    async fn get_address(&self) -> TransportResult<Address>;

    // --- GAP configuration ---

    async fn set_device_name(&self, name: &str) -> TransportResult<()>;

    async fn set_address(
        &self,
        address: Address,
        address_type: AddressType,
        cycle_mode: AddressCycleMode,
    ) -> TransportResult<()>;

    // --- Central role ---

    async fn start_scan(&self, params: &ScanParams) -> TransportResult<()>;

    async fn stop_scan(&self) -> TransportResult<()>;

    async fn connect(
        &self,
        address: Address,
        scan_params: &ScanParams,
        conn_params: &ConnectionParams,
    ) -> TransportResult<()>;

    async fn cancel_connect(&self) -> TransportResult<()>;

    // --- Peripheral role ---

    /// Set raw advertising and scan response payloads.
    async fn set_advertising_data(&self, adv_data: Bytes, scan_rsp_data: Bytes)
    -> TransportResult<()>;

    async fn start_advertising(&self, params: &AdvertisingParams) -> TransportResult<()>;

    async fn stop_advertising(&self) -> TransportResult<()>;

    // --- Connections ---

    async fn disconnect(&self, conn_handle: u16, reason: HciStatus) -> TransportResult<()>;

    /// Request new connection parameters, or reject a peer's request with `None`.
    async fn update_connection_parameters(
        &self,
        conn_handle: u16,
        params: Option<&ConnectionParams>,
    ) -> TransportResult<()>;
}
