//! Driver event records.
//!
//! The radio driver delivers events in ordered batches. Each record is one
//! variant of the closed [`DriverEvent`] enum, so consumers match on kinds
//! exhaustively instead of comparing opaque identifiers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::PeerAddress;
use crate::params::{ConnectionParams, HciStatus};
use crate::types::Role;

/// An ordered batch of driver events.
pub type EventBatch = Vec<DriverEvent>;

/// One event delivered by the radio driver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "family", rename_all = "snake_case"))]
pub enum DriverEvent {
    /// Generic access (advertising, scanning, connections).
    Gap(GapEvent),
    /// GATT client.
    Gattc(GattcEvent),
    /// GATT server.
    Gatts(GattsEvent),
    /// An event kind this crate does not model.
    Unknown {
        /// Driver event identifier.
        id: u16,
        /// Driver event name, if reported.
        name: String,
    },
}

impl DriverEvent {
    /// Driver-style name of the event kind, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            DriverEvent::Gap(event) => event.name(),
            DriverEvent::Gattc(event) => event.kind.name(),
            DriverEvent::Gatts(event) => event.kind.name(),
            DriverEvent::Unknown { name, .. } => name,
        }
    }
}

impl From<GapEvent> for DriverEvent {
    fn from(event: GapEvent) -> Self {
        DriverEvent::Gap(event)
    }
}

impl From<AdvReport> for DriverEvent {
    fn from(report: AdvReport) -> Self {
        DriverEvent::Gap(GapEvent::AdvReport(report))
    }
}

/// GAP events.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum GapEvent {
    /// A connection was established.
    Connected {
        /// Handle assigned to the connection.
        conn_handle: u16,
        /// Address of the remote.
        peer_addr: PeerAddress,
        /// Local role in this connection.
        role: Role,
    },
    /// A connection was terminated.
    Disconnected {
        /// Handle of the terminated connection.
        conn_handle: u16,
        /// Termination reason.
        reason: HciStatus,
    },
    /// Connection parameters were updated.
    ConnParamUpdate {
        /// Connection handle.
        conn_handle: u16,
        /// New parameters.
        params: ConnectionParams,
    },
    /// A GAP procedure timed out.
    Timeout {
        /// Connection handle, when the timeout relates to a connection.
        conn_handle: Option<u16>,
        /// Which procedure timed out.
        source: TimeoutSource,
    },
    /// Signal strength on a connection changed.
    RssiChanged {
        /// Connection handle.
        conn_handle: u16,
        /// New RSSI in dBm.
        rssi: i8,
    },
    /// An advertising report or scan response was received.
    AdvReport(AdvReport),
    /// The peer requests new connection parameters.
    ConnParamUpdateRequest {
        /// Connection handle.
        conn_handle: u16,
        /// Requested parameters.
        params: ConnectionParams,
    },
    /// A scan request was received while advertising.
    ScanReqReport {
        /// Address of the scanner.
        peer_addr: PeerAddress,
        /// RSSI of the request in dBm.
        rssi: i8,
    },
}

impl GapEvent {
    /// Driver-style name of the event kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            GapEvent::Connected { .. } => "BLE_GAP_EVT_CONNECTED",
            GapEvent::Disconnected { .. } => "BLE_GAP_EVT_DISCONNECTED",
            GapEvent::ConnParamUpdate { .. } => "BLE_GAP_EVT_CONN_PARAM_UPDATE",
            GapEvent::Timeout { .. } => "BLE_GAP_EVT_TIMEOUT",
            GapEvent::RssiChanged { .. } => "BLE_GAP_EVT_RSSI_CHANGED",
            GapEvent::AdvReport(_) => "BLE_GAP_EVT_ADV_REPORT",
            GapEvent::ConnParamUpdateRequest { .. } => "BLE_GAP_EVT_CONN_PARAM_UPDATE_REQUEST",
            GapEvent::ScanReqReport { .. } => "BLE_GAP_EVT_SCAN_REQ_REPORT",
        }
    }
}

/// Source of a GAP timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TimeoutSource {
    /// Advertising stopped because its timeout elapsed.
    Advertising,
    /// A security request went unanswered.
    SecurityRequest,
    /// Scanning stopped because its timeout elapsed.
    Scan,
    /// A connection attempt was not completed in time.
    Connection,
}

/// An advertising report.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdvReport {
    /// Address of the advertiser.
    pub peer_addr: PeerAddress,
    /// RSSI in dBm.
    pub rssi: i8,
    /// Whether this report is a scan response.
    pub scan_rsp: bool,
    /// Decoded AD fields.
    pub data: AdData,
}

impl AdvReport {
    /// Create a report with empty AD data.
    #[must_use]
    pub fn new(peer_addr: PeerAddress, rssi: i8) -> Self {
        Self {
            peer_addr,
            rssi,
            scan_rsp: false,
            data: AdData::default(),
        }
    }

    /// Mark the report as scan response.
    #[must_use]
    pub fn scan_response(mut self, scan_rsp: bool) -> Self {
        self.scan_rsp = scan_rsp;
        self
    }

    /// Replace the AD data.
    #[must_use]
    pub fn with_data(mut self, data: AdData) -> Self {
        self.data = data;
        self
    }
}

/// AD fields decoded by the driver from an advertising payload.
///
/// Absent fields are `None`. Service UUID lists hold expanded UUIDs,
/// see [`crate::uuid::from_u16`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdData {
    /// Complete local name.
    pub long_local_name: Option<String>,
    /// Shortened local name.
    pub short_local_name: Option<String>,
    /// Incomplete list of 16-bit service UUIDs.
    pub uuid16_more_available: Option<Vec<Uuid>>,
    /// Complete list of 16-bit service UUIDs.
    pub uuid16_complete: Option<Vec<Uuid>>,
    /// Incomplete list of 32-bit service UUIDs.
    pub uuid32_more_available: Option<Vec<Uuid>>,
    /// Complete list of 32-bit service UUIDs.
    pub uuid32_complete: Option<Vec<Uuid>>,
    /// Incomplete list of 128-bit service UUIDs.
    pub uuid128_more_available: Option<Vec<Uuid>>,
    /// Complete list of 128-bit service UUIDs.
    pub uuid128_complete: Option<Vec<Uuid>>,
    /// TX power level in dBm.
    pub tx_power_level: Option<i8>,
}

/// GATT client event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GattcEventKind {
    /// Primary service discovery response.
    PrimaryServiceDiscovery,
    /// Relationship discovery response.
    RelationshipDiscovery,
    /// Characteristic discovery response.
    CharacteristicDiscovery,
    /// Descriptor discovery response.
    DescriptorDiscovery,
    /// Read-by-UUID response.
    CharValueByUuidRead,
    /// Read response.
    Read,
    /// Read-multiple response.
    CharValuesRead,
    /// Write response.
    Write,
    /// Handle value notification or indication.
    Hvx,
    /// Client procedure timeout.
    Timeout,
}

impl GattcEventKind {
    /// Driver-style name of the event kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PrimaryServiceDiscovery => "BLE_GATTC_EVT_PRIM_SRVC_DISC_RSP",
            Self::RelationshipDiscovery => "BLE_GATTC_EVT_REL_DISC_RSP",
            Self::CharacteristicDiscovery => "BLE_GATTC_EVT_CHAR_DISC_RSP",
            Self::DescriptorDiscovery => "BLE_GATTC_EVT_DESC_DISC_RSP",
            Self::CharValueByUuidRead => "BLE_GATTC_EVT_CHAR_VAL_BY_UUID_READ_RSP",
            Self::Read => "BLE_GATTC_EVT_READ_RSP",
            Self::CharValuesRead => "BLE_GATTC_EVT_CHAR_VALS_READ_RSP",
            Self::Write => "BLE_GATTC_EVT_WRITE_RSP",
            Self::Hvx => "BLE_GATTC_EVT_HVX",
            Self::Timeout => "BLE_GATTC_EVT_TIMEOUT",
        }
    }
}

/// A GATT client event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GattcEvent {
    /// Event kind.
    pub kind: GattcEventKind,
    /// Connection handle.
    pub conn_handle: u16,
}

/// GATT server event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GattsEventKind {
    /// Attribute written by the client.
    Write,
    /// Read or write authorization request.
    RwAuthorizeRequest,
    /// System attributes missing.
    SysAttrMissing,
    /// Handle value confirmation.
    Hvc,
    /// Service changed confirmation.
    ScConfirm,
    /// Server procedure timeout.
    Timeout,
}

impl GattsEventKind {
    /// Driver-style name of the event kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Write => "BLE_GATTS_EVT_WRITE",
            Self::RwAuthorizeRequest => "BLE_GATTS_EVT_RW_AUTHORIZE_REQUEST",
            Self::SysAttrMissing => "BLE_GATTS_EVT_SYS_ATTR_MISSING",
            Self::Hvc => "BLE_GATTS_EVT_HVC",
            Self::ScConfirm => "BLE_GATTS_EVT_SC_CONFIRM",
            Self::Timeout => "BLE_GATTS_EVT_TIMEOUT",
        }
    }
}

/// A GATT server event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GattsEvent {
    /// Event kind.
    pub kind: GattsEventKind,
    /// Connection handle.
    pub conn_handle: u16,
}

/// Severity of a driver log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LogSeverity {
    /// Trace.
    Trace,
    /// Debug.
    Debug,
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
    /// Fatal error.
    Fatal,
}

/// A log record emitted by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriverLog {
    /// Severity.
    pub severity: LogSeverity,
    /// Message text.
    pub message: String,
}

impl DriverLog {
    /// Create a log record.
    pub fn new(severity: LogSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}
