//! Parameters passed to the driver with GAP commands.
//!
//! Time values use the radio's native units so they can be handed to the
//! driver unchanged: scan and advertising intervals in 0.625 ms units,
//! connection intervals in 1.25 ms units, supervision timeouts in 10 ms units.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::address::PeerAddress;

/// Scan parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScanParams {
    /// Send scan requests to obtain scan responses.
    pub active: bool,
    /// Scan interval (0.625 ms units).
    pub interval: u16,
    /// Scan window (0.625 ms units).
    pub window: u16,
    /// Scan timeout in seconds, 0 for no timeout.
    pub timeout: u16,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            active: true,
            interval: 0x00A0,
            window: 0x0050,
            timeout: 0,
        }
    }
}

impl ScanParams {
    /// Create scan parameters with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set active scanning.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set interval and window.
    #[must_use]
    pub fn interval(mut self, interval: u16, window: u16) -> Self {
        self.interval = interval;
        self.window = window;
        self
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn timeout(mut self, timeout: u16) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Connection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionParams {
    /// Minimum connection interval (1.25 ms units).
    pub min_conn_interval: u16,
    /// Maximum connection interval (1.25 ms units).
    pub max_conn_interval: u16,
    /// Slave latency in connection events.
    pub slave_latency: u16,
    /// Supervision timeout (10 ms units).
    pub conn_sup_timeout: u16,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            min_conn_interval: 0x0018,
            max_conn_interval: 0x0028,
            slave_latency: 0,
            conn_sup_timeout: 0x01F4,
        }
    }
}

/// Options for establishing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectOptions {
    /// Scan parameters used while looking for the peer.
    pub scan_params: ScanParams,
    /// Connection parameters requested for the link.
    pub conn_params: ConnectionParams,
}

/// Advertising PDU type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AdvertisingType {
    /// Connectable undirected (ADV_IND).
    #[default]
    ConnectableUndirected,
    /// Connectable directed (ADV_DIRECT_IND).
    ConnectableDirected,
    /// Scannable undirected (ADV_SCAN_IND).
    ScannableUndirected,
    /// Non-connectable undirected (ADV_NONCONN_IND).
    NonConnectableUndirected,
}

/// Advertising filter policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FilterPolicy {
    /// Accept scan and connect requests from anyone.
    #[default]
    Any,
    /// Filter scan requests with the whitelist.
    FilterScanRequests,
    /// Filter connect requests with the whitelist.
    FilterConnectRequests,
    /// Filter both.
    FilterBoth,
}

/// Advertising channels to skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelMask {
    /// Skip channel 37.
    pub ch_37_off: bool,
    /// Skip channel 38.
    pub ch_38_off: bool,
    /// Skip channel 39.
    pub ch_39_off: bool,
}

/// Caller-facing advertising options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdvertisingOptions {
    /// Advertising interval (0.625 ms units).
    pub interval: u16,
    /// Advertising timeout in seconds, 0 for no timeout.
    pub timeout: u16,
    /// Peer address for directed advertising.
    pub peer: Option<PeerAddress>,
    /// Channels to skip.
    pub channel_mask: ChannelMask,
}

impl Default for AdvertisingOptions {
    fn default() -> Self {
        Self {
            interval: 40,
            timeout: 180,
            peer: None,
            channel_mask: ChannelMask::default(),
        }
    }
}

/// Full advertising parameters as handed to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdvertisingParams {
    /// PDU type.
    pub adv_type: AdvertisingType,
    /// Peer address for directed advertising.
    pub peer_addr: Option<PeerAddress>,
    /// Filter policy.
    pub filter_policy: FilterPolicy,
    /// Advertising interval (0.625 ms units).
    pub interval: u16,
    /// Advertising timeout in seconds.
    pub timeout: u16,
    /// Channels to skip.
    pub channel_mask: ChannelMask,
}

impl From<&AdvertisingOptions> for AdvertisingParams {
    /// Connectable undirected advertising that accepts anyone.
    fn from(options: &AdvertisingOptions) -> Self {
        Self {
            adv_type: AdvertisingType::ConnectableUndirected,
            peer_addr: options.peer,
            filter_policy: FilterPolicy::Any,
            interval: options.interval,
            timeout: options.timeout,
            channel_mask: options.channel_mask,
        }
    }
}

/// Private address cycling mode used when setting the adapter address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AddressCycleMode {
    /// Use the given address as-is.
    #[default]
    None,
    /// Let the radio cycle private addresses.
    Auto,
}

/// HCI status code, used as disconnect reason.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct HciStatus(pub u8);

impl HciStatus {
    /// Connection supervision timeout.
    pub const CONNECTION_TIMEOUT: HciStatus = HciStatus(0x08);
    /// The remote user terminated the connection.
    pub const REMOTE_USER_TERMINATED_CONNECTION: HciStatus = HciStatus(0x13);
    /// The local host terminated the connection.
    pub const LOCAL_HOST_TERMINATED_CONNECTION: HciStatus = HciStatus(0x16);
    /// The connection failed to be established.
    pub const CONN_FAILED_TO_BE_ESTABLISHED: HciStatus = HciStatus(0x3E);

    fn description(self) -> Option<&'static str> {
        match self {
            Self::CONNECTION_TIMEOUT => Some("connection timeout"),
            Self::REMOTE_USER_TERMINATED_CONNECTION => Some("remote user terminated connection"),
            Self::LOCAL_HOST_TERMINATED_CONNECTION => Some("local host terminated connection"),
            Self::CONN_FAILED_TO_BE_ESTABLISHED => Some("connection failed to be established"),
            _ => None,
        }
    }
}

impl fmt::Debug for HciStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HciStatus(0x{:02X})", self.0)
    }
}

impl fmt::Display for HciStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => write!(f, "{} (0x{:02X})", text, self.0),
            None => write!(f, "HCI status 0x{:02X}", self.0),
        }
    }
}
