//! Adapter and remote-device state records.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::Address;

/// Serial link parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

/// Serial link flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FlowControl {
    /// No flow control.
    #[default]
    None,
    /// RTS/CTS hardware flow control.
    Hardware,
}

/// GAP role.
///
/// On a [`Device`] this is the role the remote plays. Anything observed
/// through advertisements is a [`Role::Peripheral`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Role {
    /// Scans and initiates connections.
    Central,
    /// Advertises and accepts connections.
    #[default]
    Peripheral,
}

impl Role {
    /// The role on the other end of a connection.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Role::Central => Role::Peripheral,
            Role::Peripheral => Role::Central,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Central => write!(f, "central"),
            Role::Peripheral => write!(f, "peripheral"),
        }
    }
}

/// Logical state of the local adapter.
///
/// One record exists per adapter instance. Flags only change after the
/// driver confirmed the corresponding operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdapterState {
    /// Identifier of the adapter instance.
    pub instance_id: String,
    /// Serial port the driver is attached to.
    pub port: String,
    /// Serial baud rate, once the link has been opened.
    pub baud_rate: Option<u32>,
    /// Serial parity, once the link has been opened.
    pub parity: Option<Parity>,
    /// Serial flow control, once the link has been opened.
    pub flow_control: Option<FlowControl>,
    /// Whether the serial link is open.
    pub available: bool,
    /// Whether a scan is running.
    pub scanning: bool,
    /// Whether advertising is running.
    pub advertising: bool,
    /// Whether an outgoing connection is being established.
    pub connecting: bool,
    /// Whether at least one connection is up.
    pub connected: bool,
    /// Radio firmware version string.
    pub firmware_version: Option<String>,
    /// GAP device name of the adapter.
    pub device_name: Option<String>,
    /// Address of the adapter.
    pub address: Option<Address>,
}

impl AdapterState {
    /// Create the initial state for an adapter instance.
    pub fn new(instance_id: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            port: port.into(),
            ..Default::default()
        }
    }
}

/// A remote device seen by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Device {
    /// Device address (registry key, immutable).
    pub address: Address,
    /// Advertised local name.
    pub name: Option<String>,
    /// GAP role of the remote.
    pub role: Role,
    /// Service UUIDs from the most recent advertising packet.
    pub adv_data_uuids: Vec<Uuid>,
    /// Service UUIDs from the most recent scan response.
    pub scan_rsp_uuids: Vec<Uuid>,
    /// Advertised TX power level in dBm.
    pub tx_power: Option<i8>,
    /// Last received signal strength in dBm.
    pub rssi: Option<i8>,
    /// Connection handle while connected.
    pub connection_handle: Option<u16>,
}

impl Device {
    /// Create an empty device record.
    #[must_use]
    pub fn new(address: Address, role: Role) -> Self {
        Self {
            address,
            name: None,
            role,
            adv_data_uuids: Vec::new(),
            scan_rsp_uuids: Vec::new(),
            tx_power: None,
            rssi: None,
            connection_handle: None,
        }
    }

    /// Whether the device currently holds a connection handle.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection_handle.is_some()
    }

    /// All advertised service UUIDs, advertising data first.
    pub fn service_uuids(&self) -> impl Iterator<Item = &Uuid> {
        self.adv_data_uuids.iter().chain(self.scan_rsp_uuids.iter())
    }
}
