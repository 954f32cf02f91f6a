//! Bluetooth service UUIDs.
//!
//! Advertisements carry 16-bit, 32-bit and 128-bit service UUIDs. All of them
//! are represented as full [`Uuid`] values: short forms are expanded on the
//! Bluetooth Base UUID so that lists mixing all three widths compare by value.

use uuid::{Uuid, uuid};

use crate::error::{ParseError, ParseResult};

/// The Bluetooth Base UUID that 16-bit and 32-bit UUIDs are aliases into.
pub const BLUETOOTH_BASE_UUID: Uuid = uuid!("00000000-0000-1000-8000-00805f9b34fb");

const BASE_LOW_BITS: u128 = BLUETOOTH_BASE_UUID.as_u128();
const SHORT_MASK: u128 = 0xFFFF_FFFF << 96;

// --- Standard BLE Service UUIDs ---

/// Generic Access Profile (GAP) service.
pub const GAP_SERVICE: Uuid = uuid!("00001800-0000-1000-8000-00805f9b34fb");

/// Generic Attribute Profile (GATT) service.
pub const GATT_SERVICE: Uuid = uuid!("00001801-0000-1000-8000-00805f9b34fb");

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

/// Heart Rate service.
pub const HEART_RATE_SERVICE: Uuid = uuid!("0000180d-0000-1000-8000-00805f9b34fb");

/// Battery service.
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

// --- Standard Characteristic UUIDs ---

/// Device name characteristic.
pub const DEVICE_NAME: Uuid = uuid!("00002a00-0000-1000-8000-00805f9b34fb");

/// Heart rate measurement characteristic.
pub const HEART_RATE_MEASUREMENT: Uuid = uuid!("00002a37-0000-1000-8000-00805f9b34fb");

/// Expand a 16-bit UUID alias.
#[must_use]
pub const fn from_u16(short: u16) -> Uuid {
    from_u32(short as u32)
}

/// Expand a 32-bit UUID alias.
#[must_use]
pub const fn from_u32(short: u32) -> Uuid {
    Uuid::from_u128(BASE_LOW_BITS | ((short as u128) << 96))
}

/// Return the short alias of `uuid` if it lies on the Bluetooth Base UUID.
#[must_use]
pub const fn to_short(uuid: &Uuid) -> Option<u32> {
    let value = uuid.as_u128();
    if value & !SHORT_MASK == BASE_LOW_BITS {
        Some((value >> 96) as u32)
    } else {
        None
    }
}

/// Parse a service UUID written as 4 hex digits, 8 hex digits, or a full UUID.
///
/// ```
/// use ble_adapter_types::uuid::{parse_service_uuid, HEART_RATE_SERVICE};
///
/// assert_eq!(parse_service_uuid("180D").unwrap(), HEART_RATE_SERVICE);
/// assert_eq!(parse_service_uuid("0000180d").unwrap(), HEART_RATE_SERVICE);
/// ```
pub fn parse_service_uuid(s: &str) -> ParseResult<Uuid> {
    let invalid = || ParseError::InvalidUuid(s.to_string());
    let is_hex = s.bytes().all(|b| b.is_ascii_hexdigit());

    match s.len() {
        4 if is_hex => u16::from_str_radix(s, 16)
            .map(from_u16)
            .map_err(|_| invalid()),
        8 if is_hex => u32::from_str_radix(s, 16)
            .map(from_u32)
            .map_err(|_| invalid()),
        _ => Uuid::parse_str(s).map_err(|_| invalid()),
    }
}
