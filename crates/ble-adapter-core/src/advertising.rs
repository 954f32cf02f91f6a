//! Advertising payload encoding.
//!
//! [`AdvertisingData`] describes what the adapter advertises as a peripheral.
//! It is encoded into the length/type/value AD structures the radio sends
//! verbatim. Legacy advertising PDUs carry at most 31 bytes.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use ble_adapter_types::uuid::to_short;

use crate::error::{Error, Result};

/// Maximum size of a legacy advertising or scan response payload.
pub const MAX_LEGACY_PAYLOAD: usize = 31;

/// Assigned AD type numbers.
pub mod ad_type {
    pub const FLAGS: u8 = 0x01;
    pub const UUID16_MORE_AVAILABLE: u8 = 0x02;
    pub const UUID16_COMPLETE: u8 = 0x03;
    pub const UUID32_MORE_AVAILABLE: u8 = 0x04;
    pub const UUID32_COMPLETE: u8 = 0x05;
    pub const UUID128_MORE_AVAILABLE: u8 = 0x06;
    pub const UUID128_COMPLETE: u8 = 0x07;
    pub const SHORT_LOCAL_NAME: u8 = 0x08;
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;
    pub const TX_POWER_LEVEL: u8 = 0x0A;
    pub const MANUFACTURER_SPECIFIC_DATA: u8 = 0xFF;
}

/// LE General Discoverable Mode.
pub const FLAG_LE_GENERAL_DISCOVERABLE: u8 = 0x02;
/// BR/EDR Not Supported.
pub const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

/// Content of an advertising or scan response payload.
///
/// ```
/// use ble_adapter_core::advertising::AdvertisingData;
/// use ble_adapter_core::uuids::HEART_RATE_SERVICE;
///
/// let payload = AdvertisingData::new()
///     .general_discoverable()
///     .complete_local_name("HRM")
///     .service(HEART_RATE_SERVICE)
///     .encode()
///     .unwrap();
/// assert_eq!(&payload[..], &[0x02, 0x01, 0x06, 0x04, 0x09, b'H', b'R', b'M', 0x03, 0x03, 0x0D, 0x18]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisingData {
    flags: Option<u8>,
    complete_local_name: Option<String>,
    short_local_name: Option<String>,
    tx_power_level: Option<i8>,
    services: Vec<Uuid>,
    manufacturer_data: Option<(u16, Bytes)>,
}

impl AdvertisingData {
    /// Create an empty payload description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flags field.
    #[must_use]
    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = Some(flags);
        self
    }

    /// General discoverable, LE only.
    #[must_use]
    pub fn general_discoverable(self) -> Self {
        self.flags(FLAG_LE_GENERAL_DISCOVERABLE | FLAG_BR_EDR_NOT_SUPPORTED)
    }

    #[must_use]
    pub fn complete_local_name(mut self, name: impl Into<String>) -> Self {
        self.complete_local_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn short_local_name(mut self, name: impl Into<String>) -> Self {
        self.short_local_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn tx_power_level(mut self, dbm: i8) -> Self {
        self.tx_power_level = Some(dbm);
        self
    }

    /// Add a service UUID. Aliases of the Base UUID are sent in short form.
    #[must_use]
    pub fn service(mut self, uuid: Uuid) -> Self {
        self.services.push(uuid);
        self
    }

    #[must_use]
    pub fn manufacturer_data(mut self, company_id: u16, data: impl Into<Bytes>) -> Self {
        self.manufacturer_data = Some((company_id, data.into()));
        self
    }

    /// Whether nothing would be advertised.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Encode into AD structures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the payload exceeds
    /// [`MAX_LEGACY_PAYLOAD`] bytes.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(MAX_LEGACY_PAYLOAD);

        if let Some(flags) = self.flags {
            put_field(&mut buf, ad_type::FLAGS, &[flags]);
        }
        if let Some(name) = &self.complete_local_name {
            put_field(&mut buf, ad_type::COMPLETE_LOCAL_NAME, name.as_bytes());
        }
        if let Some(name) = &self.short_local_name {
            put_field(&mut buf, ad_type::SHORT_LOCAL_NAME, name.as_bytes());
        }
        if let Some(dbm) = self.tx_power_level {
            put_field(&mut buf, ad_type::TX_POWER_LEVEL, &dbm.to_le_bytes());
        }

        let mut uuid16 = BytesMut::new();
        let mut uuid32 = BytesMut::new();
        let mut uuid128 = BytesMut::new();
        for uuid in &self.services {
            match to_short(uuid) {
                Some(short) => match u16::try_from(short) {
                    Ok(short) => uuid16.put_u16_le(short),
                    Err(_) => uuid32.put_u32_le(short),
                },
                None => uuid128.put_u128_le(uuid.as_u128()),
            }
        }
        if !uuid16.is_empty() {
            put_field(&mut buf, ad_type::UUID16_COMPLETE, &uuid16);
        }
        if !uuid32.is_empty() {
            put_field(&mut buf, ad_type::UUID32_COMPLETE, &uuid32);
        }
        if !uuid128.is_empty() {
            put_field(&mut buf, ad_type::UUID128_COMPLETE, &uuid128);
        }

        if let Some((company_id, data)) = &self.manufacturer_data {
            let mut value = BytesMut::with_capacity(2 + data.len());
            value.put_u16_le(*company_id);
            value.put_slice(data);
            put_field(&mut buf, ad_type::MANUFACTURER_SPECIFIC_DATA, &value);
        }

        if buf.len() > MAX_LEGACY_PAYLOAD {
            return Err(Error::invalid_config(format!(
                "advertising payload is {} bytes, limit is {}",
                buf.len(),
                MAX_LEGACY_PAYLOAD
            )));
        }

        Ok(buf.freeze())
    }
}

fn put_field(buf: &mut BytesMut, ad_type: u8, value: &[u8]) {
    // Length covers the type byte. Oversized values are caught by the
    // overall payload check in `encode`.
    buf.put_u8(value.len().saturating_add(1).min(u8::MAX as usize) as u8);
    buf.put_u8(ad_type);
    buf.put_slice(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ble_adapter_types::uuid::{BATTERY_SERVICE, HEART_RATE_SERVICE, from_u32};
    use uuid::uuid;

    #[test]
    fn test_empty_payload() {
        let data = AdvertisingData::new();
        assert!(data.is_empty());
        assert!(data.encode().unwrap().is_empty());
    }

    #[test]
    fn test_flags_and_name() {
        let payload = AdvertisingData::new()
            .flags(0x06)
            .short_local_name("Nordic")
            .encode()
            .unwrap();
        assert_eq!(
            &payload[..],
            &[0x02, 0x01, 0x06, 0x07, 0x08, b'N', b'o', b'r', b'd', b'i', b'c']
        );
    }

    #[test]
    fn test_tx_power_is_signed() {
        let payload = AdvertisingData::new().tx_power_level(-4).encode().unwrap();
        assert_eq!(&payload[..], &[0x02, 0x0A, 0xFC]);
    }

    #[test]
    fn test_service_widths() {
        let vendor = uuid!("f0cd1400-95da-4f4b-9ac8-aa55d312af0c");
        let payload = AdvertisingData::new()
            .service(HEART_RATE_SERVICE)
            .service(BATTERY_SERVICE)
            .service(from_u32(0x0001_0000))
            .service(vendor)
            .encode()
            .unwrap();

        assert_eq!(&payload[..6], &[0x05, 0x03, 0x0D, 0x18, 0x0F, 0x18]);
        assert_eq!(&payload[6..12], &[0x05, 0x05, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(payload[12], 17);
        assert_eq!(payload[13], ad_type::UUID128_COMPLETE);
        // 128-bit UUIDs are sent fully little-endian.
        assert_eq!(payload[14], 0x0C);
        assert_eq!(payload[29], 0xF0);
    }

    #[test]
    fn test_manufacturer_data() {
        let payload = AdvertisingData::new()
            .manufacturer_data(0x0059, vec![0xAA, 0xBB])
            .encode()
            .unwrap();
        assert_eq!(&payload[..], &[0x05, 0xFF, 0x59, 0x00, 0xAA, 0xBB]);
    }

    #[test]
    fn test_payload_too_long() {
        let result = AdvertisingData::new()
            .complete_local_name("a name that is far too long for legacy advertising")
            .encode();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
