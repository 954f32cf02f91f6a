//! Advertisement report parsing.
//!
//! Turns the AD fields of an advertising report (or scan response) into a
//! [`DevicePatch`] for the remote device. Parsing is pure: the registry and
//! notification decisions live in the dispatcher.

use ble_adapter_types::{AdData, AdvReport, Address};
use uuid::Uuid;

use crate::diff::DevicePatch;

/// Fields extracted from one advertising report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAdvertisement {
    /// Address of the advertiser.
    pub address: Address,
    /// Proposed device fields.
    pub patch: DevicePatch,
    /// Service UUIDs found in the report, in AD-type order.
    pub uuids: Vec<Uuid>,
    /// Whether the report was a scan response.
    pub scan_response: bool,
}

/// Parse an advertising report.
///
/// - The complete local name wins over the shortened one; empty names count
///   as absent.
/// - Service UUIDs are collected with [`collect_service_uuids`] and proposed
///   for `scan_rsp_uuids` on scan responses, `adv_data_uuids` otherwise.
///   The list is always proposed, so a report without UUIDs empties it.
/// - TX power is copied when present; RSSI is always copied.
///
/// The address type is not inspected.
pub fn parse_advertisement(report: &AdvReport) -> ParsedAdvertisement {
    let data = &report.data;
    let mut patch = DevicePatch::new().rssi(report.rssi);

    if let Some(name) = local_name(data) {
        patch = patch.name(name);
    }

    let uuids = collect_service_uuids(data);
    patch = if report.scan_rsp {
        patch.scan_rsp_uuids(uuids.clone())
    } else {
        patch.adv_data_uuids(uuids.clone())
    };

    if let Some(tx_power) = data.tx_power_level {
        patch = patch.tx_power(tx_power);
    }

    ParsedAdvertisement {
        address: report.peer_addr.address,
        patch,
        uuids,
        scan_response: report.scan_rsp,
    }
}

fn local_name(data: &AdData) -> Option<&str> {
    non_empty(&data.long_local_name).or_else(|| non_empty(&data.short_local_name))
}

fn non_empty(name: &Option<String>) -> Option<&str> {
    name.as_deref().filter(|n| !n.is_empty())
}

/// Concatenate all service UUID fields of `data`.
///
/// The order is fixed: 16-bit incomplete, 16-bit complete, 32-bit incomplete,
/// 32-bit complete, 128-bit incomplete, 128-bit complete.
pub fn collect_service_uuids(data: &AdData) -> Vec<Uuid> {
    [
        &data.uuid16_more_available,
        &data.uuid16_complete,
        &data.uuid32_more_available,
        &data.uuid32_complete,
        &data.uuid128_more_available,
        &data.uuid128_complete,
    ]
    .into_iter()
    .flatten()
    .flat_map(|list| list.iter().copied())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ble_adapter_types::uuid::{from_u16, from_u32};
    use ble_adapter_types::{AddressType, PeerAddress};
    use uuid::uuid;

    fn report(data: AdData) -> AdvReport {
        let address: Address = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        AdvReport::new(PeerAddress::public(address), -60).with_data(data)
    }

    #[test]
    fn test_uuid_concatenation_order() {
        let a = from_u16(0x180D);
        let b = from_u32(0x1234_5678);
        let c = uuid!("f0cd1400-95da-4f4b-9ac8-aa55d312af0c");

        let data = AdData {
            uuid16_complete: Some(vec![a]),
            uuid32_complete: Some(vec![b]),
            uuid128_complete: Some(vec![c]),
            ..Default::default()
        };

        assert_eq!(parse_advertisement(&report(data)).uuids, vec![a, b, c]);
    }

    #[test]
    fn test_all_six_uuid_fields_in_order() {
        let ids: Vec<Uuid> = (1..=6).map(from_u16).collect();
        let data = AdData {
            uuid128_complete: Some(vec![ids[5]]),
            uuid128_more_available: Some(vec![ids[4]]),
            uuid32_complete: Some(vec![ids[3]]),
            uuid32_more_available: Some(vec![ids[2]]),
            uuid16_complete: Some(vec![ids[1]]),
            uuid16_more_available: Some(vec![ids[0]]),
            ..Default::default()
        };

        assert_eq!(collect_service_uuids(&data), ids);
    }

    #[test]
    fn test_long_name_preferred() {
        let data = AdData {
            long_local_name: Some("Heart Rate Sensor".to_string()),
            short_local_name: Some("HRS".to_string()),
            ..Default::default()
        };
        let parsed = parse_advertisement(&report(data));
        assert_eq!(parsed.patch.name.as_deref(), Some("Heart Rate Sensor"));
    }

    #[test]
    fn test_short_name_fallback() {
        let data = AdData {
            long_local_name: Some(String::new()),
            short_local_name: Some("HRS".to_string()),
            ..Default::default()
        };
        let parsed = parse_advertisement(&report(data));
        assert_eq!(parsed.patch.name.as_deref(), Some("HRS"));
    }

    #[test]
    fn test_no_name_leaves_name_unset() {
        let parsed = parse_advertisement(&report(AdData::default()));
        assert_eq!(parsed.patch.name, None);
    }

    #[test]
    fn test_scan_response_targets_scan_rsp_uuids() {
        let data = AdData {
            uuid16_complete: Some(vec![from_u16(0x180F)]),
            ..Default::default()
        };
        let parsed = parse_advertisement(&report(data).scan_response(true));

        assert!(parsed.scan_response);
        assert_eq!(parsed.patch.scan_rsp_uuids, Some(vec![from_u16(0x180F)]));
        assert_eq!(parsed.patch.adv_data_uuids, None);
    }

    #[test]
    fn test_advertisement_always_proposes_uuid_list() {
        let parsed = parse_advertisement(&report(AdData::default()));
        assert_eq!(parsed.patch.adv_data_uuids, Some(Vec::new()));
        assert_eq!(parsed.patch.scan_rsp_uuids, None);
    }

    #[test]
    fn test_tx_power_and_rssi() {
        let data = AdData {
            tx_power_level: Some(0),
            ..Default::default()
        };
        let parsed = parse_advertisement(&report(data));
        assert_eq!(parsed.patch.tx_power, Some(0));
        assert_eq!(parsed.patch.rssi, Some(-60));

        let parsed = parse_advertisement(&report(AdData::default()));
        assert_eq!(parsed.patch.tx_power, None);
        assert_eq!(parsed.patch.rssi, Some(-60));
    }

    #[test]
    fn test_address_type_not_filtered() {
        let address: Address = "C0:11:22:33:44:55".parse().unwrap();
        let report = AdvReport::new(
            PeerAddress::new(address, AddressType::RandomPrivateNonResolvable),
            -80,
        );
        assert_eq!(parse_advertisement(&report).address, address);
    }
}
