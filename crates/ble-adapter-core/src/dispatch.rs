//! Routing of driver events to state changes.
//!
//! [`EventDispatcher`] borrows the store for the duration of one batch and
//! turns every [`DriverEvent`] into diffs and notifications. Event kinds that
//! carry no state for this core are logged at debug level and skipped; they
//! never surface as errors.

use ble_adapter_types::{
    AdvReport, DriverEvent, GapEvent, HciStatus, PeerAddress, Role, TimeoutSource,
};
use tracing::{debug, trace};

use crate::advertisement::parse_advertisement;
use crate::diff::{AdapterStatePatch, DevicePatch};
use crate::events::AdapterEvent;
use crate::store::AdapterStore;

/// How a single driver event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The event was applied to adapter or device state.
    Handled,
    /// A known event kind this core does not act on.
    Unsupported,
    /// An event id the driver bindings do not know.
    Unknown,
}

/// Applies driver events to an [`AdapterStore`].
pub struct EventDispatcher<'a> {
    store: &'a mut AdapterStore,
}

impl<'a> EventDispatcher<'a> {
    pub fn new(store: &'a mut AdapterStore) -> Self {
        Self { store }
    }

    /// Handle a batch in order. Each event is processed independently.
    pub fn dispatch_batch(&mut self, batch: &[DriverEvent]) {
        trace!(count = batch.len(), "Dispatching event batch");
        for event in batch {
            self.dispatch(event);
        }
    }

    /// Handle one event.
    pub fn dispatch(&mut self, event: &DriverEvent) -> Disposition {
        match event {
            DriverEvent::Gap(gap) => self.dispatch_gap(gap),
            DriverEvent::Gattc(gattc) => {
                debug!(
                    event = gattc.kind.name(),
                    conn_handle = gattc.conn_handle,
                    "Unsupported GATTC event"
                );
                Disposition::Unsupported
            }
            DriverEvent::Gatts(gatts) => {
                debug!(
                    event = gatts.kind.name(),
                    conn_handle = gatts.conn_handle,
                    "Unsupported GATTS event"
                );
                Disposition::Unsupported
            }
            DriverEvent::Unknown { id, name } => {
                debug!(id, name = %name, "Unknown event");
                Disposition::Unknown
            }
        }
    }

    fn dispatch_gap(&mut self, event: &GapEvent) -> Disposition {
        match event {
            GapEvent::AdvReport(report) => self.on_adv_report(report),
            GapEvent::Connected {
                conn_handle,
                peer_addr,
                role,
            } => self.on_connected(*conn_handle, peer_addr, *role),
            GapEvent::Disconnected {
                conn_handle,
                reason,
            } => self.on_disconnected(*conn_handle, *reason),
            GapEvent::RssiChanged { conn_handle, rssi } => {
                self.on_rssi_changed(*conn_handle, *rssi)
            }
            GapEvent::Timeout { source, .. } => self.on_timeout(*source),
            GapEvent::ConnParamUpdate { .. }
            | GapEvent::ConnParamUpdateRequest { .. }
            | GapEvent::ScanReqReport { .. } => {
                debug!(event = event.name(), "Unsupported GAP event");
                Disposition::Unsupported
            }
        }
    }

    fn on_adv_report(&mut self, report: &AdvReport) -> Disposition {
        let parsed = parse_advertisement(report);
        self.store
            .observe_device(parsed.address, Role::Peripheral, &parsed.patch);
        Disposition::Handled
    }

    fn on_connected(&mut self, conn_handle: u16, peer: &PeerAddress, role: Role) -> Disposition {
        let address = peer.address;
        let bind = DevicePatch::new().connection_handle(Some(conn_handle));

        // A handle belongs to one link. A stale holder from an earlier link
        // loses it before the new peer is bound.
        if let Some(stale) = self
            .store
            .registry()
            .find_by_handle(conn_handle)
            .map(|d| d.address)
            .filter(|stale| *stale != address)
        {
            debug!(%stale, conn_handle, "Releasing stale connection handle");
            self.store
                .change_device(&stale, &DevicePatch::new().connection_handle(None));
        }

        // Handle binding is announced by DeviceConnected, not DeviceChanged.
        // Peers we never saw advertise are announced as discovered first.
        let device = if self.store.registry().get(&address).is_some() {
            self.store.registry_mut().update(&address, &bind);
            self.store.registry().get(&address).cloned()
        } else {
            Some(self.store.observe_device(address, role.opposite(), &bind))
        };

        let mut patch = AdapterStatePatch::new().connecting(false).connected(true);
        if role == Role::Peripheral {
            // The radio stops advertising once a central connects.
            patch = patch.advertising(false);
        }
        self.store.change_adapter_state(&patch);

        debug!(%address, conn_handle, %role, "Connected");
        if let Some(device) = device {
            self.store.emit(AdapterEvent::DeviceConnected { device });
        }
        Disposition::Handled
    }

    fn on_disconnected(&mut self, conn_handle: u16, reason: HciStatus) -> Disposition {
        let address = self.store.registry().find_by_handle(conn_handle).map(|d| d.address);

        let device = address.and_then(|address| {
            self.store
                .registry_mut()
                .update(&address, &DevicePatch::new().connection_handle(None));
            self.store.registry().get(&address).cloned()
        });
        if device.is_none() {
            debug!(conn_handle, "Disconnected handle was not bound to a device");
        }

        let connected = self.store.registry().any_connected();
        self.store
            .change_adapter_state(&AdapterStatePatch::new().connected(connected));

        debug!(conn_handle, %reason, "Disconnected");
        self.store
            .emit(AdapterEvent::DeviceDisconnected { device, reason });
        Disposition::Handled
    }

    fn on_rssi_changed(&mut self, conn_handle: u16, rssi: i8) -> Disposition {
        let Some(address) = self.store.registry().find_by_handle(conn_handle).map(|d| d.address)
        else {
            debug!(conn_handle, "RSSI change for unbound handle");
            return Disposition::Handled;
        };
        self.store
            .change_device(&address, &DevicePatch::new().rssi(rssi));
        Disposition::Handled
    }

    fn on_timeout(&mut self, source: TimeoutSource) -> Disposition {
        let patch = match source {
            TimeoutSource::Scan => AdapterStatePatch::new().scanning(false),
            TimeoutSource::Connection => AdapterStatePatch::new().connecting(false),
            TimeoutSource::Advertising => AdapterStatePatch::new().advertising(false),
            TimeoutSource::SecurityRequest => {
                debug!("Security request timed out");
                return Disposition::Handled;
            }
        };
        debug!(?source, "GAP timeout");
        self.store.change_adapter_state(&patch);
        Disposition::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventReceiver, Notifier};
    use ble_adapter_types::uuid::{BATTERY_SERVICE, HEART_RATE_SERVICE, from_u32};
    use uuid::{Uuid, uuid};

    const VENDOR_SERVICE: Uuid = uuid!("6e400001-b5a3-f393-e0a9-e50e24dcca9e");
    use ble_adapter_types::{
        AdData, AdapterState, Address, GattcEvent, GattcEventKind, GattsEvent, GattsEventKind,
    };

    fn setup() -> (AdapterStore, EventReceiver) {
        let notifier = Notifier::new(64);
        let rx = notifier.subscribe();
        (AdapterStore::new(AdapterState::new("test", "/dev/null"), notifier), rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<AdapterEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn address() -> Address {
        "AA:BB:CC:DD:EE:FF".parse().unwrap()
    }

    fn adv(data: AdData) -> AdvReport {
        AdvReport::new(PeerAddress::public(address()), -60).with_data(data)
    }

    fn connected(conn_handle: u16, role: Role) -> DriverEvent {
        DriverEvent::Gap(GapEvent::Connected {
            conn_handle,
            peer_addr: PeerAddress::public(address()),
            role,
        })
    }

    #[test]
    fn test_first_sighting_only_discovered() {
        let (mut store, mut rx) = setup();
        let data = AdData {
            long_local_name: Some("HRM".to_string()),
            uuid16_complete: Some(vec![HEART_RATE_SERVICE]),
            ..Default::default()
        };
        EventDispatcher::new(&mut store).dispatch(&adv(data).into());

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            AdapterEvent::DeviceDiscovered { device } => {
                assert_eq!(device.name.as_deref(), Some("HRM"));
                assert_eq!(device.adv_data_uuids, vec![HEART_RATE_SERVICE]);
                assert_eq!(device.role, Role::Peripheral);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_redelivered_report_is_silent() {
        let (mut store, mut rx) = setup();
        let data = AdData {
            long_local_name: Some("Thermometer".to_string()),
            uuid16_complete: Some(vec![HEART_RATE_SERVICE, BATTERY_SERVICE]),
            uuid32_complete: Some(vec![from_u32(0x0001_1234)]),
            uuid128_more_available: Some(vec![VENDOR_SERVICE]),
            tx_power_level: Some(-4),
            ..Default::default()
        };
        let event: DriverEvent = AdvReport::new(PeerAddress::public(address()), -71)
            .with_data(data)
            .into();

        let mut dispatcher = EventDispatcher::new(&mut store);
        dispatcher.dispatch(&event);
        dispatcher.dispatch(&event);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            AdapterEvent::DeviceDiscovered { device } => {
                assert_eq!(device.name.as_deref(), Some("Thermometer"));
                assert_eq!(device.adv_data_uuids.len(), 4);
                assert_eq!(device.tx_power, Some(-4));
                assert_eq!(device.rssi, Some(-71));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_connected_releases_stale_handle_holder() {
        let (mut store, mut rx) = setup();
        let stale: Address = "11:22:33:44:55:66".parse().unwrap();
        store.registry_mut().upsert(stale, &DevicePatch::new().connection_handle(Some(0)));

        EventDispatcher::new(&mut store).dispatch(&connected(0, Role::Central));

        assert_eq!(store.registry().get(&stale).unwrap().connection_handle, None);
        assert_eq!(store.registry().find_by_handle(0).unwrap().address, address());
        assert_eq!(store.registry().bound_addresses(), vec![address()]);

        let events = drain(&mut rx);
        match &events[0] {
            AdapterEvent::DeviceChanged { device } => {
                assert_eq!(device.address, stale);
                assert_eq!(device.connection_handle, None);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(events.last(), Some(AdapterEvent::DeviceConnected { .. })));
    }

    #[test]
    fn test_reconnect_same_peer_same_handle_keeps_binding() {
        let (mut store, mut rx) = setup();
        let mut dispatcher = EventDispatcher::new(&mut store);
        dispatcher.dispatch(&connected(3, Role::Central));
        dispatcher.dispatch(&connected(3, Role::Central));

        assert_eq!(store.registry().find_by_handle(3).unwrap().address, address());
        assert!(
            !drain(&mut rx)
                .iter()
                .any(|e| matches!(e, AdapterEvent::DeviceChanged { .. }))
        );
    }

    #[test]
    fn test_scan_response_does_not_touch_adv_uuids() {
        let (mut store, mut rx) = setup();
        let adv_data = AdData {
            uuid16_complete: Some(vec![HEART_RATE_SERVICE]),
            ..Default::default()
        };
        let rsp_data = AdData {
            uuid16_complete: Some(vec![BATTERY_SERVICE]),
            ..Default::default()
        };

        EventDispatcher::new(&mut store).dispatch_batch(&[
            adv(adv_data).into(),
            adv(rsp_data).scan_response(true).into(),
        ]);

        let device = store.registry().get(&address()).unwrap();
        assert_eq!(device.adv_data_uuids, vec![HEART_RATE_SERVICE]);
        assert_eq!(device.scan_rsp_uuids, vec![BATTERY_SERVICE]);

        let events = drain(&mut rx);
        assert!(matches!(events[0], AdapterEvent::DeviceDiscovered { .. }));
        assert!(matches!(events[1], AdapterEvent::DeviceChanged { .. }));
    }

    #[test]
    fn test_connected_binds_handle_to_known_device() {
        let (mut store, mut rx) = setup();
        let mut dispatcher = EventDispatcher::new(&mut store);
        dispatcher.dispatch(&adv(AdData::default()).into());
        dispatcher.dispatch(&connected(4, Role::Central));

        assert_eq!(store.registry().find_by_handle(4).unwrap().address, address());
        assert!(store.state().connected);

        let events = drain(&mut rx);
        assert!(matches!(events[0], AdapterEvent::DeviceDiscovered { .. }));
        assert!(matches!(events[1], AdapterEvent::AdapterStateChanged { .. }));
        match &events[2] {
            AdapterEvent::DeviceConnected { device } => {
                assert_eq!(device.connection_handle, Some(4));
                assert_eq!(device.role, Role::Peripheral);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_connected_as_peripheral_creates_central() {
        let (mut store, mut rx) = setup();
        store.change_adapter_state(&AdapterStatePatch::new().advertising(true));
        drain(&mut rx);

        EventDispatcher::new(&mut store).dispatch(&connected(1, Role::Peripheral));

        let device = store.registry().get(&address()).unwrap();
        assert_eq!(device.role, Role::Central);
        assert!(!store.state().advertising);
        assert!(store.state().connected);

        let events = drain(&mut rx);
        assert!(matches!(events[0], AdapterEvent::DeviceDiscovered { .. }));
        assert!(matches!(events.last(), Some(AdapterEvent::DeviceConnected { .. })));
    }

    #[test]
    fn test_disconnected_releases_handle() {
        let (mut store, mut rx) = setup();
        let mut dispatcher = EventDispatcher::new(&mut store);
        dispatcher.dispatch(&connected(2, Role::Central));
        dispatcher.dispatch(&DriverEvent::Gap(GapEvent::Disconnected {
            conn_handle: 2,
            reason: HciStatus::REMOTE_USER_TERMINATED_CONNECTION,
        }));

        let device = store.registry().get(&address()).unwrap();
        assert_eq!(device.connection_handle, None);
        assert!(!store.state().connected);

        match drain(&mut rx).last() {
            Some(AdapterEvent::DeviceDisconnected { device, reason }) => {
                assert_eq!(device.as_ref().map(|d| d.address), Some(address()));
                assert_eq!(*reason, HciStatus::REMOTE_USER_TERMINATED_CONNECTION);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_disconnected_unbound_handle() {
        let (mut store, mut rx) = setup();
        EventDispatcher::new(&mut store).dispatch(&DriverEvent::Gap(GapEvent::Disconnected {
            conn_handle: 9,
            reason: HciStatus::CONNECTION_TIMEOUT,
        }));

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![AdapterEvent::DeviceDisconnected {
                device: None,
                reason: HciStatus::CONNECTION_TIMEOUT,
            }]
        );
    }

    #[test]
    fn test_rssi_changed_routes_by_handle() {
        let (mut store, mut rx) = setup();
        let mut dispatcher = EventDispatcher::new(&mut store);
        dispatcher.dispatch(&connected(3, Role::Central));
        dispatcher.dispatch(&DriverEvent::Gap(GapEvent::RssiChanged {
            conn_handle: 3,
            rssi: -42,
        }));
        dispatcher.dispatch(&DriverEvent::Gap(GapEvent::RssiChanged {
            conn_handle: 8,
            rssi: -10,
        }));

        assert_eq!(store.registry().get(&address()).unwrap().rssi, Some(-42));
        match drain(&mut rx).last() {
            Some(AdapterEvent::DeviceChanged { device }) => assert_eq!(device.rssi, Some(-42)),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_timeouts_clear_flags() {
        let (mut store, _rx) = setup();
        store.change_adapter_state(
            &AdapterStatePatch::new()
                .scanning(true)
                .connecting(true)
                .advertising(true),
        );

        let timeout = |source| DriverEvent::Gap(GapEvent::Timeout {
            conn_handle: None,
            source,
        });

        let mut dispatcher = EventDispatcher::new(&mut store);
        dispatcher.dispatch(&timeout(TimeoutSource::SecurityRequest));
        dispatcher.dispatch(&timeout(TimeoutSource::Scan));
        assert!(!store.state().scanning);
        assert!(store.state().connecting);

        let mut dispatcher = EventDispatcher::new(&mut store);
        dispatcher.dispatch(&timeout(TimeoutSource::Connection));
        dispatcher.dispatch(&timeout(TimeoutSource::Advertising));
        assert!(!store.state().connecting);
        assert!(!store.state().advertising);
    }

    #[test]
    fn test_unsupported_events_are_silent() {
        let (mut store, mut rx) = setup();
        let before = store.state().clone();
        let mut dispatcher = EventDispatcher::new(&mut store);

        let gattc = DriverEvent::Gattc(GattcEvent {
            kind: GattcEventKind::Hvx,
            conn_handle: 0,
        });
        let gatts = DriverEvent::Gatts(GattsEvent {
            kind: GattsEventKind::Write,
            conn_handle: 0,
        });
        let unknown = DriverEvent::Unknown {
            id: 0x7F,
            name: "BLE_EVT_USER_MEM_REQUEST".to_string(),
        };
        let param_request = DriverEvent::Gap(GapEvent::ConnParamUpdateRequest {
            conn_handle: 0,
            params: Default::default(),
        });

        assert_eq!(dispatcher.dispatch(&gattc), Disposition::Unsupported);
        assert_eq!(dispatcher.dispatch(&gatts), Disposition::Unsupported);
        assert_eq!(dispatcher.dispatch(&param_request), Disposition::Unsupported);
        assert_eq!(dispatcher.dispatch(&unknown), Disposition::Unknown);

        assert!(drain(&mut rx).is_empty());
        assert_eq!(store.state(), &before);
        assert!(store.registry().is_empty());
    }
}
