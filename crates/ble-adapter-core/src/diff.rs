//! Field-level diffing of state records.
//!
//! State is never assigned wholesale. Callers build a patch of proposed field
//! values and apply it with [`Diff::apply_diff`], which writes only the fields
//! whose value actually differs and reports whether anything changed. The
//! caller then decides whether a change notification is warranted.
//!
//! Equality is structural (`PartialEq`), so lists and nested values are
//! compared by content rather than identity.

use ble_adapter_types::{AdapterState, Address, Device, FlowControl, Parity};
use uuid::Uuid;

/// A record that can absorb a patch of proposed values.
pub trait Diff {
    /// Proposed field values. `None` leaves a field untouched.
    type Patch;

    /// Apply the fields of `patch` that differ from the current values.
    ///
    /// Returns `true` if at least one field was overwritten.
    fn apply_diff(&mut self, patch: &Self::Patch) -> bool;
}

/// Overwrite `slot` with `proposed` if they differ.
pub fn set_if_changed<T: PartialEq + Clone>(slot: &mut T, proposed: &T) -> bool {
    if slot == proposed {
        false
    } else {
        *slot = proposed.clone();
        true
    }
}

fn propose<T: PartialEq + Clone>(slot: &mut T, proposed: &Option<T>) -> bool {
    match proposed {
        Some(value) => set_if_changed(slot, value),
        None => false,
    }
}

fn propose_some<T: PartialEq + Clone>(slot: &mut Option<T>, proposed: &Option<T>) -> bool {
    match proposed {
        Some(value) if slot.as_ref() != Some(value) => {
            *slot = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// Proposed changes to an [`AdapterState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterStatePatch {
    pub baud_rate: Option<u32>,
    pub parity: Option<Parity>,
    pub flow_control: Option<FlowControl>,
    pub available: Option<bool>,
    pub scanning: Option<bool>,
    pub advertising: Option<bool>,
    pub connecting: Option<bool>,
    pub connected: Option<bool>,
    pub firmware_version: Option<String>,
    pub device_name: Option<String>,
    pub address: Option<Address>,
}

impl AdapterStatePatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the patch proposes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn serial(mut self, baud_rate: u32, parity: Parity, flow_control: FlowControl) -> Self {
        self.baud_rate = Some(baud_rate);
        self.parity = Some(parity);
        self.flow_control = Some(flow_control);
        self
    }

    #[must_use]
    pub fn available(mut self, available: bool) -> Self {
        self.available = Some(available);
        self
    }

    #[must_use]
    pub fn scanning(mut self, scanning: bool) -> Self {
        self.scanning = Some(scanning);
        self
    }

    #[must_use]
    pub fn advertising(mut self, advertising: bool) -> Self {
        self.advertising = Some(advertising);
        self
    }

    #[must_use]
    pub fn connecting(mut self, connecting: bool) -> Self {
        self.connecting = Some(connecting);
        self
    }

    #[must_use]
    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = Some(connected);
        self
    }

    #[must_use]
    pub fn firmware_version(mut self, version: impl Into<String>) -> Self {
        self.firmware_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }
}

impl Diff for AdapterState {
    type Patch = AdapterStatePatch;

    fn apply_diff(&mut self, patch: &AdapterStatePatch) -> bool {
        let mut changed = false;
        changed |= propose_some(&mut self.baud_rate, &patch.baud_rate);
        changed |= propose_some(&mut self.parity, &patch.parity);
        changed |= propose_some(&mut self.flow_control, &patch.flow_control);
        changed |= propose(&mut self.available, &patch.available);
        changed |= propose(&mut self.scanning, &patch.scanning);
        changed |= propose(&mut self.advertising, &patch.advertising);
        changed |= propose(&mut self.connecting, &patch.connecting);
        changed |= propose(&mut self.connected, &patch.connected);
        changed |= propose_some(&mut self.firmware_version, &patch.firmware_version);
        changed |= propose_some(&mut self.device_name, &patch.device_name);
        changed |= propose_some(&mut self.address, &patch.address);
        changed
    }
}

/// Proposed changes to a [`Device`].
///
/// The address and role are fixed at creation and cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevicePatch {
    pub name: Option<String>,
    pub adv_data_uuids: Option<Vec<Uuid>>,
    pub scan_rsp_uuids: Option<Vec<Uuid>>,
    pub tx_power: Option<i8>,
    pub rssi: Option<i8>,
    /// `Some(None)` clears the handle.
    pub connection_handle: Option<Option<u16>>,
}

impl DevicePatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn adv_data_uuids(mut self, uuids: Vec<Uuid>) -> Self {
        self.adv_data_uuids = Some(uuids);
        self
    }

    #[must_use]
    pub fn scan_rsp_uuids(mut self, uuids: Vec<Uuid>) -> Self {
        self.scan_rsp_uuids = Some(uuids);
        self
    }

    #[must_use]
    pub fn tx_power(mut self, tx_power: i8) -> Self {
        self.tx_power = Some(tx_power);
        self
    }

    #[must_use]
    pub fn rssi(mut self, rssi: i8) -> Self {
        self.rssi = Some(rssi);
        self
    }

    #[must_use]
    pub fn connection_handle(mut self, handle: Option<u16>) -> Self {
        self.connection_handle = Some(handle);
        self
    }
}

impl Diff for Device {
    type Patch = DevicePatch;

    fn apply_diff(&mut self, patch: &DevicePatch) -> bool {
        let mut changed = false;
        changed |= propose_some(&mut self.name, &patch.name);
        changed |= propose(&mut self.adv_data_uuids, &patch.adv_data_uuids);
        changed |= propose(&mut self.scan_rsp_uuids, &patch.scan_rsp_uuids);
        changed |= propose_some(&mut self.tx_power, &patch.tx_power);
        changed |= propose_some(&mut self.rssi, &patch.rssi);
        changed |= propose(&mut self.connection_handle, &patch.connection_handle);
        changed
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use ble_adapter_types::Role;
    use proptest::prelude::*;

    proptest! {
        /// Applying the same patch twice changes state at most once.
        #[test]
        fn device_patch_is_idempotent(
            name in proptest::option::of("[a-zA-Z0-9 ]{0,12}"),
            rssi in proptest::option::of(any::<i8>()),
            tx_power in proptest::option::of(any::<i8>()),
            shorts in proptest::option::of(proptest::collection::vec(any::<u16>(), 0..4)),
        ) {
            let mut device = Device::new(Address::ZERO, Role::Peripheral);
            let patch = DevicePatch {
                name,
                adv_data_uuids: shorts.map(|s| s.into_iter().map(ble_adapter_types::uuid::from_u16).collect()),
                tx_power,
                rssi,
                ..Default::default()
            };

            device.apply_diff(&patch);
            let snapshot = device.clone();
            prop_assert!(!device.apply_diff(&patch));
            prop_assert_eq!(device, snapshot);
        }

        #[test]
        fn adapter_patch_is_idempotent(
            scanning in proptest::option::of(any::<bool>()),
            advertising in proptest::option::of(any::<bool>()),
            connecting in proptest::option::of(any::<bool>()),
            name in proptest::option::of("[a-z]{1,8}"),
        ) {
            let mut state = AdapterState::new("a", "COM1");
            let patch = AdapterStatePatch {
                scanning,
                advertising,
                connecting,
                device_name: name,
                ..Default::default()
            };

            state.apply_diff(&patch);
            prop_assert!(!state.apply_diff(&patch));
        }
    }
}
