//! Registry of remote devices seen by one adapter.
//!
//! The registry is owned by the adapter core and keyed by address. It never
//! sends notifications itself; callers look at the [`UpsertOutcome`] to
//! decide between "discovered" and "changed".

use std::collections::HashMap;

use ble_adapter_types::{Address, Device, Role};

use crate::diff::{Diff, DevicePatch};

/// What an upsert did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The address was not known; a device was created.
    Created,
    /// A known device had at least one field overwritten.
    Changed,
    /// A known device already held every proposed value.
    Unchanged,
}

/// Result of [`DeviceRegistry::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upsert {
    /// Snapshot of the device after the patch.
    pub device: Device,
    pub outcome: UpsertOutcome,
}

/// Devices keyed by address.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: HashMap<Address, Device>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a device.
    pub fn get(&self, address: &Address) -> Option<&Device> {
        self.devices.get(address)
    }

    /// Insert or update a device seen through advertising.
    ///
    /// Devices first seen this way are assumed to be peripherals.
    pub fn upsert(&mut self, address: Address, patch: &DevicePatch) -> Upsert {
        self.upsert_with_role(address, Role::Peripheral, patch)
    }

    /// Insert or update a device, using `role` if it has to be created.
    ///
    /// The role of an existing device is left alone.
    pub fn upsert_with_role(&mut self, address: Address, role: Role, patch: &DevicePatch) -> Upsert {
        match self.devices.get_mut(&address) {
            Some(device) => {
                let outcome = if device.apply_diff(patch) {
                    UpsertOutcome::Changed
                } else {
                    UpsertOutcome::Unchanged
                };
                Upsert {
                    device: device.clone(),
                    outcome,
                }
            }
            None => {
                let mut device = Device::new(address, role);
                // A fresh record is announced as discovered, never as changed.
                let _ = device.apply_diff(patch);
                self.devices.insert(address, device.clone());
                Upsert {
                    device,
                    outcome: UpsertOutcome::Created,
                }
            }
        }
    }

    /// Apply a patch to a known device.
    ///
    /// Returns `None` if the address is unknown, otherwise whether anything changed.
    pub fn update(&mut self, address: &Address, patch: &DevicePatch) -> Option<bool> {
        self.devices
            .get_mut(address)
            .map(|device| device.apply_diff(patch))
    }

    /// Find the device bound to a connection handle.
    pub fn find_by_handle(&self, conn_handle: u16) -> Option<&Device> {
        self.devices
            .values()
            .find(|d| d.connection_handle == Some(conn_handle))
    }

    /// Addresses of devices that currently hold a connection handle.
    pub fn bound_addresses(&self) -> Vec<Address> {
        self.devices
            .values()
            .filter(|d| d.is_connected())
            .map(|d| d.address)
            .collect()
    }

    /// Whether any device currently holds a connection handle.
    pub fn any_connected(&self) -> bool {
        self.devices.values().any(Device::is_connected)
    }

    /// Snapshot of all devices. Order is not significant.
    pub fn list(&self) -> Vec<Device> {
        self.devices.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
