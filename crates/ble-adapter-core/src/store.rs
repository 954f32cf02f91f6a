//! Adapter state plus device registry, with change notification.
//!
//! [`AdapterStore`] is the data behind the adapter's state lock. Every
//! mutation goes through a diff and only an actual change produces a
//! notification, sent before the lock is released so observers see events
//! in mutation order.

use ble_adapter_types::{AdapterState, Address, Device, Role};
use tracing::trace;

use crate::diff::{AdapterStatePatch, DevicePatch, Diff};
use crate::events::{AdapterEvent, Notifier};
use crate::registry::{DeviceRegistry, UpsertOutcome};

/// Committed adapter and device state.
#[derive(Debug)]
pub struct AdapterStore {
    state: AdapterState,
    registry: DeviceRegistry,
    notifier: Notifier,
}

impl AdapterStore {
    /// Create a store for a closed adapter.
    pub fn new(state: AdapterState, notifier: Notifier) -> Self {
        Self {
            state,
            registry: DeviceRegistry::new(),
            notifier,
        }
    }

    pub fn state(&self) -> &AdapterState {
        &self.state
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Direct registry access. Changes made here are not announced.
    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    /// Apply `patch` to the adapter state.
    ///
    /// Emits [`AdapterEvent::AdapterStateChanged`] and returns `true` only if
    /// a field changed.
    pub fn change_adapter_state(&mut self, patch: &AdapterStatePatch) -> bool {
        if !self.state.apply_diff(patch) {
            trace!("Adapter state unchanged");
            return false;
        }
        self.notifier.send(AdapterEvent::AdapterStateChanged {
            state: self.state.clone(),
        });
        true
    }

    /// Insert or update a device and announce it.
    ///
    /// A new device produces [`AdapterEvent::DeviceDiscovered`] only; an
    /// existing one produces [`AdapterEvent::DeviceChanged`] if anything changed.
    pub fn observe_device(&mut self, address: Address, role: Role, patch: &DevicePatch) -> Device {
        let upsert = self.registry.upsert_with_role(address, role, patch);
        match upsert.outcome {
            UpsertOutcome::Created => self.notifier.send(AdapterEvent::DeviceDiscovered {
                device: upsert.device.clone(),
            }),
            UpsertOutcome::Changed => self.notifier.send(AdapterEvent::DeviceChanged {
                device: upsert.device.clone(),
            }),
            UpsertOutcome::Unchanged => trace!(%address, "Device unchanged"),
        }
        upsert.device
    }

    /// Apply `patch` to a known device.
    ///
    /// Returns the updated snapshot, or `None` if the address is unknown.
    /// Emits [`AdapterEvent::DeviceChanged`] if anything changed.
    pub fn change_device(&mut self, address: &Address, patch: &DevicePatch) -> Option<Device> {
        let changed = self.registry.update(address, patch)?;
        let device = self.registry.get(address)?.clone();
        if changed {
            self.notifier.send(AdapterEvent::DeviceChanged {
                device: device.clone(),
            });
        }
        Some(device)
    }

    /// Clear the connection handle of every bound device.
    ///
    /// Each released device is announced with [`AdapterEvent::DeviceChanged`].
    /// Returns the released snapshots.
    pub fn release_connections(&mut self) -> Vec<Device> {
        let release = DevicePatch::new().connection_handle(None);
        self.registry
            .bound_addresses()
            .iter()
            .filter_map(|address| self.change_device(address, &release))
            .collect()
    }

    /// Send an event that is not the result of a diff.
    pub fn emit(&self, event: AdapterEvent) {
        self.notifier.send(event);
    }
}
