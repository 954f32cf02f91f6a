//! Adapter notifications.
//!
//! Observers subscribe to a broadcast channel of [`AdapterEvent`]s. Every
//! event carries an owned snapshot, so receivers never alias adapter state.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use ble_adapter_types::{AdapterState, Device, HciStatus};

/// Notifications emitted by an [`Adapter`](crate::Adapter).
///
/// All events are serializable for logging, persistence, and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum AdapterEvent {
    /// At least one adapter field changed.
    AdapterStateChanged { state: AdapterState },
    /// A device address was seen for the first time.
    DeviceDiscovered { device: Device },
    /// Fields of a known device changed.
    DeviceChanged { device: Device },
    /// A connection came up.
    DeviceConnected { device: Device },
    /// A connection went down. `device` is `None` if no device held the handle.
    DeviceDisconnected {
        device: Option<Device>,
        reason: HciStatus,
    },
    /// A driver call failed.
    Error { message: String },
}

/// Sender for adapter events.
pub type EventSender = broadcast::Sender<AdapterEvent>;

/// Receiver for adapter events.
pub type EventReceiver = broadcast::Receiver<AdapterEvent>;

/// Fan-out point for adapter events.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: EventSender,
}

impl Notifier {
    /// Create a notifier with room for `capacity` unread events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: AdapterEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Broadcast an error message.
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.send(AdapterEvent::Error { message });
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ble_adapter_types::Role;

    #[test]
    fn test_send_without_receivers() {
        let notifier = Notifier::default();
        assert_eq!(notifier.receiver_count(), 0);
        notifier.error("nobody listens");
    }

    #[tokio::test]
    async fn test_subscribe_and_receive() {
        let notifier = Notifier::new(8);
        let mut rx = notifier.subscribe();
        assert_eq!(notifier.receiver_count(), 1);

        notifier.error("Failed to set address");
        match rx.recv().await.unwrap() {
            AdapterEvent::Error { message } => assert_eq!(message, "Failed to set address"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_serialization() {
        let device = Device::new("AA:BB:CC:DD:EE:FF".parse().unwrap(), Role::Peripheral);
        let event = AdapterEvent::DeviceDiscovered { device };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "device_discovered");
        assert_eq!(json["device"]["address"], "AA:BB:CC:DD:EE:FF");

        let back: AdapterEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_disconnected_serialization() {
        let event = AdapterEvent::DeviceDisconnected {
            device: None,
            reason: HciStatus::CONNECTION_TIMEOUT,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "device_disconnected");
        assert!(json["device"].is_null());
        assert_eq!(json["reason"], 8);
    }
}
