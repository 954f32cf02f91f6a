//! State and event core for a serial-attached BLE radio.
//!
//! This crate keeps an authoritative, change-notifying model of one local
//! Bluetooth Low Energy adapter and of the remote devices it has seen. It
//! sits between a radio driver (reached through the [`Transport`] trait) and
//! application code (which subscribes to [`AdapterEvent`]s).
//!
//! # Features
//!
//! - **Commands**: Open/close the serial link, scan, connect, advertise, disconnect
//! - **Device registry**: Remote devices keyed by address, fed by advertising reports
//! - **Change notification**: Events are emitted only when a field actually changed
//! - **Event pump**: Driver event batches are applied in arrival order
//! - **Advertising payloads**: AD structure encoding with the legacy 31-byte limit
//! - **Configuration**: TOML-backed serial and channel settings
//! - **Testing**: A [`MockTransport`] with failure injection and event injection
//!
//! # Notifications
//!
//! | Event | When |
//! |-------|------|
//! | [`AdapterEvent::AdapterStateChanged`] | An adapter field changed |
//! | [`AdapterEvent::DeviceDiscovered`] | An address was seen for the first time |
//! | [`AdapterEvent::DeviceChanged`] | A known device's fields changed |
//! | [`AdapterEvent::DeviceConnected`] | A connection came up |
//! | [`AdapterEvent::DeviceDisconnected`] | A connection went down |
//! | [`AdapterEvent::Error`] | A transport call failed |
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use ble_adapter_core::{
//!     AdData, AdapterConfig, AdapterEvent, Adapter, AdvReport, MockTransport, PeerAddress,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(MockTransport::new());
//!     let adapter = Adapter::new(transport, AdapterConfig::new("dongle", "/dev/ttyACM0"));
//!     let mut events = adapter.subscribe();
//!
//!     adapter.open().await?;
//!     let state = adapter.get_adapter_state().await?;
//!     println!("Firmware: {:?}", state.firmware_version);
//!
//!     // Feed an advertising report as the driver would.
//!     let report = AdvReport::new(PeerAddress::public("AA:BB:CC:DD:EE:FF".parse()?), -58)
//!         .with_data(AdData {
//!             long_local_name: Some("Thermometer".to_string()),
//!             ..Default::default()
//!         });
//!     adapter.process_events(&[report.into()]).await;
//!
//!     while let Ok(event) = events.try_recv() {
//!         if let AdapterEvent::DeviceDiscovered { device } = event {
//!             println!("Discovered {} ({:?})", device.address, device.name);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod advertisement;
pub mod advertising;
pub mod config;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod mock;
pub mod registry;
pub mod store;
pub mod transport;

// Core exports
pub use adapter::Adapter;
pub use config::{AdapterConfig, ConfigError, ValidationError};
pub use error::{Error, Result};
pub use events::{AdapterEvent, EventReceiver, EventSender, Notifier};
pub use transport::{
    SerialSettings, Transport, TransportError, TransportResult, TransportSink, TransportStreams,
    sink_channel,
};

pub use advertisement::{ParsedAdvertisement, collect_service_uuids, parse_advertisement};
pub use advertising::AdvertisingData;
pub use diff::{AdapterStatePatch, DevicePatch, Diff};
pub use dispatch::{Disposition, EventDispatcher};
pub use mock::{MockTransport, MockTransportBuilder, Operation};
pub use registry::{DeviceRegistry, Upsert, UpsertOutcome};
pub use store::AdapterStore;

// Re-export from ble-adapter-types
pub use ble_adapter_types::uuid as uuids;
pub use ble_adapter_types::{
    AdData, AdapterState, AdvReport, Address, AddressCycleMode, AddressType, AdvertisingOptions,
    AdvertisingParams, AdvertisingType, ChannelMask, ConnectOptions, ConnectionParams, Device,
    DriverEvent, DriverLog, EventBatch, FilterPolicy, FlowControl, GapEvent, GattcEvent,
    GattcEventKind, GattsEvent, GattsEventKind, HciStatus, LogSeverity, Parity, PeerAddress, Role,
    ScanParams, TimeoutSource,
};
