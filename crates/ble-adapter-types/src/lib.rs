//! Platform-agnostic types for the BLE adapter state/event core.
//!
//! This crate holds the value types shared between the adapter core and
//! anything that produces or consumes its data (drivers, test harnesses,
//! IPC bridges). It has no async runtime dependency.
//!
//! # Features
//!
//! - Device addresses and address types
//! - Service UUID helpers (16/32-bit aliases on the Bluetooth Base UUID)
//! - Driver event records as a closed enum
//! - Adapter and remote-device state records
//! - GAP command parameters
//!
//! # Example
//!
//! ```
//! use ble_adapter_types::{AdData, AdvReport, Address, DriverEvent, PeerAddress};
//! use ble_adapter_types::uuid::HEART_RATE_SERVICE;
//!
//! let address: Address = "AA:BB:CC:DD:EE:FF".parse().unwrap();
//! let report = AdvReport::new(PeerAddress::public(address), -55).with_data(AdData {
//!     long_local_name: Some("Heart Rate Sensor".to_string()),
//!     uuid16_complete: Some(vec![HEART_RATE_SERVICE]),
//!     ..Default::default()
//! });
//!
//! let event = DriverEvent::from(report);
//! assert_eq!(event.name(), "BLE_GAP_EVT_ADV_REPORT");
//! ```

pub mod address;
pub mod error;
pub mod event;
pub mod params;
pub mod types;
pub mod uuid;

pub use address::{Address, AddressType, PeerAddress};
pub use error::{ParseError, ParseResult};
pub use event::{
    AdData, AdvReport, DriverEvent, DriverLog, EventBatch, GapEvent, GattcEvent, GattcEventKind,
    GattsEvent, GattsEventKind, LogSeverity, TimeoutSource,
};
pub use params::{
    AddressCycleMode, AdvertisingOptions, AdvertisingParams, AdvertisingType, ChannelMask,
    ConnectOptions, ConnectionParams, FilterPolicy, HciStatus, ScanParams,
};
pub use types::{AdapterState, Device, FlowControl, Parity, Role};
pub use crate::uuid as uuids;
