//! Error types for ble-adapter-core.
//!
//! # Error Classes
//!
//! | Error | Origin | Notes |
//! |-------|--------|-------|
//! | [`Error::Transport`] | A driver call failed | Also broadcast as [`AdapterEvent::Error`](crate::events::AdapterEvent::Error) |
//! | [`Error::DeviceNotFound`] | Command names an address the registry never saw | Not broadcast |
//! | [`Error::NotConnected`] | Device known but holds no connection handle | Not broadcast |
//! | [`Error::NotOpen`] | `close` on an adapter that was never opened | Not broadcast |
//! | [`Error::InvalidConfig`] | Bad configuration or advertising payload | Fix input and retry |
//! | [`Error::Config`] | Configuration file could not be read or parsed | |
//!
//! Unsupported driver events are never errors; they are logged and skipped.
//! Nothing is retried automatically, and no error leaves the adapter unusable.

use thiserror::Error;

use ble_adapter_types::{Address, ParseError};

use crate::config::ConfigError;
use crate::transport::TransportError;

/// Errors returned by adapter commands.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A transport call failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No device with this address is in the registry.
    #[error("Device not found: {0}")]
    DeviceNotFound(Address),

    /// The device exists but is not connected.
    #[error("Device {0} is not connected")]
    NotConnected(Address),

    /// The adapter has not been opened.
    #[error("Adapter is not open")]
    NotOpen,

    /// Invalid configuration or command input.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A textual value could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error came from the transport.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result type alias using ble-adapter-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let address: Address = "AA:BB:CC:DD:EE:FF".parse().unwrap();

        let err = Error::DeviceNotFound(address);
        assert_eq!(err.to_string(), "Device not found: AA:BB:CC:DD:EE:FF");

        let err = Error::NotConnected(address);
        assert_eq!(err.to_string(), "Device AA:BB:CC:DD:EE:FF is not connected");

        let err = Error::invalid_config("port is empty");
        assert_eq!(err.to_string(), "Invalid configuration: port is empty");
    }

    #[test]
    fn test_transport_conversion() {
        let err: Error = TransportError::new("start_scan", 0x08, "invalid state").into();
        assert!(err.is_transport());
        assert!(err.to_string().contains("start_scan"));
        assert!(err.to_string().contains("invalid state"));
    }

    #[test]
    fn test_parse_conversion() {
        let parse_err = "bogus".parse::<Address>().unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("bogus"));
    }
}
