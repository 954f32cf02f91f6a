//! Error types for value parsing in ble-adapter-types.

use thiserror::Error;

/// Errors that can occur when parsing textual BLE values.
///
/// This error type is transport-agnostic; driver and command failures
/// belong in ble-adapter-core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The string is not six colon-separated hex octets.
    #[error("Invalid address '{0}': expected format AA:BB:CC:DD:EE:FF")]
    InvalidAddress(String),

    /// The string is neither a short (16/32-bit) nor a full 128-bit UUID.
    #[error("Invalid service UUID '{0}'")]
    InvalidUuid(String),
}

/// Result type alias using ble-adapter-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
