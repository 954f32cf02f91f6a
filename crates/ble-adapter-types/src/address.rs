//! Bluetooth device addresses.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// A 48-bit Bluetooth device address.
///
/// Octets are stored most significant first, i.e. in the order they are
/// displayed (`AA:BB:CC:DD:EE:FF`). The address is the registry key for
/// remote devices and never changes once a device has been created.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 6]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0; 6]);

    /// Create an address from octets, most significant first.
    #[must_use]
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Create an address from octets in over-the-air (little-endian) order.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 6]) -> Self {
        Self([bytes[5], bytes[4], bytes[3], bytes[2], bytes[1], bytes[0]])
    }

    /// Octets, most significant first.
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Octets in over-the-air (little-endian) order.
    #[must_use]
    pub const fn to_le_bytes(&self) -> [u8; 6] {
        let o = self.0;
        [o[5], o[4], o[3], o[2], o[1], o[0]]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidAddress(s.to_string());

        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self(octets))
    }
}

impl From<[u8; 6]> for Address {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

#[cfg(feature = "serde")]
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How an address was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AddressType {
    /// IEEE-assigned public address.
    #[default]
    Public,
    /// Random static address.
    RandomStatic,
    /// Resolvable private address.
    RandomPrivateResolvable,
    /// Non-resolvable private address.
    RandomPrivateNonResolvable,
}

/// An address together with its type, as reported in driver events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeerAddress {
    /// The device address.
    pub address: Address,
    /// The address type.
    pub address_type: AddressType,
}

impl PeerAddress {
    /// Create a peer address.
    #[must_use]
    pub const fn new(address: Address, address_type: AddressType) -> Self {
        Self {
            address,
            address_type,
        }
    }

    /// Create a peer address with a public address type.
    #[must_use]
    pub const fn public(address: Address) -> Self {
        Self::new(address, AddressType::Public)
    }
}
