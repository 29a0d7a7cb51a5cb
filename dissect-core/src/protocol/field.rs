//! Generic field view over dissected records.
//!
//! Records are strongly typed, but consumers that do not know every layout
//! (the CLI, schema listings, tests) read them as `(name, FieldValue)` pairs.
//! Values borrow from the record where possible.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use compact_str::CompactString;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<'data> {
    /// Unsigned 8-bit integer
    UInt8(u8),
    /// Unsigned 16-bit integer
    UInt16(u16),
    /// Unsigned 32-bit integer
    UInt32(u32),
    /// Unsigned 64-bit integer
    UInt64(u64),
    /// Boolean value
    Bool(bool),
    /// IP address (v4 or v6)
    IpAddr(IpAddr),
    /// MAC address (6 bytes)
    MacAddr([u8; 6]),
    /// String borrowed from the record or the packet.
    Str(&'data str),
    /// Bytes borrowed from the record or the packet.
    Bytes(&'data [u8]),
    /// Constructed string (enum names, formatted identifiers).
    OwnedString(CompactString),
    /// Null/missing value
    Null,
}

impl<'data> FieldValue<'data> {
    /// Create a MAC address from bytes.
    pub fn mac(bytes: &[u8]) -> Self {
        match <[u8; 6]>::try_from(bytes.get(..6).unwrap_or_default()) {
            Ok(mac) => FieldValue::MacAddr(mac),
            Err(_) => FieldValue::Null,
        }
    }

    /// Create an IPv4 address from bytes.
    pub fn ipv4(bytes: &[u8]) -> Self {
        match <[u8; 4]>::try_from(bytes.get(..4).unwrap_or_default()) {
            Ok(a) => FieldValue::IpAddr(IpAddr::V4(Ipv4Addr::from(a))),
            Err(_) => FieldValue::Null,
        }
    }

    /// Create an IPv6 address from bytes.
    pub fn ipv6(bytes: &[u8]) -> Self {
        match <[u8; 16]>::try_from(bytes.get(..16).unwrap_or_default()) {
            Ok(a) => FieldValue::IpAddr(IpAddr::V6(Ipv6Addr::from(a))),
            Err(_) => FieldValue::Null,
        }
    }

    /// Format a MAC address as a string.
    pub fn format_mac(mac: &[u8; 6]) -> String {
        format!(
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Try to get as u64.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::UInt8(v) => Some(u64::from(*v)),
            FieldValue::UInt16(v) => Some(u64::from(*v)),
            FieldValue::UInt32(v) => Some(u64::from(*v)),
            FieldValue::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as str reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            FieldValue::OwnedString(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            FieldValue::IpAddr(a) => Some(*a),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::UInt8(v) => write!(f, "{v}"),
            FieldValue::UInt16(v) => write!(f, "{v}"),
            FieldValue::UInt32(v) => write!(f, "{v}"),
            FieldValue::UInt64(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::IpAddr(a) => write!(f, "{a}"),
            FieldValue::MacAddr(m) => f.write_str(&Self::format_mac(m)),
            FieldValue::Str(s) => write!(f, "{s:?}"),
            FieldValue::OwnedString(s) => write!(f, "{:?}", s.as_str()),
            FieldValue::Bytes(b) => {
                for byte in b.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            FieldValue::Null => f.write_str("null"),
        }
    }
}
