//! Value kinds a dissected field can take.

use std::fmt;

/// Type of a field in a protocol schema.
///
/// Mirrors the variants of [`FieldValue`](crate::protocol::FieldValue) that
/// dissectors actually produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Bool,
    UInt8,
    UInt16,
    UInt32,
    UInt64,

    /// UTF-8 text (names, identifiers, SQL, enum labels)
    String,

    /// Raw octets
    Bytes,

    /// IPv4 or IPv6 address
    IpAddr,

    /// 6-byte MAC address
    MacAddr,
}

impl DataKind {
    /// Short type name for schema listings.
    pub fn type_name(&self) -> &'static str {
        match self {
            DataKind::Bool => "bool",
            DataKind::UInt8 => "u8",
            DataKind::UInt16 => "u16",
            DataKind::UInt32 => "u32",
            DataKind::UInt64 => "u64",
            DataKind::String => "string",
            DataKind::Bytes => "bytes",
            DataKind::IpAddr => "ip",
            DataKind::MacAddr => "mac",
        }
    }

    /// Size in bytes for fixed-width kinds, None for variable-width.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            DataKind::Bool | DataKind::UInt8 => Some(1),
            DataKind::UInt16 => Some(2),
            DataKind::UInt32 => Some(4),
            DataKind::UInt64 => Some(8),
            DataKind::MacAddr => Some(6),
            DataKind::String | DataKind::Bytes | DataKind::IpAddr => None,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
