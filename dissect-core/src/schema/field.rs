//! Field descriptor for protocol schemas.

use super::DataKind;

/// Description of one field a dissector can emit.
///
/// Names are qualified with the protocol (`tns.sql`, `skinny.call_id`) so
/// the combined schema of a registry has no collisions.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Qualified field name, e.g. "tcp.src_port"
    pub name: &'static str,

    pub kind: DataKind,

    /// Whether the field may be absent from a record
    pub nullable: bool,

    /// Optional description for schema listings
    pub description: Option<&'static str>,
}

impl FieldDescriptor {
    /// Create a new field that is always present.
    pub const fn new(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            description: None,
        }
    }

    /// Create a new optional field.
    pub const fn nullable(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
            description: None,
        }
    }

    /// Add a description to the field.
    pub const fn with_description(mut self, desc: &'static str) -> Self {
        self.description = Some(desc);
        self
    }

    /// Builder: set nullability.
    pub const fn set_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Protocol part of the qualified name.
    pub fn protocol(&self) -> &'static str {
        self.name.split_once('.').map_or(self.name, |(proto, _)| proto)
    }

    /// Field part of the qualified name, as it appears in record field lists.
    pub fn field(&self) -> &'static str {
        self.name.split_once('.').map_or(self.name, |(_, field)| field)
    }
}

/// Fields describing the capture itself rather than any protocol layer.
impl FieldDescriptor {
    /// Frame number field (1-based index in the capture file).
    pub const fn frame_number() -> Self {
        Self::new("frame.number", DataKind::UInt64).with_description("Position in the capture file")
    }

    /// Timestamp field.
    pub const fn timestamp() -> Self {
        Self::new("frame.timestamp_us", DataKind::UInt64)
            .with_description("Capture time, microseconds since the Unix epoch")
    }

    /// Length of the frame on the wire.
    pub const fn wire_len() -> Self {
        Self::new("frame.wire_len", DataKind::UInt32).with_description("Original frame length")
    }

    /// Bytes actually captured.
    pub const fn captured_len() -> Self {
        Self::new("frame.captured_len", DataKind::UInt32)
            .with_description("Captured length, at most the wire length")
    }
}
