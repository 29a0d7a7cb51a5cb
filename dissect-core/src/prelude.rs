//! Convenient re-exports for common usage.
//!
//! ```rust
//! use dissect_core::prelude::*;
//!
//! let registry = default_registry();
//! assert!(registry.get_parser("skinny").is_some());
//! ```

// Schema types
pub use crate::schema::{DataKind, FieldDescriptor, ProtocolSchema};

// Protocol types
pub use crate::protocol::{
    default_registry, parse_packet, parse_packet_with, BuiltinProtocol, Capture, ChainConfig,
    Dissector, FieldValue, ParseContext, ParseResult, ProtoInfo, ProtoRecord, Protocol,
    ProtocolRegistry, Record, SkinnyInfo, SqlInfo, Subscriber,
};

// Decoding primitives
pub use crate::cursor::Cursor;

// Error types
pub use crate::error::{DecodeError, Error, ParseStatus, Result};
