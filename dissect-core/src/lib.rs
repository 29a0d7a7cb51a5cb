//! # dissect-core
//!
//! Layered traffic dissection over bounds-checked byte cursors.
//!
//! Every decode step reports one of three outcomes ([`ParseStatus`]): the
//! unit decoded, the capture ended before the unit did, or the bytes violate
//! the encoding. Truncated captures are normal input and never panic.
//!
//! ## Quick Start
//!
//! ```rust
//! use dissect_core::prelude::*;
//!
//! let mut dissector = Dissector::default();
//! dissector.hooks_mut().subscribe_to("tns", |_: &'static str, record: &Record| {
//!     if let Some(sql) = record.as_sql().and_then(|s| s.sql.as_deref()) {
//!         println!("query: {sql}");
//!     }
//! });
//!
//! let frame: &[u8] = &[0xff; 14]; // not an IPv4 or IPv6 ethertype
//! let results = dissector.dissect(&Capture::new(1, frame));
//! assert_eq!(results.len(), 1);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                          dissect-core                               |
//! +---------------------------------------------------------------------+
//! |  cursor      - Cursor: bounds-checked primitive readers             |
//! |  ber/        - TLV headers, object identifiers, X.509 summary       |
//! |  protocol/   - Protocol trait, registry, chain, dissectors, hooks   |
//! |  schema/     - FieldDescriptor, DataKind                            |
//! |  error       - ParseStatus, DecodeError, ProtocolError              |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Supported Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet II |
//! | Network | IPv4, IPv6 |
//! | Transport | TCP, UDP |
//! | Application | TNS, Skinny |

pub mod ber;
pub mod cursor;
pub mod error;
pub mod prelude;
pub mod protocol;
pub mod schema;

// Re-export commonly used types at crate root for convenience
pub use cursor::Cursor;
pub use error::{DecodeError, DecodeResult, Error, ParseStatus, ProtocolError, Result};
pub use protocol::{
    default_registry, parse_packet, parse_packet_with, BuiltinProtocol, Capture, ChainConfig,
    Dissector, FieldValue, Hooks, ParseContext, ParseResult, ProtoInfo, ProtoRecord, Protocol,
    ProtocolRegistry, Record, Subscriber,
};
pub use schema::{DataKind, FieldDescriptor, ProtocolSchema};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
