//! Field schemas of the built-in dissectors.
//!
//! Each [`Protocol`](crate::protocol::Protocol) lists the fields it can emit
//! so callers can describe output without decoding any traffic.
//!
//! # Example
//!
//! ```rust
//! use dissect_core::schema::{DataKind, FieldDescriptor};
//!
//! let fields = vec![
//!     FieldDescriptor::frame_number(),
//!     FieldDescriptor::new("skinny.msg_id", DataKind::UInt32),
//!     FieldDescriptor::nullable("skinny.call_id", DataKind::UInt32),
//! ];
//! assert_eq!(fields[2].field(), "call_id");
//! ```

mod field;
mod kind;

pub use field::FieldDescriptor;
pub use kind::DataKind;

/// A protocol's complete schema.
pub type ProtocolSchema = Vec<FieldDescriptor>;
