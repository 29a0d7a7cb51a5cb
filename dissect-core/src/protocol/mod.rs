//! Protocol dissection framework.
//!
//! This module provides:
//! - [`Protocol`] trait for implementing dissectors
//! - [`ProtocolRegistry`] for managing registered dissectors
//! - [`parse_packet`] / [`parse_packet_with`] to run a capture through the chain
//! - [`Dissector`] to deliver the decoded records to subscribers
//!
//! ## Supported Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet II |
//! | Network | IPv4, IPv6 |
//! | Transport | TCP, UDP |
//! | Application | TNS (Oracle database), Skinny (SCCP VoIP signalling) |
//!
//! ## Example
//!
//! ```rust
//! use dissect_core::protocol::{default_registry, parse_packet};
//!
//! let registry = default_registry();
//! let packet_data: &[u8] = &[
//!     // Ethernet header (14 bytes)
//!     0xff, 0xff, 0xff, 0xff, 0xff, 0xff,  // dst mac
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x00,  // src mac
//!     0x08, 0x00,                          // ethertype (IPv4)
//!     // IPv4 header would follow...
//! ];
//!
//! let results = parse_packet(&registry, 1, packet_data); // 1 = Ethernet
//! for (name, result) in results {
//!     println!("{}: {:?}", name, result.status());
//! }
//! ```

mod context;
mod field;
mod hook;
pub(crate) mod record;
mod registry;
mod sql;

// Protocol implementations
mod ethernet;
mod ipv4;
mod ipv6;
mod skinny;
mod tcp;
mod tns;
mod udp;

// Test utilities (only compiled for tests)
#[cfg(test)]
pub mod test_utils;

use tracing::{debug, warn};

pub use context::{HintEntry, Hints, ParseContext, ParseResult};
pub use field::FieldValue;
pub use hook::{Dissector, Hooks, Subscriber};
pub use record::{FieldEntry, FieldList, ProtoInfo, ProtoRecord, Record};
pub use registry::{BuiltinProtocol, Protocol, ProtocolRegistry};
pub use sql::{RequestStatus, SqlEncoding, SqlFields, SqlInfo, SqlMsgType};

// Re-export protocol implementations
pub use ethernet::{EthernetInfo, EthernetProtocol, LINKTYPE_ETHERNET};
pub use ipv4::{Ipv4Info, Ipv4Protocol, LINKTYPE_RAW};
pub use ipv6::{Ipv6Info, Ipv6Protocol};
pub use skinny::{SkinnyFields, SkinnyInfo, SkinnyProtocol, SKINNY_PORT};
pub use tcp::{TcpFlags, TcpInfo, TcpProtocol};
pub use tns::{PacketType as TnsPacketType, TnsProtocol, TNS_PORT};
pub use udp::{UdpInfo, UdpProtocol};

// Protocol constants
pub use ethernet::ethertype;
pub use ipv6::next_header;
pub use skinny::{header_version as skinny_header_version, msg as skinny_msg};

use crate::cursor::Cursor;
use crate::error::ParseStatus;

/// Create a registry with all built-in protocol dissectors.
pub fn default_registry() -> ProtocolRegistry {
    let mut registry = ProtocolRegistry::new();

    // Layer 2
    registry.register(EthernetProtocol);

    // Layer 3
    registry.register(Ipv4Protocol);
    registry.register(Ipv6Protocol);

    // Layer 4
    registry.register(TcpProtocol);
    registry.register(UdpProtocol);

    // Application layer
    registry.register(TnsProtocol);
    registry.register(SkinnyProtocol);

    registry
}

/// One captured frame handed to the chain.
///
/// `wire_len` is the length the frame had on the wire; `data` may be shorter
/// when the capture used a snap length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture<'a> {
    pub link_type: u16,
    pub data: &'a [u8],
    pub wire_len: usize,
    pub timestamp_us: i64,
}

impl<'a> Capture<'a> {
    /// A capture with nothing cut off.
    pub fn new(link_type: u16, data: &'a [u8]) -> Self {
        Self {
            link_type,
            data,
            wire_len: data.len(),
            timestamp_us: 0,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.wire_len
    }
}

/// Limits applied while walking the layer chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    /// Maximum number of layers decoded per frame.
    pub max_layers: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        // Eth/IP/TCP/App with room to spare
        Self { max_layers: 8 }
    }
}

/// Parse a packet through all protocol layers.
pub fn parse_packet<'a>(
    registry: &ProtocolRegistry,
    link_type: u16,
    data: &'a [u8],
) -> Vec<(&'static str, ParseResult<'a>)> {
    parse_packet_with(registry, &Capture::new(link_type, data), &ChainConfig::default())
}

/// Parse a captured frame through all protocol layers.
///
/// Each layer gets a fresh cursor over what the previous layer left, and
/// the previous layer's declared payload as its declared length. The walk
/// stops at the first layer that fails, when no dissector claims the
/// remaining bytes, or after `config.max_layers` layers.
pub fn parse_packet_with<'a>(
    registry: &ProtocolRegistry,
    capture: &Capture<'a>,
    config: &ChainConfig,
) -> Vec<(&'static str, ParseResult<'a>)> {
    let mut results = Vec::with_capacity(config.max_layers.min(8));
    let mut context = ParseContext::with_wire_len(capture.link_type, capture.wire_len);
    let mut remaining = capture.data;

    while !remaining.is_empty() && results.len() < config.max_layers {
        let Some(parser) = registry.find_parser(&context) else {
            break;
        };
        let name = parser.name();
        debug!(protocol = name, offset = context.offset, "dissector selected");

        let mut cursor = Cursor::new(remaining);
        let result = parser.parse(&mut cursor, &context);

        match result.status() {
            ParseStatus::Ok => {}
            ParseStatus::TooShort => {
                debug!(protocol = name, error = ?result.error, "layer truncated");
            }
            ParseStatus::Malformed => {
                warn!(protocol = name, error = ?result.error, "malformed message dropped");
            }
        }

        // Update context for next layer
        context.parent_protocol = Some(name);
        context.hints = result.child_hints.clone();
        context.offset += cursor.position();
        context.declared_len = result.info().map(|info| info.payload);

        let should_stop = result.error.is_some();
        remaining = result.remaining;

        results.push((name, result));

        if should_stop {
            break;
        }
    }

    results
}
