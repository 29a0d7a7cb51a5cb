//! Parse context and result types.

use smallvec::SmallVec;

use super::record::{ProtoInfo, ProtoRecord, Record};
use super::FieldValue;
use crate::cursor::Cursor;
use crate::error::{DecodeResult, ParseStatus, ProtocolError};

/// Hint entry for child protocol detection: (hint_name, value).
pub type HintEntry = (&'static str, u64);

/// Hints handed to the next layer. Typically 2-4 entries.
pub type Hints = SmallVec<[HintEntry; 4]>;

/// Context passed through the parsing chain.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Link type from PCAP header (e.g., 1 = Ethernet).
    pub link_type: u16,

    /// Parent protocol that identified this protocol.
    pub parent_protocol: Option<&'static str>,

    /// Protocol-specific hints (e.g., ethertype, IP protocol number).
    pub hints: Hints,

    /// Offset into the captured packet where this protocol's data starts.
    pub offset: usize,

    /// Bytes the enclosing layer declares for this one. Starts as the
    /// on-the-wire frame length and may exceed what was captured.
    pub declared_len: Option<usize>,
}

impl ParseContext {
    /// Create a new parse context for a packet with the given link type.
    pub fn new(link_type: u16) -> Self {
        Self {
            link_type,
            parent_protocol: None,
            hints: SmallVec::new(),
            offset: 0,
            declared_len: None,
        }
    }

    /// Context for a frame whose wire length is known.
    pub fn with_wire_len(link_type: u16, wire_len: usize) -> Self {
        Self {
            declared_len: Some(wire_len),
            ..Self::new(link_type)
        }
    }

    /// Get a hint value by key (linear search, but N is small).
    #[inline]
    pub fn hint(&self, key: &str) -> Option<u64> {
        self.hints.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Insert a hint value (appends, may create duplicates).
    /// Use `set_hint()` if you need to update an existing hint.
    #[inline]
    pub fn insert_hint(&mut self, key: &'static str, value: u64) {
        self.hints.push((key, value));
    }

    /// Set a hint value (updates existing or appends).
    #[inline]
    pub fn set_hint(&mut self, key: &'static str, value: u64) {
        if let Some(entry) = self.hints.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.hints.push((key, value));
        }
    }

    /// True if either port hint equals `port`.
    pub fn has_port(&self, port: u16) -> bool {
        let port = u64::from(port);
        self.hint("src_port") == Some(port) || self.hint("dst_port") == Some(port)
    }

    /// Declared length of this layer, falling back to what was captured.
    pub fn declared_or(&self, captured: usize) -> usize {
        self.declared_len.unwrap_or(captured)
    }

    /// Check if we're at the start of the packet (no parent protocol).
    pub fn is_root(&self) -> bool {
        self.parent_protocol.is_none()
    }
}

/// Result of parsing a protocol layer.
///
/// A record is present only when the layer decoded completely; truncated
/// and malformed layers carry the error instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult<'data> {
    pub record: Option<Record>,

    /// Unconsumed captured bytes (payload for next layer).
    pub remaining: &'data [u8],

    /// Hints for child protocol identification.
    pub child_hints: Hints,

    pub error: Option<ProtocolError>,
}

impl<'data> ParseResult<'data> {
    /// Create a successful parse result.
    pub fn success(record: impl Into<Record>, remaining: &'data [u8], child_hints: Hints) -> Self {
        Self {
            record: Some(record.into()),
            remaining,
            child_hints,
            error: None,
        }
    }

    /// Create an error parse result.
    pub fn error(error: ProtocolError, remaining: &'data [u8]) -> Self {
        Self {
            record: None,
            remaining,
            child_hints: SmallVec::new(),
            error: Some(error),
        }
    }

    /// Wrap the outcome of a dissector body.
    ///
    /// On success the cursor marks the first byte of the next layer.
    pub fn from_decode<R: Into<Record>>(
        protocol: &'static str,
        outcome: DecodeResult<(R, Hints)>,
        cursor: &Cursor<'data>,
    ) -> Self {
        match outcome {
            Ok((record, hints)) => Self::success(record, cursor.rest(), hints),
            Err(e) => Self::error(e.in_protocol(protocol), cursor.rest()),
        }
    }

    pub fn status(&self) -> ParseStatus {
        self.error.as_ref().map_or(ParseStatus::Ok, |e| e.status())
    }

    /// Check if parsing was successful.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn info(&self) -> Option<&ProtoInfo> {
        self.record.as_ref().map(|r| r.info())
    }

    /// Get a field value by name (linear search, but N is small).
    pub fn get(&self, name: &str) -> Option<FieldValue<'_>> {
        self.record
            .as_ref()?
            .fields()
            .into_iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// Get a child hint value by name.
    pub fn hint(&self, name: &str) -> Option<u64> {
        self.child_hints
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
    }
}
