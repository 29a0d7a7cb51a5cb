//! Error types for dissect-core.
//!
//! Decoding distinguishes two failure modes that callers must treat
//! differently:
//!
//! | Status | Meaning | Caller action |
//! |--------|---------|---------------|
//! | [`ParseStatus::TooShort`] | well-formed so far, capture ends early | stop descending, keep the frame |
//! | [`ParseStatus::Malformed`] | structural violation | drop the message |
//!
//! - [`DecodeError`] - returned by the cursor, the TLV toolkit and dissectors
//! - [`ProtocolError`] - a [`DecodeError`] attributed to a named protocol layer
//! - [`enum@Error`] - top-level error wrapping the above and I/O
//!
//! All errors implement `std::error::Error` and can be converted to `anyhow::Error`.

use std::fmt;

use thiserror::Error;

/// Outcome of a single decode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParseStatus {
    /// The unit decoded completely within the captured bytes.
    #[default]
    Ok,
    /// The unit is well-formed so far but the capture ends before its declared content.
    TooShort,
    /// The unit violates the encoding rules.
    Malformed,
}

impl ParseStatus {
    /// Short uppercase label used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStatus::Ok => "OK",
            ParseStatus::TooShort => "TOO_SHORT",
            ParseStatus::Malformed => "MALFORMED",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ParseStatus::Ok)
    }
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a decode primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough captured bytes to complete the read.
    #[error("truncated: need {needed} bytes, {available} captured")]
    TooShort { needed: usize, available: usize },

    /// The bytes violate the encoding.
    #[error("malformed {field}: {reason}")]
    Malformed { field: &'static str, reason: String },
}

impl DecodeError {
    pub fn too_short(needed: usize, available: usize) -> Self {
        DecodeError::TooShort { needed, available }
    }

    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::Malformed {
            field,
            reason: reason.into(),
        }
    }

    /// Map the error onto the three-valued status contract.
    pub fn status(&self) -> ParseStatus {
        match self {
            DecodeError::TooShort { .. } => ParseStatus::TooShort,
            DecodeError::Malformed { .. } => ParseStatus::Malformed,
        }
    }

    pub fn is_too_short(&self) -> bool {
        matches!(self, DecodeError::TooShort { .. })
    }

    /// Attach the name of the protocol layer that produced this error.
    pub fn in_protocol(self, protocol: &'static str) -> ProtocolError {
        match self {
            DecodeError::TooShort { needed, available } => ProtocolError::PacketTooShort {
                protocol,
                needed,
                have: available,
            },
            DecodeError::Malformed { field, reason } => ProtocolError::InvalidField {
                protocol,
                field,
                reason,
            },
        }
    }
}

/// Result alias for decode primitives.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Main error type for dissect-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error during protocol parsing
    #[error("Protocol parse error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error from a decode primitive outside any protocol layer
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to protocol parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet too short for protocol header or declared content
    #[error("{protocol}: packet too short (need {needed} bytes, have {have})")]
    PacketTooShort {
        protocol: &'static str,
        needed: usize,
        have: usize,
    },

    /// Invalid header field value
    #[error("{protocol}: invalid {field}: {reason}")]
    InvalidField {
        protocol: &'static str,
        field: &'static str,
        reason: String,
    },
}

impl ProtocolError {
    pub fn status(&self) -> ParseStatus {
        match self {
            ProtocolError::PacketTooShort { .. } => ParseStatus::TooShort,
            ProtocolError::InvalidField { .. } => ParseStatus::Malformed,
        }
    }

    pub fn protocol(&self) -> &'static str {
        match self {
            ProtocolError::PacketTooShort { protocol, .. } => protocol,
            ProtocolError::InvalidField { protocol, .. } => protocol,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
