//! Error types for the dissect CLI crate.

use thiserror::Error;

/// Main error type for capture reading and dissection.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading or parsing a capture file
    #[error("PCAP error: {0}")]
    Pcap(#[from] PcapError),

    /// Error raised by the dissector core
    #[error(transparent)]
    Core(#[from] dissect_core::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to capture file reading.
#[derive(Error, Debug)]
pub enum PcapError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Invalid PCAP format
    #[error("Invalid PCAP format: {reason}")]
    InvalidFormat { reason: String },
}

impl PcapError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        PcapError::InvalidFormat {
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
