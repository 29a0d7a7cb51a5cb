//! Raw frame representation.

use dissect_core::protocol::Capture;

/// One frame read from a capture file.
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// Frame number (1-indexed).
    pub frame_number: u64,

    /// Timestamp in microseconds since epoch.
    pub timestamp_us: i64,

    /// Length on the wire; `data` may hold fewer bytes.
    pub original_length: u32,

    /// Link layer type (e.g., 1 = Ethernet).
    pub link_type: u16,

    /// Captured bytes.
    pub data: Vec<u8>,
}

impl RawPacket {
    pub fn new(
        frame_number: u64,
        timestamp_us: i64,
        original_length: u32,
        link_type: u16,
        data: Vec<u8>,
    ) -> Self {
        Self {
            frame_number,
            timestamp_us,
            original_length,
            link_type,
            data,
        }
    }

    pub fn captured_length(&self) -> usize {
        self.data.len()
    }

    /// Check if the frame was cut by the capture snap length.
    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.original_length as usize
    }

    /// Borrow the frame as input for the layer chain.
    pub fn capture(&self) -> Capture<'_> {
        Capture {
            link_type: self.link_type,
            data: &self.data,
            // Some writers record an original length below the captured one
            wire_len: (self.original_length as usize).max(self.data.len()),
            timestamp_us: self.timestamp_us,
        }
    }
}
