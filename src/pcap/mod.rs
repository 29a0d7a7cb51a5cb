//! Capture file reading.
//!
//! Reads legacy PCAP and PCAPNG files, optionally gzip compressed, and
//! exposes each frame as a [`RawPacket`] that can be handed to the dissector.

mod packet;
mod reader;

pub use packet::RawPacket;
pub use reader::{is_gzip_extension, PcapReader};
