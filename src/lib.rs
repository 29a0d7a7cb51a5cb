//! dissect - layered packet dissection for capture files.
//!
//! This crate reads PCAP/PCAPNG captures and runs every frame through the
//! layer chain of [`dissect_core`], rendering the decoded records.
//!
//! # Example
//!
//! ```no_run
//! use dissect::pcap::PcapReader;
//! use dissect_core::protocol::Dissector;
//!
//! fn main() -> dissect::Result<()> {
//!     let dissector = Dissector::default();
//!     for packet in PcapReader::open("capture.pcap")? {
//!         let packet = packet?;
//!         for (name, result) in dissector.dissect(&packet.capture()) {
//!             println!("{} {name}: {}", packet.frame_number, result.status());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod pcap;

pub use error::{Error, Result};
