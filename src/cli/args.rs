//! Command-line argument definitions.

use clap::Parser;
use std::path::PathBuf;

use super::OutputFormat;

/// Dissect the frames of a PCAP or PCAPNG capture.
#[derive(Parser, Debug)]
#[command(name = "dissect")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Capture file to read (.pcap, .pcapng, optionally .gz)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Output format for stdout
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Stop after this many frames
    #[arg(short = 'n', long = "limit", value_name = "N")]
    pub limit: Option<u64>,

    /// Only show layers of this protocol; frames without it are skipped
    #[arg(long = "only", value_name = "PROTO")]
    pub only: Option<String>,

    /// Maximum number of layers decoded per frame
    #[arg(long = "max-layers", default_value_t = 8)]
    pub max_layers: usize,

    /// List registered protocol parsers
    #[arg(long = "list-protocols")]
    pub list_protocols: bool,

    /// Show the fields each protocol can produce
    #[arg(long = "schema")]
    pub show_schema: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Check if this is an info-only command (no capture file needed).
    pub fn is_info_only(&self) -> bool {
        self.list_protocols || self.show_schema
    }

    /// Log filter selected by the `-v` count.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
