//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Rendering dissected frames as text, CSV or JSON lines

mod args;
mod output;

pub use args::Args;
pub use output::{FrameView, OutputFormat, OutputFormatter};
