//! dissect CLI entry point.

use std::collections::BTreeMap;
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dissect::cli::{Args, FrameView, OutputFormatter};
use dissect::pcap::PcapReader;
use dissect_core::protocol::{default_registry, ChainConfig, Dissector, Protocol, Record};

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_filter().into()),
        )
        .with_writer(io::stderr)
        .init();

    if args.list_protocols {
        list_protocols();
        return Ok(());
    }

    if args.show_schema {
        show_schema();
        return Ok(());
    }

    let pcap_file = args
        .file
        .as_ref()
        .context("Capture file required. Use --help for usage.")?;

    let mut reader = PcapReader::open(pcap_file)
        .with_context(|| format!("Failed to open capture file: {}", pcap_file.display()))?;

    let config = ChainConfig {
        max_layers: args.max_layers,
    };
    let mut dissector = Dissector::with_config(default_registry(), config);

    // Per-protocol record counts for the closing summary
    let counts: Arc<Mutex<BTreeMap<&'static str, u64>>> = Arc::default();
    let sink = Arc::clone(&counts);
    dissector.hooks_mut().subscribe(move |protocol: &'static str, _: &Record| {
        if let Ok(mut counts) = sink.lock() {
            *counts.entry(protocol).or_default() += 1;
        }
    });

    let formatter = OutputFormatter::new(args.format).with_only(args.only.clone());
    let mut stdout = BufWriter::new(io::stdout().lock());
    formatter.write_header(&mut stdout)?;

    let mut shown = 0u64;
    while args.limit.map_or(true, |limit| reader.frame_count() < limit) {
        let Some(packet) = reader
            .next_packet()
            .with_context(|| format!("Failed to read frame {}", reader.frame_count() + 1))?
        else {
            break;
        };

        let capture = packet.capture();
        let layers = dissector.dissect(&capture);
        let frame = FrameView {
            frame_number: packet.frame_number,
            timestamp_us: packet.timestamp_us,
            captured_len: capture.data.len(),
            wire_len: capture.wire_len,
            layers: &layers,
        };
        if formatter.write(&frame, &mut stdout)? {
            shown += 1;
        }
    }
    stdout.flush()?;

    info!(frames = reader.frame_count(), shown, "Capture done");
    if let Ok(counts) = counts.lock() {
        let summary: Vec<_> = counts.iter().map(|(name, n)| format!("{name}={n}")).collect();
        eprintln!("{} frames, records: {}", reader.frame_count(), summary.join(" "));
    }
    Ok(())
}

fn list_protocols() {
    let registry = default_registry();

    println!("Registered Protocol Parsers:");
    println!("{:-<50}", "");

    for parser in registry.all_parsers() {
        println!("  {} ({})", parser.display_name(), parser.name());

        let children = parser.child_protocols();
        if !children.is_empty() {
            println!("    -> Can identify: {}", children.join(", "));
        }

        let parents = parser.dependencies();
        if !parents.is_empty() {
            println!("    <- Carried by: {}", parents.join(", "));
        }
    }
}

fn show_schema() {
    let registry = default_registry();

    println!("{:<30} {:<10} Nullable", "Field", "Type");
    println!("{:-<50}", "");

    for parser in registry.all_parsers() {
        let fields = parser.schema_fields();
        if fields.is_empty() {
            continue;
        }
        println!("\n  {} fields:", parser.display_name());
        for field in fields {
            let nullable = if field.nullable { "YES" } else { "NO" };
            println!("    {:<26} {:<10} {}", field.name, field.kind.type_name(), nullable);
        }
    }
}
