//! Output formatting for dissected frames.
//!
//! Each frame is rendered with every decoded layer in chain order: the layer
//! name, its status and the fields present in its record. Layers that failed
//! carry their status and error text instead of fields.

use std::io::Write;

use clap::ValueEnum;
use dissect_core::protocol::{FieldValue, ParseResult, ProtoRecord};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per frame (default)
    Text,
    /// One row per layer
    Csv,
    /// JSON Lines (one JSON object per frame)
    Json,
}

/// A dissected frame ready for output.
#[derive(Debug)]
pub struct FrameView<'r, 'a> {
    pub frame_number: u64,
    pub timestamp_us: i64,
    pub captured_len: usize,
    pub wire_len: usize,
    pub layers: &'r [(&'static str, ParseResult<'a>)],
}

/// Formats dissected frames for output.
pub struct OutputFormatter {
    format: OutputFormat,
    only: Option<String>,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format, only: None }
    }

    /// Restrict output to layers of one protocol.
    pub fn with_only(mut self, protocol: Option<String>) -> Self {
        self.only = protocol;
        self
    }

    /// Write any preamble the format needs.
    pub fn write_header<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Csv => writeln!(writer, "frame,protocol,status,fields"),
            OutputFormat::Text | OutputFormat::Json => Ok(()),
        }
    }

    /// Format one frame and write it to the given writer.
    ///
    /// Returns false when the protocol filter left nothing to write.
    pub fn write<W: Write>(&self, frame: &FrameView<'_, '_>, writer: &mut W) -> std::io::Result<bool> {
        let layers: Vec<_> = frame
            .layers
            .iter()
            .filter(|(name, _)| self.only.as_deref().map_or(true, |only| only == *name))
            .collect();
        if layers.is_empty() {
            return Ok(false);
        }

        match self.format {
            OutputFormat::Text => Self::write_text(frame, &layers, writer)?,
            OutputFormat::Csv => Self::write_csv(frame, &layers, writer)?,
            OutputFormat::Json => Self::write_json(frame, &layers, writer)?,
        }
        Ok(true)
    }

    /// `k=v` pairs of the present fields, space separated.
    fn field_pairs(result: &ParseResult<'_>, separator: &str) -> String {
        let Some(record) = &result.record else {
            return String::new();
        };
        record
            .fields()
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn write_text<W: Write>(
        frame: &FrameView<'_, '_>,
        layers: &[&(&'static str, ParseResult<'_>)],
        writer: &mut W,
    ) -> std::io::Result<()> {
        write!(writer, "#{} {}/{}", frame.frame_number, frame.captured_len, frame.wire_len)?;
        for (name, result) in layers {
            match &result.error {
                None => write!(writer, " {name}{{{}}}", Self::field_pairs(result, " "))?,
                Some(e) => write!(writer, " {name}[{}: {e}]", result.status())?,
            }
        }
        writeln!(writer)
    }

    fn write_csv<W: Write>(
        frame: &FrameView<'_, '_>,
        layers: &[&(&'static str, ParseResult<'_>)],
        writer: &mut W,
    ) -> std::io::Result<()> {
        for (name, result) in layers {
            let value = match &result.error {
                None => Self::field_pairs(result, ";"),
                Some(e) => e.to_string(),
            };
            // Escape commas and quotes
            let value = if value.contains(',') || value.contains('"') || value.contains('\n') {
                format!("\"{}\"", value.replace('"', "\"\""))
            } else {
                value
            };
            writeln!(writer, "{},{name},{},{value}", frame.frame_number, result.status())?;
        }
        Ok(())
    }

    fn write_json<W: Write>(
        frame: &FrameView<'_, '_>,
        layers: &[&(&'static str, ParseResult<'_>)],
        writer: &mut W,
    ) -> std::io::Result<()> {
        let layers: Vec<serde_json::Value> = layers
            .iter()
            .map(|(name, result)| {
                let mut obj = serde_json::Map::new();
                obj.insert("protocol".into(), (*name).into());
                obj.insert("status".into(), result.status().as_str().into());
                if let Some(e) = &result.error {
                    obj.insert("error".into(), e.to_string().into());
                }
                if let Some(record) = &result.record {
                    let fields: serde_json::Map<_, _> = record
                        .fields()
                        .iter()
                        .filter(|(_, value)| !value.is_null())
                        .map(|(name, value)| ((*name).to_string(), json_value(value)))
                        .collect();
                    obj.insert("fields".into(), fields.into());
                }
                serde_json::Value::Object(obj)
            })
            .collect();

        let value = serde_json::json!({
            "frame": frame.frame_number,
            "timestamp_us": frame.timestamp_us,
            "captured_len": frame.captured_len,
            "wire_len": frame.wire_len,
            "layers": layers,
        });
        writeln!(writer, "{value}")
    }
}

fn json_value(value: &FieldValue<'_>) -> serde_json::Value {
    if let Some(n) = value.as_u64() {
        return n.into();
    }
    if let Some(s) = value.as_str() {
        return s.into();
    }
    match value {
        FieldValue::Bool(b) => (*b).into(),
        FieldValue::Null => serde_json::Value::Null,
        // Addresses and raw bytes in their display form
        other => other.to_string().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dissect_core::protocol::{default_registry, parse_packet};
    use dissect_core::ProtocolError;

    // Ethernet + IPv4 + UDP with 4 payload bytes
    const UDP_FRAME: [u8; 46] = [
        0x02, 0x00, 0x00, 0x00, 0x00, 0x02, // Dst MAC
        0x02, 0x00, 0x00, 0x00, 0x00, 0x01, // Src MAC
        0x08, 0x00, // EtherType: IPv4
        0x45, 0x00, 0x00, 0x20, // Version/IHL, TOS, total length 32
        0x00, 0x01, 0x00, 0x00, // Identification, flags
        0x40, 0x11, 0x00, 0x00, // TTL 64, UDP, checksum
        0x0a, 0x00, 0x00, 0x01, // 10.0.0.1
        0x0a, 0x00, 0x00, 0x02, // 10.0.0.2
        0x30, 0x39, 0x00, 0x35, // Ports 12345 -> 53
        0x00, 0x0c, 0x00, 0x00, // Length 12, checksum
        0xde, 0xad, 0xbe, 0xef, // Payload
    ];

    fn render(format: OutputFormat, only: Option<&str>) -> String {
        let registry = default_registry();
        let layers = parse_packet(&registry, 1, &UDP_FRAME);
        let frame = FrameView {
            frame_number: 3,
            timestamp_us: 42,
            captured_len: UDP_FRAME.len(),
            wire_len: UDP_FRAME.len(),
            layers: &layers,
        };

        let formatter = OutputFormatter::new(format).with_only(only.map(String::from));
        let mut output = Vec::new();
        formatter.write_header(&mut output).unwrap();
        formatter.write(&frame, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_text_output() {
        let output = render(OutputFormat::Text, None);
        assert!(output.starts_with("#3 46/46 ethernet{"), "{output}");
        assert!(output.contains("src_ip=10.0.0.1"), "{output}");
        assert!(output.contains(" udp{src_port=12345 dst_port=53"), "{output}");
        assert!(output.ends_with("}\n"));
    }

    #[test]
    fn test_csv_output() {
        let output = render(OutputFormat::Csv, None);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "frame,protocol,status,fields");
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("3,udp,OK,src_port=12345;dst_port=53"));
    }

    #[test]
    fn test_json_output() {
        let output = render(OutputFormat::Json, Some("udp"));
        let value: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(value["frame"], 3);
        assert_eq!(value["layers"].as_array().unwrap().len(), 1);
        assert_eq!(value["layers"][0]["protocol"], "udp");
        assert_eq!(value["layers"][0]["status"], "OK");
        assert_eq!(value["layers"][0]["fields"]["dst_port"], 53);
    }

    #[test]
    fn test_only_filter_skips_frame() {
        assert_eq!(render(OutputFormat::Text, Some("tns")), "");
    }

    #[test]
    fn test_failed_layer() {
        let layers = vec![(
            "tns",
            ParseResult::error(
                ProtocolError::PacketTooShort {
                    protocol: "tns",
                    needed: 64,
                    have: 8,
                },
                &[],
            ),
        )];
        let frame = FrameView {
            frame_number: 1,
            timestamp_us: 0,
            captured_len: 62,
            wire_len: 118,
            layers: &layers,
        };

        let mut output = Vec::new();
        OutputFormatter::new(OutputFormat::Text).write(&frame, &mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "#1 62/118 tns[TOO_SHORT: tns: packet too short (need 64 bytes, have 8)]\n"
        );
    }
}
