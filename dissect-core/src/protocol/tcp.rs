//! TCP protocol parser.
//!
//! Segments are dissected one at a time; there is no stream reassembly, so an
//! application message must start at the beginning of a segment to be seen.

use bitflags::bitflags;
use etherparse::TcpHeaderSlice;

use super::context::Hints;
use super::record::{FieldList, ProtoInfo, ProtoRecord};
use super::{FieldValue, ParseContext, ParseResult, Protocol};
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::schema::{DataKind, FieldDescriptor};

/// IP protocol number for TCP.
pub const IP_PROTO_TCP: u8 = 6;

const MIN_HEADER_LEN: usize = 20;

bitflags! {
    /// TCP control bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TcpFlags: u16 {
        const FIN = 0x001;
        const SYN = 0x002;
        const RST = 0x004;
        const PSH = 0x008;
        const ACK = 0x010;
        const URG = 0x020;
        const ECE = 0x040;
        const CWR = 0x080;
        const NS = 0x100;
    }
}

/// Decoded TCP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpInfo {
    pub info: ProtoInfo,
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub window: u16,
}

impl ProtoRecord for TcpInfo {
    fn info(&self) -> &ProtoInfo {
        &self.info
    }

    fn fields(&self) -> FieldList<'_> {
        let mut out = FieldList::new();
        out.push(("src_port", FieldValue::UInt16(self.src_port)));
        out.push(("dst_port", FieldValue::UInt16(self.dst_port)));
        out.push(("seq", FieldValue::UInt32(self.seq)));
        out.push(("ack", FieldValue::UInt32(self.ack)));
        out.push(("flags", FieldValue::UInt16(self.flags.bits())));
        out.push(("window", FieldValue::UInt16(self.window)));
        out
    }
}

fn flags_of(tcp: &TcpHeaderSlice<'_>) -> TcpFlags {
    let mut flags = TcpFlags::empty();
    flags.set(TcpFlags::FIN, tcp.fin());
    flags.set(TcpFlags::SYN, tcp.syn());
    flags.set(TcpFlags::RST, tcp.rst());
    flags.set(TcpFlags::PSH, tcp.psh());
    flags.set(TcpFlags::ACK, tcp.ack());
    flags.set(TcpFlags::URG, tcp.urg());
    flags.set(TcpFlags::ECE, tcp.ece());
    flags.set(TcpFlags::CWR, tcp.cwr());
    flags.set(TcpFlags::NS, tcp.ns());
    flags
}

/// TCP protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct TcpProtocol;

impl TcpProtocol {
    fn decode(cursor: &mut Cursor<'_>, context: &ParseContext) -> DecodeResult<(TcpInfo, Hints)> {
        let declared = context.declared_or(cursor.remaining());
        let fixed = cursor.peek_bytes(MIN_HEADER_LEN)?;
        let header_len = usize::from(fixed[12] >> 4) * 4;
        if header_len < MIN_HEADER_LEN {
            return Err(DecodeError::malformed("data_offset", format!("{header_len} bytes")));
        }
        let header = cursor.read_bytes(header_len)?;
        let tcp = TcpHeaderSlice::from_slice(header)
            .map_err(|e| DecodeError::malformed("header", e.to_string()))?;

        let record = TcpInfo {
            info: ProtoInfo::new(header_len, declared.saturating_sub(header_len)),
            src_port: tcp.source_port(),
            dst_port: tcp.destination_port(),
            seq: tcp.sequence_number(),
            ack: tcp.acknowledgment_number(),
            flags: flags_of(&tcp),
            window: tcp.window_size(),
        };

        let mut child_hints = Hints::new();
        child_hints.push(("src_port", u64::from(record.src_port)));
        child_hints.push(("dst_port", u64::from(record.dst_port)));
        child_hints.push(("transport", u64::from(IP_PROTO_TCP)));
        Ok((record, child_hints))
    }
}

impl Protocol for TcpProtocol {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn display_name(&self) -> &'static str {
        "TCP"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == u64::from(IP_PROTO_TCP) => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, cursor: &mut Cursor<'a>, context: &ParseContext) -> ParseResult<'a> {
        let outcome = Self::decode(cursor, context);
        ParseResult::from_decode(self.name(), outcome, cursor)
    }

    fn schema_fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("tcp.src_port", DataKind::UInt16).set_nullable(true),
            FieldDescriptor::new("tcp.dst_port", DataKind::UInt16).set_nullable(true),
            FieldDescriptor::new("tcp.seq", DataKind::UInt32).set_nullable(true),
            FieldDescriptor::new("tcp.ack", DataKind::UInt32).set_nullable(true),
            FieldDescriptor::new("tcp.flags", DataKind::UInt16)
                .set_nullable(true)
                .with_description("Control bits, FIN = 0x01 through NS = 0x100"),
            FieldDescriptor::new("tcp.window", DataKind::UInt16).set_nullable(true),
        ]
    }

    fn child_protocols(&self) -> &[&'static str] {
        &["tns", "skinny"]
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["ipv4", "ipv6"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseStatus;

    fn tcp_context() -> ParseContext {
        let mut context = ParseContext::new(1);
        context.insert_hint("ip_protocol", 6);
        context
    }

    #[test]
    fn test_parse_tcp() {
        let segment = [
            0x9c, 0x40, // Src port: 40000
            0x05, 0xf1, // Dst port: 1521
            0x00, 0x00, 0x00, 0x01, // Seq: 1
            0x00, 0x00, 0x00, 0x00, // Ack: 0
            0x50, 0x18, // Data offset 5, flags PSH+ACK
            0xff, 0xff, // Window
            0x00, 0x00, // Checksum
            0x00, 0x00, // Urgent pointer
            0x00, 0x08, 0x00, 0x00, // Payload
        ];

        let mut cursor = Cursor::new(&segment);
        let result = TcpProtocol.parse(&mut cursor, &tcp_context());

        assert!(result.is_ok());
        assert_eq!(result.get("dst_port"), Some(FieldValue::UInt16(1521)));
        assert_eq!(result.get("flags"), Some(FieldValue::UInt16(0x18)));
        assert_eq!(result.hint("dst_port"), Some(1521));
        assert_eq!(result.hint("transport"), Some(6));
        assert_eq!(result.info(), Some(&ProtoInfo::new(20, 4)));
        assert_eq!(result.remaining.len(), 4);

        let tcp = result.record.as_ref().and_then(|r| r.as_tcp()).unwrap();
        assert!(tcp.flags.contains(TcpFlags::PSH | TcpFlags::ACK));
        assert!(!tcp.flags.contains(TcpFlags::SYN));
    }

    #[test]
    fn test_payload_from_declared_length() {
        let segment = [
            0x07, 0xd0, 0x9c, 0x40, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
            0x50, 0x10, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut context = tcp_context();
        context.declared_len = Some(120);

        let mut cursor = Cursor::new(&segment);
        let result = TcpProtocol.parse(&mut cursor, &context);

        assert_eq!(result.info(), Some(&ProtoInfo::new(20, 100)));
        assert!(result.remaining.is_empty());
    }

    #[test]
    fn test_tcp_options_truncated() {
        // Data offset 8 (32 bytes) with only 24 captured
        let mut segment = vec![0u8; 24];
        segment[12] = 0x80;

        let mut cursor = Cursor::new(&segment);
        let result = TcpProtocol.parse(&mut cursor, &tcp_context());
        assert_eq!(result.status(), ParseStatus::TooShort);
    }

    #[test]
    fn test_bad_data_offset() {
        let mut segment = vec![0u8; 20];
        segment[12] = 0x30;

        let mut cursor = Cursor::new(&segment);
        let result = TcpProtocol.parse(&mut cursor, &tcp_context());
        assert_eq!(result.status(), ParseStatus::Malformed);
    }

    #[test]
    fn test_can_parse_tcp() {
        assert!(TcpProtocol.can_parse(&ParseContext::new(1)).is_none());
        assert!(TcpProtocol.can_parse(&tcp_context()).is_some());
    }
}
