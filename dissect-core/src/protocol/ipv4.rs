//! IPv4 protocol parser.

use std::net::Ipv4Addr;

use etherparse::Ipv4HeaderSlice;

use super::context::Hints;
use super::ethernet::ethertype;
use super::record::{FieldList, ProtoInfo, ProtoRecord};
use super::{FieldValue, ParseContext, ParseResult, Protocol};
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::schema::{DataKind, FieldDescriptor};

/// Link type for raw IPv4/IPv6 captures.
pub const LINKTYPE_RAW: u16 = 101;

const MIN_HEADER_LEN: usize = 20;

/// Decoded IPv4 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Info {
    pub info: ProtoInfo,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub total_length: u16,
    pub identification: u16,
    pub dont_fragment: bool,
    pub more_fragments: bool,
    pub ttl: u8,
    pub protocol: u8,
}

impl ProtoRecord for Ipv4Info {
    fn info(&self) -> &ProtoInfo {
        &self.info
    }

    fn fields(&self) -> FieldList<'_> {
        let mut out = FieldList::new();
        out.push(("src_ip", FieldValue::IpAddr(self.src_ip.into())));
        out.push(("dst_ip", FieldValue::IpAddr(self.dst_ip.into())));
        out.push(("total_length", FieldValue::UInt16(self.total_length)));
        out.push(("identification", FieldValue::UInt16(self.identification)));
        out.push(("dont_fragment", FieldValue::Bool(self.dont_fragment)));
        out.push(("more_fragments", FieldValue::Bool(self.more_fragments)));
        out.push(("ttl", FieldValue::UInt8(self.ttl)));
        out.push(("protocol", FieldValue::UInt8(self.protocol)));
        out
    }
}

/// IPv4 protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Protocol;

impl Ipv4Protocol {
    fn decode(cursor: &mut Cursor<'_>) -> DecodeResult<(Ipv4Info, Hints)> {
        let first = cursor.peek_u8()?;
        if first >> 4 != 4 {
            return Err(DecodeError::malformed("version", format!("{}", first >> 4)));
        }
        let header_len = usize::from(first & 0x0f) * 4;
        if header_len < MIN_HEADER_LEN {
            return Err(DecodeError::malformed("ihl", format!("{header_len} bytes")));
        }
        let header = cursor.peek_bytes(header_len)?;
        let ipv4 = Ipv4HeaderSlice::from_slice(header)
            .map_err(|e| DecodeError::malformed("header", e.to_string()))?;

        let total_length = ipv4.total_len();
        let payload = usize::from(total_length)
            .checked_sub(header_len)
            .ok_or_else(|| {
                DecodeError::malformed("total_length", format!("{total_length} below header"))
            })?;

        let record = Ipv4Info {
            info: ProtoInfo::new(header_len, payload),
            src_ip: ipv4.source_addr(),
            dst_ip: ipv4.destination_addr(),
            total_length,
            identification: ipv4.identification(),
            dont_fragment: ipv4.dont_fragment(),
            more_fragments: ipv4.more_fragments(),
            ttl: ipv4.ttl(),
            protocol: ipv4.protocol().0,
        };
        cursor.skip(header_len)?;

        let mut child_hints = Hints::new();
        child_hints.push(("ip_protocol", u64::from(record.protocol)));
        child_hints.push(("ip_version", 4));
        Ok((record, child_hints))
    }
}

impl Protocol for Ipv4Protocol {
    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn display_name(&self) -> &'static str {
        "IPv4"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == u64::from(ethertype::IPV4) => Some(100),
            _ if context.is_root() && context.link_type == LINKTYPE_RAW => Some(50),
            _ => None,
        }
    }

    fn parse<'a>(&self, cursor: &mut Cursor<'a>, _context: &ParseContext) -> ParseResult<'a> {
        match Self::decode(cursor) {
            // Link-layer padding past the datagram is not handed on
            Ok((record, hints)) => {
                let rest = cursor.rest();
                let body = &rest[..rest.len().min(record.info.payload)];
                ParseResult::success(record, body, hints)
            }
            Err(e) => ParseResult::error(e.in_protocol(self.name()), cursor.rest()),
        }
    }

    fn schema_fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("ipv4.src_ip", DataKind::IpAddr).set_nullable(true),
            FieldDescriptor::new("ipv4.dst_ip", DataKind::IpAddr).set_nullable(true),
            FieldDescriptor::new("ipv4.total_length", DataKind::UInt16).set_nullable(true),
            FieldDescriptor::new("ipv4.identification", DataKind::UInt16).set_nullable(true),
            FieldDescriptor::new("ipv4.dont_fragment", DataKind::Bool).set_nullable(true),
            FieldDescriptor::new("ipv4.more_fragments", DataKind::Bool).set_nullable(true),
            FieldDescriptor::new("ipv4.ttl", DataKind::UInt8).set_nullable(true),
            FieldDescriptor::new("ipv4.protocol", DataKind::UInt8).set_nullable(true),
        ]
    }

    fn child_protocols(&self) -> &[&'static str] {
        &["tcp", "udp"]
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["ethernet"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseStatus;

    fn ipv4_context() -> ParseContext {
        let mut context = ParseContext::new(1);
        context.insert_hint("ethertype", 0x0800);
        context
    }

    #[test]
    fn test_parse_ipv4() {
        // Minimal IPv4 header (20 bytes) with TCP protocol
        let packet = [
            0x45, // Version (4) + IHL (5)
            0x00, // DSCP + ECN
            0x00, 0x18, // Total length: 24
            0x00, 0x01, // Identification
            0x40, 0x00, // Flags (DF) + Fragment offset
            0x40, // TTL: 64
            0x06, // Protocol: TCP (6)
            0x00, 0x00, // Checksum (not validated)
            0xc0, 0xa8, 0x01, 0x01, // Src: 192.168.1.1
            0xc0, 0xa8, 0x01, 0x02, // Dst: 192.168.1.2
            0xde, 0xad, 0xbe, 0xef, // Payload
            0x00, 0x00, // Ethernet padding
        ];

        let mut cursor = Cursor::new(&packet);
        let result = Ipv4Protocol.parse(&mut cursor, &ipv4_context());

        assert!(result.is_ok());
        assert_eq!(result.get("ttl"), Some(FieldValue::UInt8(64)));
        assert_eq!(result.get("protocol"), Some(FieldValue::UInt8(6)));
        assert_eq!(result.get("dont_fragment"), Some(FieldValue::Bool(true)));
        assert_eq!(
            result.get("src_ip").and_then(|v| v.as_ip()),
            Some(Ipv4Addr::new(192, 168, 1, 1).into())
        );
        assert_eq!(result.hint("ip_protocol"), Some(6u64));
        assert_eq!(result.info(), Some(&ProtoInfo::new(20, 4)));
        // Padding is dropped
        assert_eq!(result.remaining, &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_declared_payload_beyond_capture() {
        let packet = [
            0x45, 0x00, 0x05, 0xdc, // Total length: 1500
            0x00, 0x00, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00,
            0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x02,
            0x01, 0x02, // only 2 bytes of payload captured
        ];

        let mut cursor = Cursor::new(&packet);
        let result = Ipv4Protocol.parse(&mut cursor, &ipv4_context());

        assert!(result.is_ok());
        assert_eq!(result.info(), Some(&ProtoInfo::new(20, 1480)));
        assert_eq!(result.remaining.len(), 2);
    }

    #[test]
    fn test_parse_ipv4_with_options() {
        let packet = [
            0x46, 0x00, 0x00, 0x18, // IHL 6, total 24
            0x00, 0x00, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00,
            0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x02,
            0x01, 0x01, 0x01, 0x00, // NOP NOP NOP EOL
        ];

        let mut cursor = Cursor::new(&packet);
        let result = Ipv4Protocol.parse(&mut cursor, &ipv4_context());

        assert!(result.is_ok());
        assert_eq!(result.info(), Some(&ProtoInfo::new(24, 0)));
        assert!(result.remaining.is_empty());
    }

    #[test]
    fn test_truncated_and_malformed_headers() {
        let mut cursor = Cursor::new(&[0x45, 0x00, 0x00]);
        let result = Ipv4Protocol.parse(&mut cursor, &ipv4_context());
        assert_eq!(result.status(), ParseStatus::TooShort);

        let mut cursor = Cursor::new(&[0x65; 20]);
        let result = Ipv4Protocol.parse(&mut cursor, &ipv4_context());
        assert_eq!(result.status(), ParseStatus::Malformed);

        let mut cursor = Cursor::new(&[0x44; 20]);
        let result = Ipv4Protocol.parse(&mut cursor, &ipv4_context());
        assert_eq!(result.status(), ParseStatus::Malformed);
    }

    #[test]
    fn test_can_parse_ipv4() {
        assert!(Ipv4Protocol.can_parse(&ParseContext::new(1)).is_none());
        assert_eq!(Ipv4Protocol.can_parse(&ipv4_context()), Some(100));
        assert_eq!(Ipv4Protocol.can_parse(&ParseContext::new(LINKTYPE_RAW)), Some(50));
    }
}
