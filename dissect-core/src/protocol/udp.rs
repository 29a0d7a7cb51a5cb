//! UDP protocol parser.

use etherparse::UdpHeaderSlice;

use super::context::Hints;
use super::record::{FieldList, ProtoInfo, ProtoRecord};
use super::{FieldValue, ParseContext, ParseResult, Protocol};
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::schema::{DataKind, FieldDescriptor};

/// IP protocol number for UDP.
pub const IP_PROTO_UDP: u8 = 17;

const HEADER_LEN: usize = 8;

/// Decoded UDP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpInfo {
    pub info: ProtoInfo,
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
}

impl ProtoRecord for UdpInfo {
    fn info(&self) -> &ProtoInfo {
        &self.info
    }

    fn fields(&self) -> FieldList<'_> {
        let mut out = FieldList::new();
        out.push(("src_port", FieldValue::UInt16(self.src_port)));
        out.push(("dst_port", FieldValue::UInt16(self.dst_port)));
        out.push(("length", FieldValue::UInt16(self.length)));
        out.push(("checksum", FieldValue::UInt16(self.checksum)));
        out
    }
}

/// UDP protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct UdpProtocol;

impl UdpProtocol {
    fn decode(cursor: &mut Cursor<'_>) -> DecodeResult<(UdpInfo, Hints)> {
        let header = cursor.read_bytes(HEADER_LEN)?;
        let udp = UdpHeaderSlice::from_slice(header)
            .map_err(|e| DecodeError::malformed("header", e.to_string()))?;

        let length = udp.length();
        let payload = usize::from(length)
            .checked_sub(HEADER_LEN)
            .ok_or_else(|| DecodeError::malformed("length", format!("{length} below header")))?;

        let record = UdpInfo {
            info: ProtoInfo::new(HEADER_LEN, payload),
            src_port: udp.source_port(),
            dst_port: udp.destination_port(),
            length,
            checksum: udp.checksum(),
        };

        let mut child_hints = Hints::new();
        child_hints.push(("src_port", u64::from(record.src_port)));
        child_hints.push(("dst_port", u64::from(record.dst_port)));
        child_hints.push(("transport", u64::from(IP_PROTO_UDP)));
        Ok((record, child_hints))
    }
}

impl Protocol for UdpProtocol {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn display_name(&self) -> &'static str {
        "UDP"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ip_protocol") {
            Some(proto) if proto == u64::from(IP_PROTO_UDP) => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, cursor: &mut Cursor<'a>, _context: &ParseContext) -> ParseResult<'a> {
        let outcome = Self::decode(cursor);
        ParseResult::from_decode(self.name(), outcome, cursor)
    }

    fn schema_fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("udp.src_port", DataKind::UInt16).set_nullable(true),
            FieldDescriptor::new("udp.dst_port", DataKind::UInt16).set_nullable(true),
            FieldDescriptor::new("udp.length", DataKind::UInt16).set_nullable(true),
            FieldDescriptor::new("udp.checksum", DataKind::UInt16).set_nullable(true),
        ]
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["ipv4", "ipv6"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseStatus;

    fn udp_context() -> ParseContext {
        let mut context = ParseContext::new(1);
        context.insert_hint("ip_protocol", 17);
        context
    }

    #[test]
    fn test_parse_udp() {
        // UDP header (8 bytes)
        let header = [
            0x00, 0x35, // Src port: 53 (DNS)
            0xc0, 0x00, // Dst port: 49152
            0x00, 0x20, // Length: 32
            0x00, 0x00, // Checksum
            // Payload would follow
            0xde, 0xad, 0xbe, 0xef,
        ];

        let mut cursor = Cursor::new(&header);
        let result = UdpProtocol.parse(&mut cursor, &udp_context());

        assert!(result.is_ok());
        assert_eq!(result.get("src_port"), Some(FieldValue::UInt16(53)));
        assert_eq!(result.get("dst_port"), Some(FieldValue::UInt16(49152)));
        assert_eq!(result.get("length"), Some(FieldValue::UInt16(32)));
        assert_eq!(result.info(), Some(&ProtoInfo::new(8, 24)));
        assert_eq!(result.remaining.len(), 4); // Captured payload bytes
    }

    #[test]
    fn test_udp_child_hints() {
        let header = [
            0x12, 0x34, // Src port: 4660
            0x56, 0x78, // Dst port: 22136
            0x00, 0x10, // Length: 16
            0x00, 0x00, // Checksum
        ];

        let mut cursor = Cursor::new(&header);
        let result = UdpProtocol.parse(&mut cursor, &udp_context());

        assert!(result.is_ok());
        assert_eq!(result.hint("src_port"), Some(4660u64));
        assert_eq!(result.hint("dst_port"), Some(22136u64));
        assert_eq!(result.hint("transport"), Some(17u64));
    }

    #[test]
    fn test_parse_udp_too_short() {
        let short_header = [0x00, 0x35, 0xc0, 0x00]; // Only 4 bytes

        let mut cursor = Cursor::new(&short_header);
        let result = UdpProtocol.parse(&mut cursor, &udp_context());

        assert!(!result.is_ok());
        assert_eq!(result.status(), ParseStatus::TooShort);
    }

    #[test]
    fn test_udp_length_below_header() {
        let header = [0x00, 0x50, 0x00, 0x51, 0x00, 0x04, 0x00, 0x00];

        let mut cursor = Cursor::new(&header);
        let result = UdpProtocol.parse(&mut cursor, &udp_context());

        assert_eq!(result.status(), ParseStatus::Malformed);
    }
}
