//! Ethernet II protocol parser.

use etherparse::Ethernet2HeaderSlice;

use super::context::Hints;
use super::record::{FieldList, ProtoInfo, ProtoRecord};
use super::{FieldValue, ParseContext, ParseResult, Protocol};
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::schema::{DataKind, FieldDescriptor};

/// Link type constant for Ethernet.
pub const LINKTYPE_ETHERNET: u16 = 1;

const HEADER_LEN: usize = 14;

/// EtherType values the chain dispatches on.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
}

/// Decoded Ethernet II header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetInfo {
    pub info: ProtoInfo,
    pub src_mac: [u8; 6],
    pub dst_mac: [u8; 6],
    pub ethertype: u16,
}

impl ProtoRecord for EthernetInfo {
    fn info(&self) -> &ProtoInfo {
        &self.info
    }

    fn fields(&self) -> FieldList<'_> {
        let mut out = FieldList::new();
        out.push(("src_mac", FieldValue::MacAddr(self.src_mac)));
        out.push(("dst_mac", FieldValue::MacAddr(self.dst_mac)));
        out.push(("ethertype", FieldValue::UInt16(self.ethertype)));
        out
    }
}

/// Ethernet II protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct EthernetProtocol;

impl EthernetProtocol {
    fn decode(cursor: &mut Cursor<'_>, context: &ParseContext) -> DecodeResult<(EthernetInfo, Hints)> {
        let declared = context.declared_or(cursor.remaining());
        let header = cursor.read_bytes(HEADER_LEN)?;
        let eth = Ethernet2HeaderSlice::from_slice(header)
            .map_err(|e| DecodeError::malformed("header", e.to_string()))?;

        let record = EthernetInfo {
            info: ProtoInfo::new(HEADER_LEN, declared.saturating_sub(HEADER_LEN)),
            src_mac: eth.source(),
            dst_mac: eth.destination(),
            ethertype: eth.ether_type().0,
        };

        let mut child_hints = Hints::new();
        child_hints.push(("ethertype", u64::from(record.ethertype)));
        Ok((record, child_hints))
    }
}

impl Protocol for EthernetProtocol {
    fn name(&self) -> &'static str {
        "ethernet"
    }

    fn display_name(&self) -> &'static str {
        "Ethernet II"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        // Parse Ethernet at the root level for Ethernet link type
        if context.is_root() && context.link_type == LINKTYPE_ETHERNET {
            Some(100)
        } else {
            None
        }
    }

    fn parse<'a>(&self, cursor: &mut Cursor<'a>, context: &ParseContext) -> ParseResult<'a> {
        let outcome = Self::decode(cursor, context);
        ParseResult::from_decode(self.name(), outcome, cursor)
    }

    fn schema_fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("ethernet.src_mac", DataKind::MacAddr).set_nullable(true),
            FieldDescriptor::new("ethernet.dst_mac", DataKind::MacAddr).set_nullable(true),
            FieldDescriptor::new("ethernet.ethertype", DataKind::UInt16).set_nullable(true),
        ]
    }

    fn child_protocols(&self) -> &[&'static str] {
        &["ipv4", "ipv6"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseStatus;

    #[test]
    fn test_parse_ethernet() {
        let frame = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // Dst MAC
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // Src MAC
            0x08, 0x00, // EtherType (IPv4)
            0x45, 0x00, // payload starts
        ];

        let mut cursor = Cursor::new(&frame);
        let result = EthernetProtocol.parse(&mut cursor, &ParseContext::new(1));

        assert!(result.is_ok());
        assert_eq!(
            result.get("src_mac"),
            Some(FieldValue::MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]))
        );
        assert_eq!(result.get("ethertype"), Some(FieldValue::UInt16(0x0800)));
        assert_eq!(result.hint("ethertype"), Some(0x0800));
        assert_eq!(result.info(), Some(&ProtoInfo::new(14, 2)));
        assert_eq!(result.remaining, &[0x45, 0x00]);
        assert_eq!(cursor.position(), 14);
    }

    #[test]
    fn test_payload_uses_wire_length() {
        let frame = [0u8; 60];
        let mut cursor = Cursor::new(&frame);
        let result = EthernetProtocol.parse(&mut cursor, &ParseContext::with_wire_len(1, 1514));

        assert_eq!(result.info(), Some(&ProtoInfo::new(14, 1500)));
    }

    #[test]
    fn test_parse_ethernet_too_short() {
        let short = [0xff; 10];
        let mut cursor = Cursor::new(&short);
        let result = EthernetProtocol.parse(&mut cursor, &ParseContext::new(1));

        assert_eq!(result.status(), ParseStatus::TooShort);
        assert!(result.record.is_none());
    }

    #[test]
    fn test_can_parse_only_at_root() {
        let mut ctx = ParseContext::new(1);
        assert_eq!(EthernetProtocol.can_parse(&ctx), Some(100));

        ctx.parent_protocol = Some("ipv4");
        assert!(EthernetProtocol.can_parse(&ctx).is_none());

        assert!(EthernetProtocol.can_parse(&ParseContext::new(101)).is_none());
    }
}
