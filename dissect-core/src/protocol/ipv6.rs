//! IPv6 protocol parser with extension header support.

use std::net::Ipv6Addr;

use etherparse::Ipv6HeaderSlice;

use super::context::Hints;
use super::ethernet::ethertype;
use super::record::{FieldList, ProtoInfo, ProtoRecord};
use super::{FieldValue, ParseContext, ParseResult, Protocol};
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::schema::{DataKind, FieldDescriptor};

const FIXED_HEADER_LEN: usize = 40;

/// Upper bound on chained extension headers.
const MAX_EXTENSIONS: usize = 8;

/// IPv6 Next Header values for extension headers.
pub mod next_header {
    pub const HOP_BY_HOP: u8 = 0;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const ROUTING: u8 = 43;
    pub const FRAGMENT: u8 = 44;
    pub const AH: u8 = 51;
    pub const DESTINATION: u8 = 60;
}

/// Decoded IPv6 header and extension chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Info {
    pub info: ProtoInfo,
    pub src_ip: Ipv6Addr,
    pub dst_ip: Ipv6Addr,
    pub payload_length: u16,
    pub flow_label: u32,
    pub hop_limit: u8,
    /// Next header after the last extension header.
    pub next_header: u8,
}

impl ProtoRecord for Ipv6Info {
    fn info(&self) -> &ProtoInfo {
        &self.info
    }

    fn fields(&self) -> FieldList<'_> {
        let mut out = FieldList::new();
        out.push(("src_ip", FieldValue::IpAddr(self.src_ip.into())));
        out.push(("dst_ip", FieldValue::IpAddr(self.dst_ip.into())));
        out.push(("payload_length", FieldValue::UInt16(self.payload_length)));
        out.push(("flow_label", FieldValue::UInt32(self.flow_label)));
        out.push(("hop_limit", FieldValue::UInt8(self.hop_limit)));
        out.push(("next_header", FieldValue::UInt8(self.next_header)));
        out
    }
}

fn is_extension_header(nh: u8) -> bool {
    matches!(
        nh,
        next_header::HOP_BY_HOP
            | next_header::ROUTING
            | next_header::FRAGMENT
            | next_header::DESTINATION
            | next_header::AH
    )
}

/// Skip one extension header, returning the next header value.
fn skip_extension(cursor: &mut Cursor<'_>, nh: u8) -> DecodeResult<u8> {
    let next = cursor.read_u8()?;
    let len_field = usize::from(cursor.read_u8()?);
    let total = match nh {
        next_header::FRAGMENT => 8,
        // AH length is in 4-octet units minus 2
        next_header::AH => (len_field + 2) * 4,
        _ => (len_field + 1) * 8,
    };
    cursor.skip(total - 2)?;
    Ok(next)
}

/// IPv6 protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Protocol;

impl Ipv6Protocol {
    fn decode(cursor: &mut Cursor<'_>) -> DecodeResult<(Ipv6Info, Hints)> {
        let header = cursor.read_bytes(FIXED_HEADER_LEN)?;
        let ipv6 = Ipv6HeaderSlice::from_slice(header)
            .map_err(|e| DecodeError::malformed("header", e.to_string()))?;
        let payload_length = ipv6.payload_length();

        let start = cursor.position();
        let mut nh = ipv6.next_header().0;
        let mut chained = 0;
        while is_extension_header(nh) {
            chained += 1;
            if chained > MAX_EXTENSIONS {
                return Err(DecodeError::malformed("next_header", "extension chain too long"));
            }
            nh = skip_extension(cursor, nh)?;
        }
        let ext_len = cursor.position() - start;
        let payload = usize::from(payload_length)
            .checked_sub(ext_len)
            .ok_or_else(|| {
                DecodeError::malformed("payload_length", "shorter than extension headers")
            })?;

        let record = Ipv6Info {
            info: ProtoInfo::new(FIXED_HEADER_LEN + ext_len, payload),
            src_ip: ipv6.source_addr(),
            dst_ip: ipv6.destination_addr(),
            payload_length,
            flow_label: ipv6.flow_label().value(),
            hop_limit: ipv6.hop_limit(),
            next_header: nh,
        };

        let mut child_hints = Hints::new();
        child_hints.push(("ip_protocol", u64::from(nh)));
        child_hints.push(("ip_version", 6));
        Ok((record, child_hints))
    }
}

impl Protocol for Ipv6Protocol {
    fn name(&self) -> &'static str {
        "ipv6"
    }

    fn display_name(&self) -> &'static str {
        "IPv6"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        match context.hint("ethertype") {
            Some(et) if et == u64::from(ethertype::IPV6) => Some(100),
            _ => None,
        }
    }

    fn parse<'a>(&self, cursor: &mut Cursor<'a>, _context: &ParseContext) -> ParseResult<'a> {
        match Self::decode(cursor) {
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
            FieldDescriptor::new("ipv6.src_ip", DataKind::IpAddr).set_nullable(true),
            FieldDescriptor::new("ipv6.dst_ip", DataKind::IpAddr).set_nullable(true),
            FieldDescriptor::new("ipv6.payload_length", DataKind::UInt16).set_nullable(true),
            FieldDescriptor::new("ipv6.flow_label", DataKind::UInt32).set_nullable(true),
            FieldDescriptor::new("ipv6.hop_limit", DataKind::UInt8).set_nullable(true),
            FieldDescriptor::new("ipv6.next_header", DataKind::UInt8).set_nullable(true),
        ]
    }

    fn child_protocols(&self) -> &[&'static str] {
        &["tcp", "udp"]
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["ethernet"]
    }
}
