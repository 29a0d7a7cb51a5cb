//! Skinny (SCCP) VoIP signalling protocol parser.
//!
//! Every message is little-endian:
//!
//! ```text
//! +------------+----------------+------------+---------------------+
//! | length u32 | header ver u32 | msg id u32 | body (length - 4)   |
//! +------------+----------------+------------+---------------------+
//! |<-------- head_len = 8 ----->|<------ payload = length -------->|
//! ```
//!
//! CM7 headers (version 0x11 and 0x12) widen media addresses to an IP
//! version word followed by 16 address bytes.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bitflags::bitflags;
use compact_str::CompactString;

use super::context::Hints;
use super::record::{presence, push_some, FieldList, ProtoInfo, ProtoRecord};
use super::tcp::IP_PROTO_TCP;
use super::{FieldValue, ParseContext, ParseResult, Protocol};
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::schema::{DataKind, FieldDescriptor};

/// Default Skinny call manager port.
pub const SKINNY_PORT: u16 = 2000;

const HEADER_LEN: usize = 8;
const MSG_ID_LEN: usize = 4;

/// Header version values.
pub mod header_version {
    pub const BASIC: u32 = 0x00;
    pub const CM7_TYPE_B: u32 = 0x11;
    pub const CM7_TYPE_A: u32 = 0x12;
}

/// Message identifiers with a decoded body.
pub mod msg {
    pub const KEYPAD_BUTTON: u32 = 0x0003;
    pub const OFF_HOOK: u32 = 0x0006;
    pub const ON_HOOK: u32 = 0x0007;
    pub const OPEN_RECEIVE_CHANNEL_ACK: u32 = 0x0022;
    pub const SOFT_KEY_EVENT: u32 = 0x0026;
    pub const START_MEDIA_TRANSMISSION: u32 = 0x008a;
    pub const STOP_MEDIA_TRANSMISSION: u32 = 0x008b;
    pub const CALL_INFO: u32 = 0x008f;
    pub const CALL_STATE: u32 = 0x0111;
    pub const CALL_INFO_V2: u32 = 0x014a;
}

/// Name of a message with a decoded body.
pub fn message_name(msg_id: u32) -> Option<&'static str> {
    Some(match msg_id {
        msg::KEYPAD_BUTTON => "KeypadButton",
        msg::OFF_HOOK => "OffHook",
        msg::ON_HOOK => "OnHook",
        msg::OPEN_RECEIVE_CHANNEL_ACK => "OpenReceiveChannelAck",
        msg::SOFT_KEY_EVENT => "SoftKeyEvent",
        msg::START_MEDIA_TRANSMISSION => "StartMediaTransmission",
        msg::STOP_MEDIA_TRANSMISSION => "StopMediaTransmission",
        msg::CALL_INFO => "CallInfo",
        msg::CALL_STATE => "CallState",
        msg::CALL_INFO_V2 => "CallInfoV2",
        _ => return None,
    })
}

const PARTY_NAME_LEN: usize = 40;
const PARTY_NUMBER_LEN: usize = 24;
const MAX_PARTY_LEN: usize = 128;

bitflags! {
    /// Presence set for [`SkinnyInfo`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SkinnyFields: u32 {
        const NEW_KEY_PAD = 1 << 0;
        const LINE_INSTANCE = 1 << 1;
        const CALL_ID = 1 << 2;
        const CONF_ID = 1 << 3;
        const PASS_THRU_ID = 1 << 4;
        const CALL_STATE = 1 << 5;
        const MEDIA_IP = 1 << 6;
        const MEDIA_PORT = 1 << 7;
        const CALLING_PARTY = 1 << 8;
        const CALLED_PARTY = 1 << 9;
    }
}

/// One Skinny message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinnyInfo {
    pub info: ProtoInfo,
    pub header_version: u32,
    pub msg_id: u32,
    pub new_key_pad: Option<u32>,
    pub line_instance: Option<u32>,
    pub call_id: Option<u32>,
    pub conf_id: Option<u32>,
    pub pass_thru_id: Option<u32>,
    pub call_state: Option<u32>,
    pub media_ip: Option<IpAddr>,
    pub media_port: Option<u16>,
    pub calling_party: Option<CompactString>,
    pub called_party: Option<CompactString>,
}

impl SkinnyInfo {
    pub fn new(info: ProtoInfo, header_version: u32, msg_id: u32) -> Self {
        Self {
            info,
            header_version,
            msg_id,
            new_key_pad: None,
            line_instance: None,
            call_id: None,
            conf_id: None,
            pass_thru_id: None,
            call_state: None,
            media_ip: None,
            media_port: None,
            calling_party: None,
            called_party: None,
        }
    }

    pub fn presence(&self) -> SkinnyFields {
        presence!(self, SkinnyFields {
            NEW_KEY_PAD => new_key_pad,
            LINE_INSTANCE => line_instance,
            CALL_ID => call_id,
            CONF_ID => conf_id,
            PASS_THRU_ID => pass_thru_id,
            CALL_STATE => call_state,
            MEDIA_IP => media_ip,
            MEDIA_PORT => media_port,
            CALLING_PARTY => calling_party,
            CALLED_PARTY => called_party,
        })
    }

    pub fn has(&self, fields: SkinnyFields) -> bool {
        self.presence().contains(fields)
    }

    fn is_cm7(&self) -> bool {
        self.header_version != header_version::BASIC
    }
}

impl ProtoRecord for SkinnyInfo {
    fn info(&self) -> &ProtoInfo {
        &self.info
    }

    fn presence_bits(&self) -> u32 {
        self.presence().bits()
    }

    fn fields(&self) -> FieldList<'_> {
        let mut out = FieldList::new();
        out.push(("header_version", FieldValue::UInt32(self.header_version)));
        out.push(("msg_id", FieldValue::UInt32(self.msg_id)));
        push_some!(out,
            "new_key_pad" => self.new_key_pad.map(FieldValue::UInt32),
            "line_instance" => self.line_instance.map(FieldValue::UInt32),
            "call_id" => self.call_id.map(FieldValue::UInt32),
            "conf_id" => self.conf_id.map(FieldValue::UInt32),
            "pass_thru_id" => self.pass_thru_id.map(FieldValue::UInt32),
            "call_state" => self.call_state.map(FieldValue::UInt32),
            "media_ip" => self.media_ip.map(FieldValue::IpAddr),
            "media_port" => self.media_port.map(FieldValue::UInt16),
            "calling_party" => self.calling_party.as_deref().map(FieldValue::Str),
            "called_party" => self.called_party.as_deref().map(FieldValue::Str),
        );
        out
    }
}

/// Text up to the first NUL.
fn nul_trimmed(bytes: &[u8]) -> CompactString {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    CompactString::from(String::from_utf8_lossy(&bytes[..end]))
}

fn read_fixed_str(body: &mut Cursor<'_>, len: usize) -> DecodeResult<CompactString> {
    body.read_bytes(len).map(nul_trimmed)
}

fn read_cstr(body: &mut Cursor<'_>) -> DecodeResult<CompactString> {
    body.read_cstr(MAX_PARTY_LEN)
        .map(|s| CompactString::from(String::from_utf8_lossy(s)))
}

/// Media address: 4 bytes on basic headers, IP version word plus 16 bytes on CM7.
fn read_media_ip(body: &mut Cursor<'_>, cm7: bool) -> DecodeResult<IpAddr> {
    if !cm7 {
        let b = body.read_bytes(4)?;
        return Ok(Ipv4Addr::new(b[0], b[1], b[2], b[3]).into());
    }
    let version = body.read_u32_le()?;
    let b = body.read_bytes(16)?;
    match version {
        0 => Ok(Ipv4Addr::new(b[0], b[1], b[2], b[3]).into()),
        1 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(b);
            Ok(Ipv6Addr::from(octets).into())
        }
        other => Err(DecodeError::malformed("ip_version", format!("{other}"))),
    }
}

fn read_port(body: &mut Cursor<'_>) -> DecodeResult<u16> {
    let port = body.read_u32_le()?;
    u16::try_from(port).map_err(|_| DecodeError::malformed("port", format!("{port}")))
}

/// Trailing line instance and call reference, sent by some phones only.
fn read_line_and_call(body: &mut Cursor<'_>, info: &mut SkinnyInfo) -> DecodeResult<()> {
    if body.remaining() >= 8 {
        info.line_instance = Some(body.read_u32_le()?);
        info.call_id = Some(body.read_u32_le()?);
    }
    Ok(())
}

fn decode_body(body: &mut Cursor<'_>, info: &mut SkinnyInfo) -> DecodeResult<()> {
    let cm7 = info.is_cm7();
    match info.msg_id {
        msg::KEYPAD_BUTTON => {
            info.new_key_pad = Some(body.read_u32_le()?);
            read_line_and_call(body, info)?;
        }
        msg::SOFT_KEY_EVENT => {
            body.skip(4)?; // soft key event
            read_line_and_call(body, info)?;
        }
        msg::OFF_HOOK | msg::ON_HOOK => read_line_and_call(body, info)?,
        msg::OPEN_RECEIVE_CHANNEL_ACK => {
            body.skip(4)?; // status
            info.media_ip = Some(read_media_ip(body, cm7)?);
            info.media_port = Some(read_port(body)?);
            info.pass_thru_id = Some(body.read_u32_le()?);
        }
        msg::START_MEDIA_TRANSMISSION => {
            info.conf_id = Some(body.read_u32_le()?);
            info.pass_thru_id = Some(body.read_u32_le()?);
            info.media_ip = Some(read_media_ip(body, cm7)?);
            info.media_port = Some(read_port(body)?);
        }
        msg::STOP_MEDIA_TRANSMISSION => {
            info.conf_id = Some(body.read_u32_le()?);
            info.pass_thru_id = Some(body.read_u32_le()?);
        }
        msg::CALL_STATE => {
            info.call_state = Some(body.read_u32_le()?);
            read_line_and_call(body, info)?;
        }
        msg::CALL_INFO => {
            body.skip(PARTY_NAME_LEN)?;
            info.calling_party = Some(read_fixed_str(body, PARTY_NUMBER_LEN)?);
            body.skip(PARTY_NAME_LEN)?;
            info.called_party = Some(read_fixed_str(body, PARTY_NUMBER_LEN)?);
            read_line_and_call(body, info)?;
        }
        msg::CALL_INFO_V2 => {
            info.line_instance = Some(body.read_u32_le()?);
            info.call_id = Some(body.read_u32_le()?);
            // call type, redirect reasons, call instance, security status,
            // restriction bits
            body.skip(6 * 4)?;
            info.calling_party = Some(read_cstr(body)?);
            read_cstr(body)?; // alternate calling party
            info.called_party = Some(read_cstr(body)?);
        }
        _ => {}
    }
    Ok(())
}

/// Skinny protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct SkinnyProtocol;

impl SkinnyProtocol {
    fn decode(cursor: &mut Cursor<'_>) -> DecodeResult<(SkinnyInfo, Hints)> {
        cursor.ensure(HEADER_LEN + MSG_ID_LEN)?;
        let length = cursor.read_u32_le()?;
        let version = cursor.read_u32_le()?;
        let length = usize::try_from(length).unwrap_or(usize::MAX);
        if length < MSG_ID_LEN {
            return Err(DecodeError::malformed("length", format!("{length} below message id")));
        }

        let mut message = *cursor;
        let msg_id = message.read_u32_le()?;
        let body_len = length - MSG_ID_LEN;
        let mut body = message.take_truncated(body_len);
        if body.remaining() < body_len {
            return Err(DecodeError::too_short(body_len, body.remaining()));
        }

        let mut info = SkinnyInfo::new(ProtoInfo::new(HEADER_LEN, length), version, msg_id);
        match decode_body(&mut body, &mut info) {
            Ok(()) => Ok((info, Hints::new())),
            // The body is fully captured, so running out means a bad layout
            Err(DecodeError::TooShort { .. }) => {
                Err(DecodeError::malformed("body", "shorter than message layout"))
            }
            Err(e) => Err(e),
        }
    }
}

impl Protocol for SkinnyProtocol {
    fn name(&self) -> &'static str {
        "skinny"
    }

    fn display_name(&self) -> &'static str {
        "Skinny (SCCP)"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        if context.hint("transport") == Some(u64::from(IP_PROTO_TCP))
            && context.has_port(SKINNY_PORT)
        {
            Some(100)
        } else {
            None
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
            FieldDescriptor::new("skinny.header_version", DataKind::UInt32),
            FieldDescriptor::new("skinny.msg_id", DataKind::UInt32),
            FieldDescriptor::nullable("skinny.new_key_pad", DataKind::UInt32),
            FieldDescriptor::nullable("skinny.line_instance", DataKind::UInt32),
            FieldDescriptor::nullable("skinny.call_id", DataKind::UInt32),
            FieldDescriptor::nullable("skinny.conf_id", DataKind::UInt32),
            FieldDescriptor::nullable("skinny.pass_thru_id", DataKind::UInt32),
            FieldDescriptor::nullable("skinny.call_state", DataKind::UInt32),
            FieldDescriptor::nullable("skinny.media_ip", DataKind::IpAddr),
            FieldDescriptor::nullable("skinny.media_port", DataKind::UInt16),
            FieldDescriptor::nullable("skinny.calling_party", DataKind::String),
            FieldDescriptor::nullable("skinny.called_party", DataKind::String),
        ]
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["tcp"]
    }
}
