//! TNS (Oracle database) protocol parser.
//!
//! A TNS packet is one PDU: an 8-byte header followed by a type-specific
//! body. DATA packets carry TTC messages, which are walked one function at a
//! time until a status message or an unknown function code ends the packet.
//!
//! ```text
//! +--------+----------+------+----------+-----------+--------------------+
//! | length | checksum | type | reserved | header ck | body ...           |
//! | u16 BE | u16      | u8   | u8       | u16       | (length - 8 bytes) |
//! +--------+----------+------+----------+-----------+--------------------+
//! ```
//!
//! The whole PDU is reported as header: `head_len` is the declared packet
//! length and `payload` is always zero.

use compact_str::CompactString;
use tracing::debug;

use super::context::Hints;
use super::record::ProtoInfo;
use super::sql::{RequestStatus, SqlEncoding, SqlInfo, SqlMsgType};
use super::tcp::IP_PROTO_TCP;
use super::{ParseContext, ParseResult, Protocol};
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::schema::{DataKind, FieldDescriptor};

/// Default TNS listener port.
pub const TNS_PORT: u16 = 1521;

const HEADER_LEN: usize = 8;

/// Oracle error raised when a fetch runs past the last row.
const ORA_NO_DATA_FOUND: u64 = 1403;

/// Longest banner or version list accepted in a negotiation message.
const MAX_BANNER_LEN: usize = 256;

/// TNS packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Connect = 1,
    Accept = 2,
    Ack = 3,
    Refuse = 4,
    Redirect = 5,
    Data = 6,
    Null = 7,
    Abort = 9,
    Resend = 11,
    Marker = 12,
    Attention = 13,
    Control = 14,
}

impl PacketType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => PacketType::Connect,
            2 => PacketType::Accept,
            3 => PacketType::Ack,
            4 => PacketType::Refuse,
            5 => PacketType::Redirect,
            6 => PacketType::Data,
            7 => PacketType::Null,
            9 => PacketType::Abort,
            11 => PacketType::Resend,
            12 => PacketType::Marker,
            13 => PacketType::Attention,
            14 => PacketType::Control,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PacketType::Connect => "CONNECT",
            PacketType::Accept => "ACCEPT",
            PacketType::Ack => "ACK",
            PacketType::Refuse => "REFUSE",
            PacketType::Redirect => "REDIRECT",
            PacketType::Data => "DATA",
            PacketType::Null => "NULL",
            PacketType::Abort => "ABORT",
            PacketType::Resend => "RESEND",
            PacketType::Marker => "MARKER",
            PacketType::Attention => "ATTENTION",
            PacketType::Control => "CONTROL",
        }
    }
}

/// TTC function codes found at the start of a DATA body.
mod ttc {
    pub const PROTOCOL_NEGOTIATION: u8 = 0x01;
    pub const DATATYPE_NEGOTIATION: u8 = 0x02;
    pub const FUNCTION_CALL: u8 = 0x03;
    pub const STATUS: u8 = 0x04;
    pub const ROW_HEADER: u8 = 0x06;
    pub const ROW_DATA: u8 = 0x07;
    pub const RETURN_PARAMETERS: u8 = 0x08;
    pub const DESCRIBE_INFO: u8 = 0x10;
    pub const PIGGYBACK: u8 = 0x11;
}

/// Function numbers carried by a TTC function call.
mod function {
    pub const LOGOFF: u8 = 0x09;
    pub const ALL8: u8 = 0x5e;
    pub const AUTH_PHASE_ONE: u8 = 0x76;
    pub const AUTH_PHASE_TWO: u8 = 0x73;
}

/// DATA flag set on the last packet of a session.
const DATA_FLAG_EOF: u16 = 0x0040;

/// Read an Oracle length-prefixed unsigned number: one width octet followed
/// by that many big-endian digits.
fn read_number(cursor: &mut Cursor<'_>) -> DecodeResult<u64> {
    let width = usize::from(cursor.read_u8()?);
    if width > 8 {
        return Err(DecodeError::malformed("number", format!("{width} octets")));
    }
    cursor.read_fixed_int_n(width)
}

/// Skip a chunked value: a size number, then one length-prefixed chunk when
/// the size is non-zero.
fn skip_chunk(cursor: &mut Cursor<'_>) -> DecodeResult<()> {
    if read_number(cursor)? > 0 {
        let len = usize::from(cursor.read_u8()?);
        cursor.skip(len)?;
    }
    Ok(())
}

fn skip_numbers(cursor: &mut Cursor<'_>, count: usize) -> DecodeResult<()> {
    for _ in 0..count {
        read_number(cursor)?;
    }
    Ok(())
}

/// Fixed parts of a CONNECT body run out before the PDU does only if the
/// packet lies about its own layout.
fn within_pdu<T>(result: DecodeResult<T>, field: &'static str) -> DecodeResult<T> {
    result.map_err(|e| match e {
        DecodeError::TooShort { .. } => DecodeError::malformed(field, "runs past end of packet"),
        other => other,
    })
}

fn lossy(bytes: &[u8]) -> CompactString {
    CompactString::from(String::from_utf8_lossy(bytes))
}

/// Value of `(KEY=value)` in a connect descriptor, compared case-insensitively.
fn descriptor_value<'d>(descriptor: &'d [u8], key: &str) -> Option<&'d [u8]> {
    let needle = format!("({key}=");
    let needle = needle.as_bytes();
    let start = descriptor
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))?
        + needle.len();
    let value = &descriptor[start..];
    let end = value.iter().position(|&b| b == b')').unwrap_or(value.len());
    Some(&value[..end])
}

fn encoding_from_charset(charset: u16) -> SqlEncoding {
    match charset {
        873 | 871 => SqlEncoding::Utf8,
        1 | 31 => SqlEncoding::Latin1,
        _ => SqlEncoding::Unknown,
    }
}

fn is_text(b: u8) -> bool {
    b.is_ascii_graphic() || matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// First run of `len` consecutive text bytes.
fn find_text_run(data: &[u8], len: usize) -> Option<&[u8]> {
    if len == 0 {
        return None;
    }
    let mut run = 0;
    for (i, &b) in data.iter().enumerate() {
        run = if is_text(b) { run + 1 } else { 0 };
        if run == len {
            return Some(&data[i + 1 - len..=i]);
        }
    }
    None
}

/// Locate the length-prefixed `ORA-` message in a status body.
fn find_error_text(data: &[u8]) -> Option<&[u8]> {
    let at = data.windows(4).skip(1).position(|w| w == b"ORA-")? + 1;
    let len = usize::from(data[at - 1]);
    let text = &data[at..];
    Some(&text[..len.min(text.len())])
}

/// Mutable state while walking the TTC functions of one DATA packet.
struct TtcWalk<'i> {
    info: &'i mut SqlInfo,
    /// Column count announced earlier in the same packet.
    columns: Option<u64>,
}

/// Outcome of one TTC function.
enum Step {
    Continue,
    Done,
}

impl TtcWalk<'_> {
    fn run(&mut self, cursor: &mut Cursor<'_>) -> DecodeResult<()> {
        while !cursor.is_empty() {
            let code = cursor.read_u8()?;
            let step = match code {
                ttc::PROTOCOL_NEGOTIATION => self.negotiation(cursor)?,
                ttc::DATATYPE_NEGOTIATION => {
                    self.info.msg_type = Some(SqlMsgType::Startup);
                    Step::Done
                }
                ttc::FUNCTION_CALL => self.function_call(cursor)?,
                ttc::PIGGYBACK => self.piggyback(cursor),
                ttc::STATUS => self.status(cursor)?,
                ttc::ROW_HEADER => self.row_header(cursor)?,
                ttc::ROW_DATA => self.row_data(cursor)?,
                ttc::RETURN_PARAMETERS => self.return_parameters(cursor)?,
                ttc::DESCRIBE_INFO => self.describe_info(cursor)?,
                other => {
                    debug!("Unhandled TTC function {other:#04x}");
                    Step::Done
                }
            };
            if let Step::Done = step {
                break;
            }
        }
        Ok(())
    }

    fn query(&mut self) {
        self.info.msg_type.get_or_insert(SqlMsgType::Query);
    }

    /// Client lists every version it speaks; the server answers with one,
    /// followed by its banner and character set.
    fn negotiation(&mut self, cursor: &mut Cursor<'_>) -> DecodeResult<Step> {
        self.info.msg_type = Some(SqlMsgType::Startup);
        let versions = cursor.read_cstr(MAX_BANNER_LEN)?;
        if versions.len() == 1 {
            cursor.read_cstr(MAX_BANNER_LEN)?;
            let charset = cursor.read_u16_le()?;
            self.info.encoding = Some(encoding_from_charset(charset));
        }
        Ok(Step::Done)
    }

    fn function_call(&mut self, cursor: &mut Cursor<'_>) -> DecodeResult<Step> {
        match cursor.read_u8()? {
            function::ALL8 => {
                self.info.msg_type = Some(SqlMsgType::Query);
                cursor.skip(1)?; // sequence
                read_number(cursor)?; // options
                read_number(cursor)?; // cursor id
                cursor.skip(1)?; // statement pointer
                let sql_len = read_number(cursor)?;
                let sql_len = usize::try_from(sql_len).unwrap_or(usize::MAX);
                if let Some(sql) = find_text_run(cursor.rest(), sql_len) {
                    self.info.sql = Some(lossy(sql));
                }
            }
            function::LOGOFF => self.info.msg_type = Some(SqlMsgType::Exit),
            function::AUTH_PHASE_ONE | function::AUTH_PHASE_TWO => {
                self.info.msg_type = Some(SqlMsgType::Startup)
            }
            _ => self.query(),
        }
        Ok(Step::Done)
    }

    /// Piggybacked calls have no self-describing length; resume at the
    /// statement call that usually follows them.
    fn piggyback(&mut self, cursor: &mut Cursor<'_>) -> Step {
        let rest = cursor.rest();
        match rest
            .windows(2)
            .position(|w| w == [ttc::FUNCTION_CALL, function::ALL8])
        {
            Some(at) => match cursor.skip(at) {
                Ok(()) => Step::Continue,
                Err(_) => Step::Done,
            },
            None => {
                self.query();
                Step::Done
            }
        }
    }

    fn status(&mut self, cursor: &mut Cursor<'_>) -> DecodeResult<Step> {
        self.query();
        read_number(cursor)?;
        self.info.nb_rows = Some(read_number(cursor)?);
        let code = read_number(cursor)?;
        if code != 0 {
            self.info.request_status = Some(if code == ORA_NO_DATA_FOUND {
                RequestStatus::Complete
            } else {
                RequestStatus::Error
            });
            let error_code = format!("ORA-{code:05}");
            if let Some(text) = find_error_text(cursor.rest()) {
                let message = text.strip_prefix(error_code.as_bytes()).unwrap_or(text);
                let message = message
                    .strip_prefix(b": ")
                    .or_else(|| message.strip_prefix(b":"))
                    .unwrap_or(message);
                self.info.error_message = Some(lossy(message));
            }
            self.info.error_code = Some(CompactString::from(error_code));
        }
        Ok(Step::Done)
    }

    fn row_header(&mut self, cursor: &mut Cursor<'_>) -> DecodeResult<Step> {
        self.query();
        cursor.skip(1)?; // flags
        self.columns = Some(read_number(cursor)?);
        skip_numbers(cursor, 5)?;
        Ok(Step::Continue)
    }

    fn row_data(&mut self, cursor: &mut Cursor<'_>) -> DecodeResult<Step> {
        self.query();
        let Some(columns) = self.columns else {
            debug!("Row data without a column count");
            return Ok(Step::Done);
        };
        for _ in 0..columns {
            let len = usize::from(cursor.read_u8()?);
            cursor.skip(len)?;
        }
        Ok(Step::Continue)
    }

    fn return_parameters(&mut self, cursor: &mut Cursor<'_>) -> DecodeResult<Step> {
        let count = read_number(cursor)?;
        for _ in 0..count {
            read_number(cursor)?;
        }
        read_number(cursor)?;
        let entries = read_number(cursor)?;
        for _ in 0..entries {
            skip_chunk(cursor)?; // key
            skip_chunk(cursor)?; // value
            read_number(cursor)?; // flags
        }
        Ok(Step::Continue)
    }

    fn describe_info(&mut self, cursor: &mut Cursor<'_>) -> DecodeResult<Step> {
        self.query();
        let skip = usize::from(cursor.read_u8()?);
        cursor.skip(skip)?;
        read_number(cursor)?;
        let columns = read_number(cursor)?;
        self.info.nb_fields = Some(columns);
        self.columns = Some(columns);
        cursor.skip(1)?;
        for _ in 0..columns {
            skip_column_description(cursor)?;
        }
        skip_chunk(cursor)?;
        skip_numbers(cursor, 2)?;
        Ok(Step::Continue)
    }
}

/// Skip one column descriptor of a describe message.
fn skip_column_description(cursor: &mut Cursor<'_>) -> DecodeResult<()> {
    cursor.skip(3)?; // type, flags, precision
    skip_numbers(cursor, 4)?;
    skip_chunk(cursor)?;
    skip_numbers(cursor, 2)?;
    cursor.skip(1)?;
    read_number(cursor)?;
    cursor.skip(2)?;
    skip_chunk(cursor)?; // column name
    skip_chunk(cursor)?; // schema
    skip_chunk(cursor)?; // type name
    read_number(cursor)?;
    Ok(())
}

/// TNS protocol parser.
#[derive(Debug, Clone, Copy)]
pub struct TnsProtocol;

impl TnsProtocol {
    fn decode(cursor: &mut Cursor<'_>) -> DecodeResult<(SqlInfo, Hints)> {
        let fixed = cursor.peek_bytes(HEADER_LEN)?;
        let length = usize::from(u16::from_be_bytes([fixed[0], fixed[1]]));
        if length < HEADER_LEN {
            return Err(DecodeError::malformed("length", format!("{length} below header")));
        }
        let packet = cursor.read_bytes(length)?;
        let mut pdu = Cursor::new(packet);
        pdu.skip(4)?;
        let packet_type = pdu.read_u8()?;
        pdu.skip(3)?;

        let mut info = SqlInfo::new(ProtoInfo::new(length, 0));
        match PacketType::from_u8(packet_type) {
            Some(PacketType::Connect) => Self::connect(packet, &mut pdu, &mut info)?,
            Some(PacketType::Accept) => {
                info.msg_type = Some(SqlMsgType::Startup);
                info.version = Some(within_pdu(pdu.read_u16(), "version")?);
            }
            Some(PacketType::Refuse) => Self::refuse(&mut pdu, &mut info)?,
            Some(PacketType::Redirect | PacketType::Resend) => {
                info.msg_type = Some(SqlMsgType::Startup);
            }
            Some(PacketType::Marker) => info.msg_type = Some(SqlMsgType::Cancel),
            Some(PacketType::Data) => Self::data(&mut pdu, &mut info)?,
            Some(other) => debug!("TNS {} packet carries no SQL fields", other.as_str()),
            None => {
                return Err(DecodeError::malformed("type", format!("unknown packet type {packet_type}")))
            }
        }
        Ok((info, Hints::new()))
    }

    fn connect(packet: &[u8], pdu: &mut Cursor<'_>, info: &mut SqlInfo) -> DecodeResult<()> {
        info.msg_type = Some(SqlMsgType::Startup);
        info.version = Some(within_pdu(pdu.read_u16(), "version")?);
        // compatible version, service options, SDU, TDU, NT characteristics,
        // line turnaround and value of one
        within_pdu(pdu.skip(14), "connect header")?;
        let data_len = usize::from(within_pdu(pdu.read_u16(), "connect data length")?);
        let data_offset = usize::from(within_pdu(pdu.read_u16(), "connect data offset")?);
        if data_len == 0 {
            return Ok(());
        }

        // The offset counts from the start of the packet
        let mut whole = Cursor::new(packet);
        within_pdu(whole.skip(data_offset), "connect data offset")?;
        let descriptor = within_pdu(whole.read_bytes(data_len), "connect data")?;

        info.user = descriptor_value(descriptor, "USER").map(lossy);
        info.program = descriptor_value(descriptor, "PROGRAM").map(lossy);
        info.host = descriptor_value(descriptor, "HOST").map(lossy);
        info.dbname = descriptor_value(descriptor, "SERVICE_NAME")
            .or_else(|| descriptor_value(descriptor, "SID"))
            .map(lossy);
        Ok(())
    }

    fn refuse(pdu: &mut Cursor<'_>, info: &mut SqlInfo) -> DecodeResult<()> {
        info.msg_type = Some(SqlMsgType::Startup);
        info.request_status = Some(RequestStatus::Error);
        within_pdu(pdu.skip(2), "refuse reasons")?;
        let data_len = usize::from(within_pdu(pdu.read_u16(), "refuse data length")?);
        let data = within_pdu(pdu.read_bytes(data_len), "refuse data")?;
        if !data.is_empty() {
            info.error_message = Some(lossy(data));
        }
        let code = descriptor_value(data, "ERR")
            .and_then(|v| std::str::from_utf8(v).ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(code) = code {
            info.error_code = Some(CompactString::from(format!("ORA-{code:05}")));
        }
        Ok(())
    }

    fn data(pdu: &mut Cursor<'_>, info: &mut SqlInfo) -> DecodeResult<()> {
        let flags = within_pdu(pdu.read_u16(), "data flags")?;
        if flags & DATA_FLAG_EOF != 0 {
            info.msg_type = Some(SqlMsgType::Exit);
            return Ok(());
        }
        // The TTC layer is walked best-effort; what was decoded before an
        // inconsistency is kept.
        let mut walk = TtcWalk {
            info,
            columns: None,
        };
        if let Err(e) = walk.run(pdu) {
            debug!("TTC walk stopped early: {e}");
        }
        Ok(())
    }
}

impl Protocol for TnsProtocol {
    fn name(&self) -> &'static str {
        "tns"
    }

    fn display_name(&self) -> &'static str {
        "Oracle TNS"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        if context.hint("transport") == Some(u64::from(IP_PROTO_TCP)) && context.has_port(TNS_PORT)
        {
            Some(100)
        } else {
            None
        }
    }

    fn parse<'a>(&self, cursor: &mut Cursor<'a>, _context: &ParseContext) -> ParseResult<'a> {
        let outcome = Self::decode(cursor);
        ParseResult::from_decode(self.name(), outcome, cursor)
    }

    fn schema_fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::nullable("tns.msg_type", DataKind::String),
            FieldDescriptor::nullable("tns.request_status", DataKind::String),
            FieldDescriptor::nullable("tns.version", DataKind::UInt16),
            FieldDescriptor::nullable("tns.encoding", DataKind::String),
            FieldDescriptor::nullable("tns.user", DataKind::String),
            FieldDescriptor::nullable("tns.dbname", DataKind::String),
            FieldDescriptor::nullable("tns.program", DataKind::String),
            FieldDescriptor::nullable("tns.host", DataKind::String),
            FieldDescriptor::nullable("tns.sql", DataKind::String),
            FieldDescriptor::nullable("tns.nb_rows", DataKind::UInt64),
            FieldDescriptor::nullable("tns.nb_fields", DataKind::UInt64),
            FieldDescriptor::nullable("tns.error_code", DataKind::String)
                .with_description("Oracle error identifier, e.g. ORA-01403"),
            FieldDescriptor::nullable("tns.error_message", DataKind::String),
        ]
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["tcp"]
    }
}
