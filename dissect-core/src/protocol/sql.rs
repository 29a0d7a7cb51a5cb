//! Record shared by database wire-protocol dissectors.

use bitflags::bitflags;
use compact_str::CompactString;

use super::record::{presence, push_some, FieldList, ProtoInfo, ProtoRecord};
use super::FieldValue;

/// Phase of the database conversation a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlMsgType {
    /// Connection establishment, negotiation and authentication.
    Startup,
    Query,
    Exit,
    Cancel,
}

impl SqlMsgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlMsgType::Startup => "startup",
            SqlMsgType::Query => "query",
            SqlMsgType::Exit => "exit",
            SqlMsgType::Cancel => "cancel",
        }
    }
}

/// Server verdict on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Complete,
    Error,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Complete => "complete",
            RequestStatus::Error => "error",
        }
    }
}

/// Client/server character encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlEncoding {
    Utf8,
    Latin1,
    Unknown,
}

impl SqlEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlEncoding::Utf8 => "utf8",
            SqlEncoding::Latin1 => "latin1",
            SqlEncoding::Unknown => "unknown",
        }
    }
}

bitflags! {
    /// Presence set for [`SqlInfo`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SqlFields: u32 {
        const MSG_TYPE = 1 << 0;
        const REQUEST_STATUS = 1 << 1;
        const VERSION = 1 << 2;
        const ENCODING = 1 << 3;
        const USER = 1 << 4;
        const DBNAME = 1 << 5;
        const PROGRAM = 1 << 6;
        const HOST = 1 << 7;
        const SQL = 1 << 8;
        const NB_ROWS = 1 << 9;
        const NB_FIELDS = 1 << 10;
        const ERROR_CODE = 1 << 11;
        const ERROR_MESSAGE = 1 << 12;
    }
}

/// One database protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlInfo {
    pub info: ProtoInfo,
    pub msg_type: Option<SqlMsgType>,
    pub request_status: Option<RequestStatus>,
    /// Protocol version announced during startup.
    pub version: Option<u16>,
    pub encoding: Option<SqlEncoding>,
    pub user: Option<CompactString>,
    pub dbname: Option<CompactString>,
    pub program: Option<CompactString>,
    pub host: Option<CompactString>,
    pub sql: Option<CompactString>,
    pub nb_rows: Option<u64>,
    pub nb_fields: Option<u64>,
    /// Server error identifier, e.g. `ORA-01403`.
    pub error_code: Option<CompactString>,
    pub error_message: Option<CompactString>,
}

impl SqlInfo {
    pub fn new(info: ProtoInfo) -> Self {
        Self {
            info,
            msg_type: None,
            request_status: None,
            version: None,
            encoding: None,
            user: None,
            dbname: None,
            program: None,
            host: None,
            sql: None,
            nb_rows: None,
            nb_fields: None,
            error_code: None,
            error_message: None,
        }
    }

    pub fn presence(&self) -> SqlFields {
        presence!(self, SqlFields {
            MSG_TYPE => msg_type,
            REQUEST_STATUS => request_status,
            VERSION => version,
            ENCODING => encoding,
            USER => user,
            DBNAME => dbname,
            PROGRAM => program,
            HOST => host,
            SQL => sql,
            NB_ROWS => nb_rows,
            NB_FIELDS => nb_fields,
            ERROR_CODE => error_code,
            ERROR_MESSAGE => error_message,
        })
    }

    pub fn has(&self, fields: SqlFields) -> bool {
        self.presence().contains(fields)
    }
}

impl ProtoRecord for SqlInfo {
    fn info(&self) -> &ProtoInfo {
        &self.info
    }

    fn presence_bits(&self) -> u32 {
        self.presence().bits()
    }

    fn fields(&self) -> FieldList<'_> {
        let mut out = FieldList::new();
        push_some!(out,
            "msg_type" => self.msg_type.map(|t| FieldValue::Str(t.as_str())),
            "request_status" => self.request_status.map(|s| FieldValue::Str(s.as_str())),
            "version" => self.version.map(FieldValue::UInt16),
            "encoding" => self.encoding.map(|e| FieldValue::Str(e.as_str())),
            "user" => self.user.as_deref().map(FieldValue::Str),
            "dbname" => self.dbname.as_deref().map(FieldValue::Str),
            "program" => self.program.as_deref().map(FieldValue::Str),
            "host" => self.host.as_deref().map(FieldValue::Str),
            "sql" => self.sql.as_deref().map(FieldValue::Str),
            "nb_rows" => self.nb_rows.map(FieldValue::UInt64),
            "nb_fields" => self.nb_fields.map(FieldValue::UInt64),
            "error_code" => self.error_code.as_deref().map(FieldValue::Str),
            "error_message" => self.error_message.as_deref().map(FieldValue::Str),
        );
        out
    }
}
