//! Result records produced by dissectors.
//!
//! Every record starts with a [`ProtoInfo`] header and then carries its
//! protocol-specific fields. Optional fields are stored as `Option`s and the
//! presence set is computed from them, so a bit is set exactly when the
//! field holds a value.
//!
//! ```text
//! +-----------+---------------------------------------------+
//! | ProtoInfo | head_len: bytes of this layer's header      |
//! |           | payload:  declared bytes left for the next  |
//! +-----------+---------------------------------------------+
//! | fields    | Option<T> ...      -> presence bitflags     |
//! +-----------+---------------------------------------------+
//! ```

use smallvec::SmallVec;

use super::ethernet::EthernetInfo;
use super::ipv4::Ipv4Info;
use super::ipv6::Ipv6Info;
use super::skinny::SkinnyInfo;
use super::sql::SqlInfo;
use super::tcp::TcpInfo;
use super::udp::UdpInfo;
use super::FieldValue;

/// Field entry: (field_name, value).
pub type FieldEntry<'r> = (&'static str, FieldValue<'r>);

/// Fields of one record, in declaration order. Most records have fewer than 16.
pub type FieldList<'r> = SmallVec<[FieldEntry<'r>; 16]>;

/// Header shared by every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtoInfo {
    /// Bytes consumed by this layer.
    pub head_len: usize,
    /// Bytes the header declares for the remainder, captured or not.
    pub payload: usize,
}

impl ProtoInfo {
    pub fn new(head_len: usize, payload: usize) -> Self {
        Self { head_len, payload }
    }
}

/// Common view over every record type.
pub trait ProtoRecord {
    fn info(&self) -> &ProtoInfo;

    /// Raw presence set; zero for records without optional fields.
    fn presence_bits(&self) -> u32 {
        0
    }

    /// Present fields as name/value pairs. Absent optional fields are omitted.
    fn fields(&self) -> FieldList<'_>;
}

/// Build a presence set from `Option` fields.
///
/// ```ignore
/// presence!(self, SqlFields { SQL => sql, NB_ROWS => nb_rows })
/// ```
macro_rules! presence {
    ($rec:expr, $flags:ident { $($flag:ident => $field:ident),* $(,)? }) => {{
        let mut set = $flags::empty();
        $( set.set($flags::$flag, $rec.$field.is_some()); )*
        set
    }};
}
pub(crate) use presence;

/// Push `(name, value)` for each `Some` field.
macro_rules! push_some {
    ($out:ident, $($name:literal => $value:expr),* $(,)?) => {
        $( if let Some(v) = $value { $out.push(($name, v)); } )*
    };
}
pub(crate) use push_some;

/// A record from any built-in dissector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Ethernet(EthernetInfo),
    Ipv4(Ipv4Info),
    Ipv6(Ipv6Info),
    Tcp(TcpInfo),
    Udp(UdpInfo),
    Tns(SqlInfo),
    Skinny(SkinnyInfo),
}

macro_rules! delegate_record {
    ($self:expr, $method:ident) => {
        match $self {
            Record::Ethernet(r) => r.$method(),
            Record::Ipv4(r) => r.$method(),
            Record::Ipv6(r) => r.$method(),
            Record::Tcp(r) => r.$method(),
            Record::Udp(r) => r.$method(),
            Record::Tns(r) => r.$method(),
            Record::Skinny(r) => r.$method(),
        }
    };
}

impl Record {
    pub fn as_sql(&self) -> Option<&SqlInfo> {
        match self {
            Record::Tns(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_skinny(&self) -> Option<&SkinnyInfo> {
        match self {
            Record::Skinny(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_tcp(&self) -> Option<&TcpInfo> {
        match self {
            Record::Tcp(r) => Some(r),
            _ => None,
        }
    }
}

impl ProtoRecord for Record {
    fn info(&self) -> &ProtoInfo {
        delegate_record!(self, info)
    }

    fn presence_bits(&self) -> u32 {
        delegate_record!(self, presence_bits)
    }

    fn fields(&self) -> FieldList<'_> {
        delegate_record!(self, fields)
    }
}

macro_rules! impl_from_record {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Record {
                fn from(r: $ty) -> Self {
                    Record::$variant(r)
                }
            }
        )*
    };
}

impl_from_record!(
    Ethernet(EthernetInfo),
    Ipv4(Ipv4Info),
    Ipv6(Ipv6Info),
    Tcp(TcpInfo),
    Udp(UdpInfo),
    Tns(SqlInfo),
    Skinny(SkinnyInfo),
);
