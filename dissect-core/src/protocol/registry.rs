//! Protocol registry for managing parsers.

use crate::cursor::Cursor;
use crate::schema::FieldDescriptor;

use super::{
    EthernetProtocol, Ipv4Protocol, Ipv6Protocol, ParseContext, ParseResult, SkinnyProtocol,
    TcpProtocol, TnsProtocol, UdpProtocol,
};

/// Core trait all protocol parsers must implement.
pub trait Protocol: Send + Sync {
    /// Unique identifier for this protocol (e.g., "tcp", "tns").
    fn name(&self) -> &'static str;

    /// Human-readable display name.
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Check if this parser can handle the given context.
    /// Returns a priority score (higher = more specific match).
    /// Returns `None` if this parser cannot handle the context.
    fn can_parse(&self, context: &ParseContext) -> Option<u32>;

    /// Decode one layer starting at the cursor.
    ///
    /// On success the cursor is left on the first byte of the next layer.
    fn parse<'a>(&self, cursor: &mut Cursor<'a>, context: &ParseContext) -> ParseResult<'a>;

    /// Return the schema fields this protocol produces.
    fn schema_fields(&self) -> Vec<FieldDescriptor>;

    /// Protocols that might follow this one.
    fn child_protocols(&self) -> &[&'static str] {
        &[]
    }

    /// Protocols that can appear directly before this one.
    fn dependencies(&self) -> &'static [&'static str] {
        &[] // Default: no dependencies (link layer protocols)
    }
}

/// Enum of all built-in protocol parsers.
///
/// This enables static dispatch (no vtable overhead) for all built-in protocols.
#[derive(Debug, Clone, Copy)]
pub enum BuiltinProtocol {
    Ethernet(EthernetProtocol),
    Ipv4(Ipv4Protocol),
    Ipv6(Ipv6Protocol),
    Tcp(TcpProtocol),
    Udp(UdpProtocol),
    Tns(TnsProtocol),
    Skinny(SkinnyProtocol),
}

/// Macro to delegate Protocol trait methods to inner types.
macro_rules! delegate_protocol {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            BuiltinProtocol::Ethernet(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv4(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv6(p) => p.$method($($arg),*),
            BuiltinProtocol::Tcp(p) => p.$method($($arg),*),
            BuiltinProtocol::Udp(p) => p.$method($($arg),*),
            BuiltinProtocol::Tns(p) => p.$method($($arg),*),
            BuiltinProtocol::Skinny(p) => p.$method($($arg),*),
        }
    };
}

impl Protocol for BuiltinProtocol {
    #[inline]
    fn name(&self) -> &'static str {
        delegate_protocol!(self, name)
    }

    #[inline]
    fn display_name(&self) -> &'static str {
        delegate_protocol!(self, display_name)
    }

    #[inline]
    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        delegate_protocol!(self, can_parse, context)
    }

    #[inline]
    fn parse<'a>(&self, cursor: &mut Cursor<'a>, context: &ParseContext) -> ParseResult<'a> {
        delegate_protocol!(self, parse, cursor, context)
    }

    #[inline]
    fn schema_fields(&self) -> Vec<FieldDescriptor> {
        delegate_protocol!(self, schema_fields)
    }

    #[inline]
    fn child_protocols(&self) -> &[&'static str] {
        delegate_protocol!(self, child_protocols)
    }

    #[inline]
    fn dependencies(&self) -> &'static [&'static str] {
        delegate_protocol!(self, dependencies)
    }
}

macro_rules! impl_from_protocol {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for BuiltinProtocol {
                fn from(p: $ty) -> Self {
                    BuiltinProtocol::$variant(p)
                }
            }
        )*
    };
}

impl_from_protocol!(
    Ethernet(EthernetProtocol),
    Ipv4(Ipv4Protocol),
    Ipv6(Ipv6Protocol),
    Tcp(TcpProtocol),
    Udp(UdpProtocol),
    Tns(TnsProtocol),
    Skinny(SkinnyProtocol),
);

/// Registry for protocol parsers with priority-based selection.
///
/// Built once and passed by reference; parsers are owned values.
#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
    parsers: Vec<BuiltinProtocol>,
}

impl ProtocolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Register a protocol parser.
    pub fn register<P: Into<BuiltinProtocol>>(&mut self, parser: P) {
        self.parsers.push(parser.into());
    }

    /// Find the best parser for the given context.
    #[inline]
    pub fn find_parser(&self, context: &ParseContext) -> Option<&BuiltinProtocol> {
        self.parsers
            .iter()
            .filter_map(|p| p.can_parse(context).map(|priority| (p, priority)))
            .max_by_key(|(_, priority)| *priority)
            .map(|(parser, _)| parser)
    }

    /// Get all registered parsers.
    pub fn all_parsers(&self) -> impl Iterator<Item = &BuiltinProtocol> {
        self.parsers.iter()
    }

    /// Get a parser by name.
    pub fn get_parser(&self, name: &str) -> Option<&BuiltinProtocol> {
        self.parsers.iter().find(|p| p.name() == name)
    }

    /// Build combined schema from all parsers.
    pub fn combined_schema(&self) -> Vec<FieldDescriptor> {
        self.parsers.iter().flat_map(|p| p.schema_fields()).collect()
    }

    /// Get the number of registered parsers.
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_protocol_size() {
        // All protocols are zero-sized unit structs, so the enum is just the discriminant
        let size = std::mem::size_of::<BuiltinProtocol>();
        assert!(size <= 8, "BuiltinProtocol is {} bytes, expected <= 8", size);
    }

    #[test]
    fn test_registry_static_dispatch() {
        let mut registry = ProtocolRegistry::new();
        registry.register(EthernetProtocol);
        registry.register(Ipv4Protocol);
        registry.register(TcpProtocol);

        assert_eq!(registry.len(), 3);

        let ctx = ParseContext::new(1); // Ethernet link type
        let parser = registry.find_parser(&ctx);
        assert_eq!(parser.map(|p| p.name()), Some("ethernet"));
    }

    #[test]
    fn test_highest_priority_wins() {
        let mut registry = ProtocolRegistry::new();
        registry.register(TnsProtocol);
        registry.register(SkinnyProtocol);

        let mut ctx = ParseContext::new(1);
        ctx.insert_hint("transport", 6);
        ctx.insert_hint("src_port", 40000);
        ctx.insert_hint("dst_port", 2000);
        assert_eq!(registry.find_parser(&ctx).map(|p| p.name()), Some("skinny"));

        ctx.set_hint("dst_port", 1521);
        assert_eq!(registry.find_parser(&ctx).map(|p| p.name()), Some("tns"));

        ctx.set_hint("dst_port", 80);
        assert!(registry.find_parser(&ctx).is_none());
    }

    #[test]
    fn test_get_parser_by_name() {
        let mut registry = ProtocolRegistry::new();
        registry.register(TcpProtocol);
        registry.register(UdpProtocol);

        assert!(registry.get_parser("tcp").is_some());
        assert!(registry.get_parser("udp").is_some());
        assert!(registry.get_parser("unknown").is_none());
        assert!(!registry.combined_schema().is_empty());
    }
}
