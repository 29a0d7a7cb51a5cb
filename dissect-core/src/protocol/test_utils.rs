//! Test utilities for protocol parsing.
//!
//! Provides builders for constructing test packets, a synthetic TCP
//! conversation generator, and helpers for validating parse results.

use super::tcp::TcpFlags;
use super::{Capture, FieldValue, ParseContext, ParseResult};

/// Builder for constructing Ethernet frames.
#[derive(Debug, Clone)]
pub struct EthernetBuilder {
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    ethertype: u16,
    payload: Vec<u8>,
}

impl Default for EthernetBuilder {
    fn default() -> Self {
        Self {
            src_mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            dst_mac: [0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            ethertype: 0x0800, // IPv4
            payload: Vec::new(),
        }
    }
}

impl EthernetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_mac(mut self, mac: [u8; 6]) -> Self {
        self.src_mac = mac;
        self
    }

    pub fn dst_mac(mut self, mac: [u8; 6]) -> Self {
        self.dst_mac = mac;
        self
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.ethertype = ethertype;
        self
    }

    pub fn ipv4(self) -> Self {
        self.ethertype(0x0800)
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(14 + self.payload.len());
        frame.extend_from_slice(&self.dst_mac);
        frame.extend_from_slice(&self.src_mac);
        frame.extend_from_slice(&self.ethertype.to_be_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }
}

/// Builder for constructing IPv4 headers.
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    ttl: u8,
    protocol: u8,
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    payload: Vec<u8>,
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self {
            ttl: 64,
            protocol: 6, // TCP
            src_ip: [192, 168, 1, 1],
            dst_ip: [192, 168, 1, 2],
            payload: Vec::new(),
        }
    }
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn tcp(self) -> Self {
        self.protocol(6)
    }

    pub fn udp(self) -> Self {
        self.protocol(17)
    }

    pub fn src_ip(mut self, ip: [u8; 4]) -> Self {
        self.src_ip = ip;
        self
    }

    pub fn dst_ip(mut self, ip: [u8; 4]) -> Self {
        self.dst_ip = ip;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_length = 20 + self.payload.len() as u16;
        let mut header = Vec::with_capacity(20 + self.payload.len());

        header.push(0x45); // Version 4, IHL 5
        header.push(0x00); // DSCP + ECN
        header.extend_from_slice(&total_length.to_be_bytes());
        header.extend_from_slice(&[0x00, 0x01]); // Identification
        header.extend_from_slice(&[0x40, 0x00]); // DF
        header.push(self.ttl);
        header.push(self.protocol);
        header.extend_from_slice(&[0x00, 0x00]); // Checksum (not calculated)
        header.extend_from_slice(&self.src_ip);
        header.extend_from_slice(&self.dst_ip);
        header.extend_from_slice(&self.payload);

        header
    }
}

/// Builder for constructing TCP headers.
#[derive(Debug, Clone)]
pub struct TcpBuilder {
    src_port: u16,
    dst_port: u16,
    seq: u32,
    ack: u32,
    flags: TcpFlags,
    window: u16,
    payload: Vec<u8>,
}

impl Default for TcpBuilder {
    fn default() -> Self {
        Self {
            src_port: 12345,
            dst_port: 1521,
            seq: 1,
            ack: 0,
            flags: TcpFlags::SYN,
            window: 65535,
            payload: Vec::new(),
        }
    }
}

impl TcpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    pub fn ack_num(mut self, ack: u32) -> Self {
        self.ack = ack;
        self
    }

    pub fn flags(mut self, flags: TcpFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn psh_ack(self) -> Self {
        self.flags(TcpFlags::PSH | TcpFlags::ACK)
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut header = Vec::with_capacity(20 + self.payload.len());
        let bits = self.flags.bits();

        header.extend_from_slice(&self.src_port.to_be_bytes());
        header.extend_from_slice(&self.dst_port.to_be_bytes());
        header.extend_from_slice(&self.seq.to_be_bytes());
        header.extend_from_slice(&self.ack.to_be_bytes());
        header.push(0x50 | (bits >> 8) as u8); // Data offset 5 + NS
        header.push(bits as u8);
        header.extend_from_slice(&self.window.to_be_bytes());
        header.extend_from_slice(&[0x00, 0x00]); // Checksum
        header.extend_from_slice(&[0x00, 0x00]); // Urgent pointer
        header.extend_from_slice(&self.payload);

        header
    }
}

/// Builder for constructing UDP headers.
#[derive(Debug, Clone)]
pub struct UdpBuilder {
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
}

impl Default for UdpBuilder {
    fn default() -> Self {
        Self {
            src_port: 12345,
            dst_port: 53,
            payload: Vec::new(),
        }
    }
}

impl UdpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let length = 8 + self.payload.len() as u16;
        let mut header = Vec::with_capacity(8 + self.payload.len());

        header.extend_from_slice(&self.src_port.to_be_bytes());
        header.extend_from_slice(&self.dst_port.to_be_bytes());
        header.extend_from_slice(&length.to_be_bytes());
        header.extend_from_slice(&[0x00, 0x00]); // Checksum
        header.extend_from_slice(&self.payload);

        header
    }
}

/// Build a complete Ethernet/IPv4/TCP packet.
pub fn build_tcp_packet(
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    src_port: u16,
    dst_port: u16,
    flags: TcpFlags,
    payload: Vec<u8>,
) -> Vec<u8> {
    let tcp = TcpBuilder::new()
        .src_port(src_port)
        .dst_port(dst_port)
        .flags(flags)
        .payload(payload)
        .build();

    let ipv4 = Ipv4Builder::new()
        .src_ip(src_ip)
        .dst_ip(dst_ip)
        .tcp()
        .payload(tcp)
        .build();

    EthernetBuilder::new().ipv4().payload(ipv4).build()
}

/// Build a complete Ethernet/IPv4/UDP packet.
pub fn build_udp_packet(
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
) -> Vec<u8> {
    let udp = UdpBuilder::new()
        .src_port(src_port)
        .dst_port(dst_port)
        .payload(payload)
        .build();

    let ipv4 = Ipv4Builder::new()
        .src_ip(src_ip)
        .dst_ip(dst_ip)
        .udp()
        .payload(udp)
        .build();

    EthernetBuilder::new().ipv4().payload(ipv4).build()
}

/// Which side of a [`TcpConversation`] sends a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToServer,
    ToClient,
}

/// One synthetic frame: captured bytes plus the length it had on the wire.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub wire_len: usize,
}

impl Frame {
    pub fn capture(&self) -> Capture<'_> {
        Capture {
            link_type: 1,
            data: &self.data,
            wire_len: self.wire_len,
            timestamp_us: 0,
        }
    }
}

/// Synthetic two-way TCP stream over Ethernet/IPv4.
///
/// Sequence numbers advance with every payload byte, payloads larger than
/// the MSS are split over several segments, and frames longer than the snap
/// length are cut while keeping their wire length.
#[derive(Debug, Clone)]
pub struct TcpConversation {
    client: ([u8; 4], u16),
    server: ([u8; 4], u16),
    client_seq: u32,
    server_seq: u32,
    mss: usize,
    snaplen: Option<usize>,
}

impl TcpConversation {
    pub fn new(client_port: u16, server_port: u16) -> Self {
        Self {
            client: ([10, 0, 0, 1], client_port),
            server: ([10, 0, 0, 2], server_port),
            client_seq: 1000,
            server_seq: 5000,
            mss: 1460,
            snaplen: None,
        }
    }

    pub fn mss(mut self, mss: usize) -> Self {
        self.mss = mss.max(1);
        self
    }

    pub fn snaplen(mut self, snaplen: usize) -> Self {
        self.snaplen = Some(snaplen);
        self
    }

    fn segment(&mut self, direction: Direction, flags: TcpFlags, payload: &[u8]) -> Frame {
        let (src, dst, seq, ack) = match direction {
            Direction::ToServer => (self.client, self.server, self.client_seq, self.server_seq),
            Direction::ToClient => (self.server, self.client, self.server_seq, self.client_seq),
        };
        let tcp = TcpBuilder::new()
            .src_port(src.1)
            .dst_port(dst.1)
            .seq(seq)
            .ack_num(ack)
            .flags(flags)
            .payload(payload.to_vec())
            .build();
        let ipv4 = Ipv4Builder::new().src_ip(src.0).dst_ip(dst.0).tcp().payload(tcp).build();
        let mut data = EthernetBuilder::new().ipv4().payload(ipv4).build();

        let consumed = payload.len() as u32
            + u32::from(flags.intersects(TcpFlags::SYN | TcpFlags::FIN));
        match direction {
            Direction::ToServer => self.client_seq = self.client_seq.wrapping_add(consumed),
            Direction::ToClient => self.server_seq = self.server_seq.wrapping_add(consumed),
        }

        let wire_len = data.len();
        if let Some(snaplen) = self.snaplen {
            data.truncate(snaplen);
        }
        Frame { data, wire_len }
    }

    /// SYN, SYN-ACK, ACK.
    pub fn handshake(&mut self) -> Vec<Frame> {
        vec![
            self.segment(Direction::ToServer, TcpFlags::SYN, &[]),
            self.segment(Direction::ToClient, TcpFlags::SYN | TcpFlags::ACK, &[]),
            self.segment(Direction::ToServer, TcpFlags::ACK, &[]),
        ]
    }

    /// Application bytes, split into MSS-sized PSH/ACK segments.
    pub fn send(&mut self, direction: Direction, payload: &[u8]) -> Vec<Frame> {
        payload
            .chunks(self.mss)
            .map(|chunk| self.segment(direction, TcpFlags::PSH | TcpFlags::ACK, chunk))
            .collect()
    }

    /// FIN from the client.
    pub fn close(&mut self) -> Frame {
        self.segment(Direction::ToServer, TcpFlags::FIN | TcpFlags::ACK, &[])
    }
}

/// Helper to assert a field value equals expected.
pub fn assert_field_eq(result: &ParseResult, field: &str, expected: &FieldValue) {
    let actual = result
        .get(field)
        .unwrap_or_else(|| panic!("Field '{}' not found in result", field));
    assert_eq!(
        &actual, expected,
        "Field '{}' mismatch: expected {:?}, got {:?}",
        field, expected, actual
    );
}

/// Helper to assert parsing succeeded.
pub fn assert_parse_ok(result: &ParseResult) {
    assert!(result.is_ok(), "Parse failed: {:?}", result.error);
}

/// Create a parse context for a segment sent to `port` over TCP.
pub fn tcp_port_context(port: u16) -> ParseContext {
    let mut ctx = ParseContext::new(1);
    ctx.parent_protocol = Some("tcp");
    ctx.insert_hint("src_port", 40000);
    ctx.insert_hint("dst_port", u64::from(port));
    ctx.insert_hint("transport", 6);
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethernet_builder() {
        let frame = EthernetBuilder::new()
            .src_mac([0x11, 0x22, 0x33, 0x44, 0x55, 0x66])
            .dst_mac([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff])
            .ethertype(0x0800)
            .payload(vec![0x45, 0x00])
            .build();

        assert_eq!(frame.len(), 16); // 14 header + 2 payload
        assert_eq!(&frame[0..6], &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]); // dst
        assert_eq!(&frame[6..12], &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]); // src
        assert_eq!(&frame[12..14], &[0x08, 0x00]); // ethertype
    }

    #[test]
    fn test_tcp_builder_flags() {
        let segment = TcpBuilder::new()
            .src_port(2000)
            .dst_port(54321)
            .psh_ack()
            .build();

        assert_eq!(segment.len(), 20);
        assert_eq!(&segment[0..2], &2000u16.to_be_bytes());
        assert_eq!(segment[12], 0x50);
        assert_eq!(segment[13], 0x18); // PSH + ACK
    }

    #[test]
    fn test_build_tcp_packet() {
        let packet = build_tcp_packet(
            [192, 168, 1, 100],
            [192, 168, 1, 200],
            12345,
            1521,
            TcpFlags::SYN,
            Vec::new(),
        );

        // Should be Ethernet (14) + IPv4 (20) + TCP (20) = 54 bytes
        assert_eq!(packet.len(), 54);
    }

    #[test]
    fn test_conversation_segments_and_snaplen() {
        let mut conv = TcpConversation::new(40000, 1521).mss(10).snaplen(60);
        assert_eq!(conv.handshake().len(), 3);

        let frames = conv.send(Direction::ToServer, &[0x41; 25]);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].wire_len, 54 + 10);
        assert_eq!(frames[0].data.len(), 60);
        assert_eq!(frames[2].wire_len, 54 + 5);
        assert_eq!(frames[2].data.len(), 59);

        // Client sequence advanced by SYN plus the payload
        assert_eq!(conv.client_seq, 1000 + 1 + 25);
    }
}
