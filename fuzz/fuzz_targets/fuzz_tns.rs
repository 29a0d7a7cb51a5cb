//! Fuzz target for the TNS dissector.
//!
//! Feeds the data both as a bare PDU and as a DATA packet body so the
//! TTC function walk sees arbitrary content behind a valid header.

#![no_main]

use dissect_core::protocol::{ParseContext, Protocol, TnsProtocol, LINKTYPE_ETHERNET};
use dissect_core::Cursor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let context = ParseContext::new(LINKTYPE_ETHERNET);

    let _ = TnsProtocol.parse(&mut Cursor::new(data), &context);

    let Ok(length) = u16::try_from(8 + data.len()) else {
        return;
    };
    let mut packet = length.to_be_bytes().to_vec();
    packet.extend_from_slice(&[0x00, 0x00, 0x06, 0x00, 0x00, 0x00]);
    packet.extend_from_slice(data);

    let result = TnsProtocol.parse(&mut Cursor::new(&packet), &context);
    if let Some(info) = result.info() {
        assert_eq!(info.head_len, packet.len());
    }
});
