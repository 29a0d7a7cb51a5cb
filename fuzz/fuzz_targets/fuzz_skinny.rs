//! Fuzz target for the Skinny dissector, basic and CM7 headers.

#![no_main]

use dissect_core::protocol::{ParseContext, Protocol, SkinnyProtocol, LINKTYPE_ETHERNET};
use dissect_core::Cursor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let context = ParseContext::new(LINKTYPE_ETHERNET);

    let _ = SkinnyProtocol.parse(&mut Cursor::new(data), &context);

    // Valid length in front of a fuzzed header version, message id and body
    let Ok(length) = u32::try_from(data.len().saturating_sub(4)) else {
        return;
    };
    let mut message = length.to_le_bytes().to_vec();
    message.extend_from_slice(data);

    let result = SkinnyProtocol.parse(&mut Cursor::new(&message), &context);
    if let Some(info) = result.info() {
        assert_eq!(info.head_len, 8);
        assert!(result.remaining.len() <= info.payload);
    }
});
