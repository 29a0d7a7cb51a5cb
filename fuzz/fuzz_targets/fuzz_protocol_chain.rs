//! Fuzz target for the protocol parsing chain.
//!
//! Entry point for raw frame data. Tests:
//! - Protocol detection via can_parse() priority
//! - Header bounds checking in each layer
//! - Declared length propagation between layers
//! - Identical results for identical input

#![no_main]

use dissect_core::protocol::{default_registry, parse_packet, LINKTYPE_ETHERNET, LINKTYPE_RAW};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let registry = default_registry();

    let first = parse_packet(&registry, LINKTYPE_ETHERNET, data);
    let second = parse_packet(&registry, LINKTYPE_ETHERNET, data);
    assert_eq!(first, second);

    let _ = parse_packet(&registry, LINKTYPE_RAW, data);
});
