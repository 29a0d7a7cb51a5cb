//! Fuzz target for the TLV decoder, identifier decoder and certificate walker.

#![no_main]

use dissect_core::ber::{count_elements, decode_certificate, read_node_sequence, read_tlv_header, Limits};
use dissect_core::Cursor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::new(data);
    while let Ok(header) = read_tlv_header(&mut cursor) {
        assert_eq!(header.value.len() as u64, header.length);
        let _ = header.to_string();

        let mut nodes = [0u32; 16];
        let mut content = Cursor::new(header.value);
        if let Ok(count) = read_node_sequence(&mut content, header.value.len(), &mut nodes) {
            assert!(count <= nodes.len());
        }
        if cursor.skip(header.value.len()).is_err() {
            break;
        }
    }

    let _ = count_elements(data, Limits::default());
    let _ = decode_certificate(data);
});
