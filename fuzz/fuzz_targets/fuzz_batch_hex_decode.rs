#![no_main]

use libfuzzer_sys::fuzz_target;
use safenode_messages::{decode_batch_hex, encode_batch_hex};

fuzz_target!(|data: &[u8]| {
    // Operator-supplied text: arbitrary UTF-8 must be rejected cleanly.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(batch) = decode_batch_hex(text) {
        // A decoded batch re-encodes to the lowercase form of its input.
        assert_eq!(encode_batch_hex(&batch), text.trim().to_ascii_lowercase());
    }
});
