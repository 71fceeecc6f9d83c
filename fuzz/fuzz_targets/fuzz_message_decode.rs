#![no_main]

use libfuzzer_sys::fuzz_target;
use safenode_messages::{decode_message, encode_message, WireMessage};

fuzz_target!(|data: &[u8]| {
    // Decoding untrusted peer bytes must never panic.
    let Ok(message) = decode_message(data) else {
        return;
    };

    // Whatever decodes must re-encode to the same bytes: trailing input is
    // rejected and the encoding is fixed-width.
    assert_eq!(encode_message(&message), data);

    // Hashing and signature checks must be total on decoded input.
    match &message {
        WireMessage::Broadcast(b) => {
            let _ = b.hash();
            let _ = b.check_signature();
        }
        WireMessage::Ping(p) => {
            let _ = p.hash();
        }
        WireMessage::Verification(v) => {
            let _ = v.hash();
            let _ = v.is_complete();
        }
    }
});
