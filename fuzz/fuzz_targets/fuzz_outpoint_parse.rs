#![no_main]

use libfuzzer_sys::fuzz_target;
use safenode_types::{Outpoint, ServiceAddr};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Config entries and command arguments: parsing must never panic.
    if let Ok(outpoint) = text.parse::<Outpoint>() {
        let again: Outpoint = outpoint.to_string().parse().expect("display form parses");
        assert_eq!(again, outpoint);
    }
    let _ = ServiceAddr::parse(text);
});
