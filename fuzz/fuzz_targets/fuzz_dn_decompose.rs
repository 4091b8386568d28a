#![no_main]

use ldapsync::directory::decompose;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(dn) = std::str::from_utf8(data) {
        // Malformed DNs must come back as errors, never as panics
        if let Ok(components) = decompose(dn) {
            for component in components {
                assert!(!component.name.is_empty());
            }
        }
    }
});
