#![no_main]

use kvlite_core::codec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Limit input size to prevent timeout
    if data.len() > 1_000_000 {
        return;
    }

    // Arbitrary bytes must decode or fail cleanly, never panic or overflow
    if let Ok(value) = codec::decode(data) {
        let encoded = codec::encode(&value).expect("decoded value must re-encode");
        assert_eq!(codec::decode(&encoded).ok(), Some(value));
    }
});
