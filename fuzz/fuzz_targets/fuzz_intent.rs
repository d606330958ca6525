#![no_main]

use buzzer_client::ClientIntent;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Any intent that decodes must encode back to the same intent.
    if let Ok(intent) = serde_json::from_str::<ClientIntent>(text) {
        let Ok(encoded) = serde_json::to_string(&intent) else {
            panic!("decoded intent failed to encode: {intent:?}");
        };
        let decoded: ClientIntent = match serde_json::from_str(&encoded) {
            Ok(decoded) => decoded,
            Err(e) => panic!("re-encoded intent failed to decode: {e}"),
        };
        assert_eq!(decoded, intent);
    }
});
