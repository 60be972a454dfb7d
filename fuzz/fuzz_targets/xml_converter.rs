#![no_main]
use iati_json::{map_document, parse_str, serialize, FormatMode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(document) = parse_str(s) {
            let value = map_document(&document);
            let _ = serialize(&value, FormatMode::Pretty);
        }
    }
});
