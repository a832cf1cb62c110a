#![no_main]

use {libfuzzer_sys::fuzz_target, nino_wire::Reader};

// Arbitrary bytes through every decode path: no panics, and the cursor
// never moves backwards.
fuzz_target!(|data: &[u8]| {
    let mut reader = Reader::new(data);
    let mut last = reader.position();
    loop {
        let before = reader.position();
        let any_ok = reader.read_collection_header().is_ok()
            || reader.read_bool().is_ok()
            || reader.read_type_id().is_ok()
            || reader.read_str_utf16().is_ok()
            || reader.read_str_utf8().is_ok()
            || matches!(reader.enter_frame(), Ok(Some(_)));
        assert!(reader.position() >= last, "cursor moved backwards");
        last = reader.position();
        if !any_ok || reader.position() == before || reader.is_eof() {
            break;
        }
    }
});
