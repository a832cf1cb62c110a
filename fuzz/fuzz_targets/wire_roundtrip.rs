#![no_main]

use {
    libfuzzer_sys::fuzz_target,
    nino_wire::{Reader, Writer},
};

// Write-then-read over the string, header and bulk paths must reproduce
// the input exactly.
fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    let mut writer = Writer::new();
    writer.write_str_utf8(Some(&text)).unwrap();
    writer.write_str_utf16(Some(&text)).unwrap();
    writer.write_collection_header(data.len()).unwrap();
    writer.write_unmanaged_slice(data);
    let frame = writer.reserve_frame();
    writer.write_bool(true);
    writer.patch_frame(frame);

    let bytes = writer.into_bytes();
    let mut reader = Reader::new(&bytes);
    assert_eq!(reader.read_str_utf8().unwrap().as_deref(), Some(&*text));
    assert_eq!(reader.read_str_utf16().unwrap().as_deref(), Some(&*text));
    let len = reader.read_collection_header().unwrap().unwrap() as usize;
    assert_eq!(reader.read_bytes(len).unwrap(), data);
    let mut inner = reader.enter_frame().unwrap().unwrap();
    assert!(inner.read_bool().unwrap());
    assert!(reader.is_eof());
});
