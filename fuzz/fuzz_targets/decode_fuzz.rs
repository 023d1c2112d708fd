#![no_main]
use dabepg::binary;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fuzz the decoder with arbitrary bytes.
    // The decoder must never panic — only return errors.
    let _ = binary::unmarshall(data);

    // Also fuzz the leaf codecs directly, without framing.
    let _ = binary::timepoint::decode_timepoint(data);
    let _ = binary::contentid::decode_contentid(data);
    let _ = binary::genre::decode_genre(data);
});
