#![no_main]
use dabepg::binary;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any byte string the decoder accepts must re-encode, and the
    // re-encoded wire image must be a fixed point of decode/encode.
    let Ok(first) = binary::unmarshall(data) else {
        return;
    };
    let bytes = match binary::marshall(&first.document) {
        Ok(bytes) => bytes,
        // Decoded documents are not always encodable: the encoder
        // refuses the DRM profile the decoder tolerates.
        Err(_) => return,
    };
    let second = binary::unmarshall(&bytes).expect("re-encoded document must decode");
    let again = binary::marshall(&second.document).expect("stable document must re-encode");
    assert_eq!(again, bytes);
});
