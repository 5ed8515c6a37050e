#![no_main]

use libfuzzer_sys::fuzz_target;
use lzav::{compress, compress_hi, decompress};

fuzz_target!(|data: &[u8]| {
    // Skip very large inputs to avoid OOM
    if data.is_empty() || data.len() > 1_000_000 {
        return;
    }

    // Default compressor
    let compressed = compress(data);
    let mut decompressed = vec![0u8; data.len()];
    decompress(&compressed, &mut decompressed).expect("default decode failed");
    assert_eq!(data, &decompressed[..], "default roundtrip failed");

    // High-ratio compressor
    let compressed_hi = compress_hi(data);
    let mut decompressed_hi = vec![0u8; data.len()];
    decompress(&compressed_hi, &mut decompressed_hi).expect("hi decode failed");
    assert_eq!(data, &decompressed_hi[..], "hi roundtrip failed");
});
