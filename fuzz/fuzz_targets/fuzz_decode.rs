#![no_main]

use libfuzzer_sys::fuzz_target;
use lzav::{decompress, decompress_partial};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1_000_000 {
        return;
    }

    // Arbitrary bytes must never cause a panic or an out-of-bounds
    // access, whatever destination length is expected.
    for dstl in [0, 1, 7, 64, 1024, data.len(), data.len() * 3] {
        let mut dst = vec![0u8; dstl];
        let _ = decompress(data, &mut dst);

        let mut dst = vec![0u8; dstl];
        let n = decompress_partial(data, &mut dst);
        assert!(n <= dstl);
    }
});
