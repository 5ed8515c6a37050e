// Copyright 2025 Karpeles Lab Inc.
// Based on the LZAV compression format by Aleksey Vaneev
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::{
    compress, compress_bound, compress_bound_hi, compress_hi, compress_hi_into, compress_into,
    compress_with_buffer, decompress, decompress_partial, Error,
};

fn roundtrip(data: &[u8]) -> Result<(), String> {
    let original = data.to_vec();

    // Default compressor
    let encoded = compress(data);
    assert!(
        encoded.len() <= compress_bound(data.len()),
        "bound exceeded: {} > {}",
        encoded.len(),
        compress_bound(data.len())
    );

    let mut decoded = vec![0u8; data.len()];
    decompress(&encoded, &mut decoded).map_err(|e| format!("decode error: {}", e))?;

    if decoded != original {
        return Err(format!(
            "roundtrip mismatch: original len={}, decoded len={}",
            original.len(),
            decoded.len()
        ));
    }

    // High-ratio compressor
    let encoded_hi = compress_hi(data);
    assert!(
        encoded_hi.len() <= compress_bound_hi(data.len()),
        "hi bound exceeded: {} > {}",
        encoded_hi.len(),
        compress_bound_hi(data.len())
    );

    let mut decoded_hi = vec![0u8; data.len()];
    decompress(&encoded_hi, &mut decoded_hi).map_err(|e| format!("decode hi error: {}", e))?;

    if decoded_hi != original {
        return Err(format!(
            "roundtrip hi mismatch: original len={}, decoded len={}",
            original.len(),
            decoded_hi.len()
        ));
    }

    Ok(())
}

// Simple LCG for reproducible pseudo-random test data
fn lcg_fill(buf: &mut [u8], mut state: u64) {
    for byte in buf.iter_mut() {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        *byte = (state >> 32) as u8;
    }
}

#[test]
fn test_hello_world() {
    let data = b"Hello, World!";
    let encoded = compress(data);
    assert!(encoded.len() <= 15, "short input expanded: {}", encoded.len());

    let mut decoded = vec![0u8; data.len()];
    assert_eq!(decompress(&encoded, &mut decoded), Ok(13));
    assert_eq!(&decoded, data);
}

#[test]
fn test_empty_input_declined() {
    assert_eq!(compress(&[]), Vec::<u8>::new());
    assert_eq!(compress_hi(&[]), Vec::<u8>::new());

    let mut dst = [0u8; 64];
    assert_eq!(compress_into(&[], &mut dst), Err(Error::Params));
    assert_eq!(compress_hi_into(&[], &mut dst), Err(Error::Params));
}

#[test]
fn test_short_inputs() {
    for n in 1..16 {
        let mut data = vec![0u8; n];
        lcg_fill(&mut data, n as u64);
        roundtrip(&data).unwrap();
    }
}

#[test]
fn test_small_copy() {
    for i in 0..32 {
        let mut s = b"aaaa".to_vec();
        s.extend(vec![b'b'; i]);
        s.extend(b"aaaabbbb");
        roundtrip(&s).unwrap();
    }
}

#[test]
fn test_small_rand() {
    let mut n = 1;
    while n < 20000 {
        let mut b = vec![0u8; n];
        lcg_fill(&mut b, 1);
        roundtrip(&b).unwrap();
        n += 23;
    }
}

#[test]
fn test_small_regular() {
    let mut n = 1;
    while n < 20000 {
        let mut b = vec![0u8; n];
        for (i, byte) in b.iter_mut().enumerate() {
            *byte = (i % 10) as u8 + b'a';
        }
        roundtrip(&b).unwrap();
        n += 23;
    }
}

#[test]
fn test_small_repeat() {
    let mut n = 1;
    while n < 20000 {
        let b = vec![b'a'; n];
        roundtrip(&b).unwrap();
        n += 23;
    }
}

#[test]
fn test_zeros_1mib() {
    let data = vec![0u8; 1 << 20];
    let encoded = compress(&data);
    assert!(
        encoded.len() <= 16 * 1024,
        "same-byte run compressed poorly: {}",
        encoded.len()
    );

    let mut decoded = vec![0u8; data.len()];
    assert_eq!(decompress(&encoded, &mut decoded), Ok(data.len()));
    assert_eq!(decoded, data);

    roundtrip(&data).unwrap();
}

#[test]
fn test_random_64k_incompressible() {
    let mut data = vec![0u8; 64 * 1024];
    lcg_fill(&mut data, 0x9E3779B97F4A7C15);

    let encoded = compress(&data);
    assert!(
        encoded.len() >= data.len(),
        "random data cannot shrink: {}",
        encoded.len()
    );

    roundtrip(&data).unwrap();
}

#[test]
fn test_repeated_pattern() {
    let data = b"abcdefghij".repeat(1000);
    let encoded = compress(&data);
    assert!(
        encoded.len() < data.len() / 10,
        "periodic data compressed poorly: {}",
        encoded.len()
    );

    roundtrip(&data).unwrap();
}

#[test]
fn test_literal_run_lengths() {
    // Exercise every literal-length encoding branch via incompressible
    // runs around the 9/16/33/144 writer boundaries.
    for size in [1, 8, 9, 15, 16, 17, 32, 33, 100, 143, 144, 500, 5000, 70000] {
        let mut data = vec![0u8; size];
        lcg_fill(&mut data, size as u64);
        roundtrip(&data).unwrap();
    }
}

#[test]
fn test_reference_run_lengths() {
    // Tiled repeats of varying periods drive reference lengths across
    // the nibble / one-byte / two-byte encodings.
    for period in [8, 11, 16, 31, 64, 200, 530, 531] {
        let tile: Vec<u8> = (0..period).map(|i| (i * 17 % 251) as u8).collect();
        let mut data = Vec::new();
        while data.len() < 40000 {
            data.extend_from_slice(&tile);
        }
        roundtrip(&data).unwrap();
    }
}

#[test]
fn test_terminal_literals() {
    // The stream always ends with the input's trailing bytes in plain form.
    let data = b"The quick brown fox jumps over the lazy dog. ".repeat(50);
    let encoded = compress(&data);
    assert!(encoded.ends_with(&data[data.len() - 6..]));

    let encoded_hi = compress_hi(&data);
    assert!(encoded_hi.ends_with(&data[data.len() - 6..]));
}

#[test]
fn test_determinism() {
    let mut data = vec![0u8; 30000];
    lcg_fill(&mut data, 7);
    data[1000..2000].fill(b'x');

    assert_eq!(compress(&data), compress(&data));
    assert_eq!(compress_hi(&data), compress_hi(&data));
}

#[test]
fn test_bound_minimums() {
    assert_eq!(compress_bound(0), 16);
    assert_eq!(compress_bound_hi(0), 16);

    for n in [1, 15, 16, 1000, 1 << 20] {
        assert!(compress_bound(n) > n);
        assert!(compress_bound_hi(n) > n);
    }
}

#[test]
fn test_insufficient_dst() {
    let data = vec![b'a'; 1000];
    let mut dst = vec![0u8; 100]; // Below the bound.
    assert_eq!(compress_into(&data, &mut dst), Err(Error::Params));
    assert_eq!(compress_hi_into(&data, &mut dst), Err(Error::Params));
}

#[test]
fn test_external_buffer() {
    let mut data = vec![0u8; 10000];
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = (i % 100) as u8;
    }

    let reference = compress(&data);

    // A generously sized buffer yields the same table size, hence the
    // same stream.
    let mut dst = vec![0u8; compress_bound(data.len())];
    let mut ext = vec![0u32; 1 << 16];
    let n = compress_with_buffer(&data, &mut dst, &mut ext).unwrap();
    assert_eq!(&dst[..n], &reference[..]);

    // An undersized buffer falls back to the internal scratch table and
    // must still produce a valid stream.
    let mut ext_small = vec![0u32; 64];
    let n = compress_with_buffer(&data, &mut dst, &mut ext_small).unwrap();
    let mut decoded = vec![0u8; data.len()];
    assert_eq!(decompress(&dst[..n], &mut decoded), Ok(data.len()));
    assert_eq!(decoded, data);
}

#[test]
fn test_truncated_stream() {
    let data = b"Hello, World!";
    let encoded = compress(data);

    let mut decoded = vec![0u8; data.len()];
    let err = decompress(&encoded[..encoded.len() - 1], &mut decoded).unwrap_err();
    assert!(
        err == Error::SrcOob || err == Error::DstLen,
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn test_truncated_large_stream() {
    let data = b"abcdefghij".repeat(1000);
    let encoded = compress(&data);

    let mut decoded = vec![0u8; data.len()];
    for cut in [1, 2, 5, encoded.len() / 2] {
        let r = decompress(&encoded[..encoded.len() - cut], &mut decoded);
        assert!(r.is_err(), "truncation by {} not detected", cut);
    }
}

#[test]
fn test_wrong_dstl() {
    let data = b"Hello, World!";
    let encoded = compress(data);

    // Larger than the stream produces: the stream ends early.
    let mut decoded = vec![0u8; 20];
    assert_eq!(decompress(&encoded, &mut decoded), Err(Error::DstLen));

    // Smaller: the literals overflow the destination.
    let mut decoded = vec![0u8; 5];
    assert_eq!(decompress(&encoded, &mut decoded), Err(Error::DstOob));
}

#[test]
fn test_reference_out_of_bounds() {
    // Hand-built stream: 4 literals, then a type-2 reference whose
    // offset reaches far before the output start.
    let stream = [
        0x26, 0x04, b'a', b'b', b'c', b'd', 0x21, 0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0,
    ];

    let mut decoded = vec![0u8; 100];
    assert_eq!(decompress(&stream, &mut decoded), Err(Error::RefOob));

    // The partial decoder keeps the bytes committed before the failure.
    let mut partial = vec![0u8; 100];
    assert_eq!(decompress_partial(&stream, &mut partial), 4);
    assert_eq!(&partial[..4], b"abcd");
}

#[test]
fn test_unknown_format() {
    let mut decoded = vec![0u8; 16];
    assert_eq!(
        decompress(&[0x96, 0, 0, 0, 0, 0, 0, 0], &mut decoded),
        Err(Error::UnknownFormat)
    );

    // A format-2 prefix with a zero mref nibble is rejected, not wrapped.
    assert_eq!(
        decompress(&[0x20, 0, 0, 0, 0, 0, 0, 0], &mut decoded),
        Err(Error::UnknownFormat)
    );

    assert_eq!(decompress(&[], &mut decoded), Err(Error::Params));
}

#[test]
fn test_partial_of_garbage() {
    let mut decoded = vec![0u8; 64];
    assert_eq!(decompress_partial(&[], &mut decoded), 0);
    assert_eq!(decompress_partial(&[0x55, 1, 2, 3], &mut decoded), 0);
}

#[test]
fn test_error_codes() {
    assert_eq!(Error::Params.code(), -1);
    assert_eq!(Error::SrcOob.code(), -2);
    assert_eq!(Error::DstOob.code(), -3);
    assert_eq!(Error::RefOob.code(), -4);
    assert_eq!(Error::DstLen.code(), -5);
    assert_eq!(Error::UnknownFormat.code(), -6);
}

#[test]
fn test_mixed_content() {
    // Compressible text interleaved with incompressible noise.
    let mut data = Vec::new();
    let mut noise = vec![0u8; 512];
    lcg_fill(&mut noise, 42);

    for i in 0..40 {
        data.extend_from_slice(b"common prefix that repeats in every record ");
        data.extend_from_slice(&noise[(i * 7) % 256..][..128]);
    }

    roundtrip(&data).unwrap();
}

#[test]
fn test_long_literal_then_match() {
    // A long incompressible head followed by a repeated tail forces a
    // varint-coded literal run in front of a reference block.
    let mut data = vec![0u8; 4096];
    lcg_fill(&mut data, 3);
    let tail = data[..256].to_vec();
    data.extend_from_slice(&tail);
    data.extend_from_slice(&tail);

    roundtrip(&data).unwrap();
}
