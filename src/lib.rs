// Copyright 2025 Karpeles Lab Inc.
// Based on the LZAV compression format by Aleksey Vaneev
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! # LZAV Compression
//!
//! This library implements the LZAV in-memory compression format
//! (stream format 2), binary compatible with the reference
//! implementation at github.com/avaneev/lzav
//!
//! LZAV provides:
//! - Fast compression with a higher-ratio mode
//! - Very fast decompression
//! - Raw byte streams without headers or checksums
//! - Partial decompression for data recovery
//!
//! ## Block Format Example
//!
//! ```rust
//! use lzav::{compress, decompress};
//!
//! let data = b"Hello, World! This is a test of LZAV compression.";
//! let compressed = compress(data);
//! let mut decompressed = vec![0u8; data.len()];
//! decompress(&compressed, &mut decompressed).expect("decompression failed");
//! assert_eq!(data, &decompressed[..]);
//! ```
//!
//! The stream carries no integrity metadata and no uncompressed length;
//! callers that persist compressed data should store the original length
//! (and a checksum, if needed) alongside it.

mod constants;
mod decode;
mod encode;
mod error;
mod matchlen;
mod varint;

pub use decode::{decompress, decompress_partial};
pub use encode::{
    compress, compress_bound, compress_bound_hi, compress_hi, compress_hi_into, compress_into,
    compress_with_buffer,
};
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
