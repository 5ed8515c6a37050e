// Copyright 2025 Karpeles Lab Inc.
// Based on the LZAV compression format by Aleksey Vaneev
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

/// Stream format identifier written by the compressors
pub const FMT_CUR: u8 = 2;

/// Legacy stream format readable with the `format1` feature
#[cfg(feature = "format1")]
pub const FMT_LEGACY: u8 = 1;

/// LZ77 window length, the maximum reference offset
pub const WIN_LEN: usize = 1 << 23;

/// Minimum reference length emitted by the default compressor
pub const REF_MIN: usize = 6;

/// Minimum reference length emitted by the high-ratio compressor
pub const REF_MIN_HI: usize = 5;

/// Maximum encodable single-reference length
pub const REF_LEN: usize = REF_MIN + 15 + 255 + 254;

/// Number of trailing input bytes always emitted as literals
pub const LIT_FIN: usize = 6;

/// Inputs shorter than this are stored as a single literal run
pub const SHORT_MAX: usize = 16;

/// Smallest hash table for the default compressor, in bytes (2 KiB)
pub const MIN_HTABLE: usize = (1 << 7) * 4 * 4;

/// Largest hash table for the default compressor, in bytes (1 MiB)
pub const MAX_HTABLE: usize = 1 << 20;

/// Smallest hash table for the high-ratio compressor, in bytes (8 KiB)
pub const MIN_HTABLE_HI: usize = (1 << 7) * 4 * 2 * 8;

/// Largest hash table for the high-ratio compressor, in bytes (8 MiB)
pub const MAX_HTABLE_HI: usize = 1 << 23;

/// On-stack hash-table scratch for small inputs, in bytes (16 KiB)
pub const STACK_HTABLE: usize = 4096 * 4;
