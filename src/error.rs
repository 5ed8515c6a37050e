// Copyright 2025 Karpeles Lab Inc.
// Based on the LZAV compression format by Aleksey Vaneev
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt;

/// Result type for LZAV operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for LZAV compression/decompression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Invalid parameters (empty or oversized source, undersized destination)
    Params,

    /// The compressed stream ends in the middle of a block
    SrcOob,

    /// Decoding would write past the expected destination length
    DstOob,

    /// A reference points before the start of the output
    RefOob,

    /// The stream ended before producing the expected number of bytes
    DstLen,

    /// The stream prefix carries an unknown format identifier
    UnknownFormat,
}

impl Error {
    /// Numeric error code, matching the values used by other LZAV
    /// implementations.
    pub fn code(&self) -> i32 {
        match self {
            Error::Params => -1,
            Error::SrcOob => -2,
            Error::DstOob => -3,
            Error::RefOob => -4,
            Error::DstLen => -5,
            Error::UnknownFormat => -6,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Params => write!(f, "lzav: invalid parameters"),
            Error::SrcOob => write!(f, "lzav: source buffer out of bounds"),
            Error::DstOob => write!(f, "lzav: destination buffer out of bounds"),
            Error::RefOob => write!(f, "lzav: back-reference out of bounds"),
            Error::DstLen => write!(f, "lzav: decompressed length mismatch"),
            Error::UnknownFormat => write!(f, "lzav: unknown stream format"),
        }
    }
}

impl std::error::Error for Error {}
