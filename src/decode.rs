// Copyright 2025 Karpeles Lab Inc.
// Based on the LZAV compression format by Aleksey Vaneev
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::constants::*;
use crate::error::{Error, Result};
use crate::varint::decode_len;

/// Load a u32 from the slice at the given offset
#[inline]
fn load32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[cfg(feature = "format1")]
#[inline]
fn load16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

/// Decompress a stream into `dst`.
///
/// `dst.len()` must equal the original uncompressed length; producing any
/// other number of bytes is an error. Returns the number of bytes written,
/// which equals `dst.len()` on success.
pub fn decompress(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    if src.is_empty() {
        return Err(Error::Params);
    }

    let fmt = src[0] >> 4;

    if fmt == FMT_CUR {
        return decompress_fmt2(src, dst).map_err(|(e, _)| e);
    }

    #[cfg(feature = "format1")]
    if fmt == FMT_LEGACY {
        return decompress_fmt1(src, dst);
    }

    Err(Error::UnknownFormat)
}

/// Best-effort decompression for partial or recovery use.
///
/// Decodes as much as possible, for example an initial segment of a
/// larger block, and returns the number of bytes committed to `dst`.
/// Never fails.
pub fn decompress_partial(src: &[u8], dst: &mut [u8]) -> usize {
    if src.is_empty() {
        return 0;
    }

    if src[0] >> 4 == FMT_CUR {
        match decompress_fmt2(src, dst) {
            Ok(n) => n,
            Err((_, written)) => written,
        }
    } else {
        0
    }
}

/// Stream format 2 decoder.
///
/// On error, the payload carries the number of bytes committed to `dst`
/// before the failure.
fn decompress_fmt2(src: &[u8], dst: &mut [u8]) -> std::result::Result<usize, (Error, usize)> {
    let ipe = src.len();
    let ipet = ipe.saturating_sub(6); // Block header read threshold.
    let ope = dst.len();
    let opet = ope.saturating_sub(63); // Threshold for fast copies.

    let mref1 = (src[0] & 15) as usize; // Minimal reference length - 1.
    if mref1 == 0 {
        return Err((Error::UnknownFormat, 0));
    }
    let mref1 = mref1 - 1;

    let mut ip = 1; // Past the prefix byte.
    let mut op = 0;
    let mut cv: usize = 0; // Reference offset carry value.

    // Carry shift; every reference resets it, and a well-formed stream
    // never accumulates past 5. The clamp keeps shifts defined when a
    // malformed stream strings literal blocks together.
    let mut csh: u32 = 0;

    if ip >= ipet {
        return Err((Error::SrcOob, 0));
    }

    let mut bh = src[ip] as usize; // Current block header.

    while ip < ipet {
        if (bh & 0x30) == 0 {
            // Literal block.
            let ncv = (bh >> 6) << csh;
            ip += 1;
            let mut cc = bh & 15;
            let mut ipd = ip;
            let mut refblk = false;

            if cc != 0 {
                ip += cc;

                if op < opet && ipd + 22 < ipe {
                    cv |= ncv;
                    csh = (csh + 2).min(30);
                    bh = src[ip] as usize;
                    dst[op..op + 16].copy_from_slice(&src[ipd..ipd + 16]);
                    op += cc;
                    refblk = true; // A reference block follows, if not EOS.
                }
            } else {
                let (ext, nip) = decode_len(src, ip);
                ip = nip;
                cc = 16 + ext;
                ipd = ip;
                ip += cc;

                if op < opet && ipd + 79 < ipe {
                    dst[op..op + 64].copy_from_slice(&src[ipd..ipd + 64]);

                    if cc < 65 {
                        cv |= ncv;
                        csh = (csh + 2).min(30);
                        bh = src[ip] as usize;
                        op += cc;
                        refblk = true;
                    } else {
                        ipd += 64;
                        op += 64;
                        cc -= 64;
                    }
                }
            }

            if !refblk {
                cv |= ncv;
                csh = (csh + 2).min(30);

                if ip < ipe {
                    bh = src[ip] as usize;
                } else if ip != ipe {
                    // Truncated inside the literals: salvage what exists.
                    let avail = ipe - ipd;

                    if op + avail < ope {
                        dst[op..op + avail].copy_from_slice(&src[ipd..ipe]);
                        return Err((Error::SrcOob, op + avail));
                    }

                    dst[op..ope].copy_from_slice(&src[ipd..ipd + (ope - op)]);
                    return Err((Error::SrcOob, ope));
                }

                if op + cc > ope {
                    dst[op..ope].copy_from_slice(&src[ipd..ipd + (ope - op)]);
                    return Err((Error::DstOob, ope));
                }

                dst[op..op + cc].copy_from_slice(&src[ipd..ipd + cc]);
                op += cc;
                continue;
            }
        }

        // Reference block. When entered through a literal fast path, `bh`
        // holds the pre-loaded next header.
        let bt = (bh >> 4) & 3;
        ip += 1;
        let bt8 = (bt << 3) as u32;

        let mut bv = load32(src, ip) as usize;
        let om = (1usize << bt8) - 1;
        ip += bt;
        let o = bv & om;
        bv >>= bt8;

        let d = ((bh >> 6) | (o & 0x1F_FFFF) << 2) << csh | cv;

        if d > op {
            return Err((Error::RefOob, op));
        }

        csh = if bt == 3 { 3 } else { 0 };
        cv = o >> 21;
        let mut ipd = op - d;
        let mut cc = bh & 15;

        if cc != 0 {
            bh = bv & 0xFF;
            cc += mref1;

            if op < opet {
                // The 16+4 split tolerates offsets down to 4; the writer
                // never emits an offset below the copy length.
                dst.copy_within(ipd..ipd + 16, op);
                dst.copy_within(ipd + 16..ipd + 20, op + 16);
                op += cc;
                continue;
            }
        } else {
            bh = bv & 0xFF;

            if bh == 255 {
                cc = 16 + mref1 + 255 + src[ip + 1] as usize;
                bh = src[ip + 2] as usize;
                ip += 2;
            } else {
                cc = 16 + mref1 + bh;
                ip += 1;
                bh = src[ip] as usize;
            }

            if op < opet {
                dst.copy_within(ipd..ipd + 16, op);
                dst.copy_within(ipd + 16..ipd + 32, op + 16);
                dst.copy_within(ipd + 32..ipd + 48, op + 32);
                dst.copy_within(ipd + 48..ipd + 64, op + 48);

                if cc < 65 {
                    op += cc;
                    continue;
                }

                ipd += 64;
                op += 64;
                cc -= 64;
            }
        }

        if op + cc > ope {
            // Ascending byte copy keeps run-filling semantics for the
            // salvaged tail.
            for i in 0..ope - op {
                dst[op + i] = dst[ipd + i];
            }

            return Err((Error::DstOob, ope));
        }

        for i in 0..cc {
            dst[op + i] = dst[ipd + i];
        }

        op += cc;
    }

    if op != ope {
        return Err((Error::DstLen, op));
    }

    Ok(op)
}

/// Stream format 1 decoder (legacy). Structurally like format 2, with a
/// different offset-byte layout per block type and a fixed two-bit carry.
#[cfg(feature = "format1")]
fn decompress_fmt1(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let ipe = src.len();
    let ipet = ipe.saturating_sub(5);
    let ope = dst.len();
    let opet = ope.saturating_sub(63);

    let mref1 = (src[0] & 15) as usize;
    if mref1 == 0 {
        return Err(Error::UnknownFormat);
    }
    let mref1 = mref1 - 1;

    let mut ip = 1;
    let mut op = 0;
    let mut cv: usize = 0;
    let mut csh: u32 = 0;

    if ip >= ipet {
        return Err(Error::SrcOob);
    }

    let mut bh = src[ip] as usize;

    while ip < ipet {
        if (bh & 0x30) == 0 {
            // Literal block.
            cv = bh >> 6;
            csh = 2;
            ip += 1;
            let mut cc = bh & 15;
            let mut ipd = ip;
            let mut refblk = false;

            if cc != 0 {
                ip += cc;

                if op < opet && ipd + 21 < ipe {
                    bh = src[ip] as usize;
                    dst[op..op + 16].copy_from_slice(&src[ipd..ipd + 16]);
                    op += cc;
                    refblk = true;
                }
            } else {
                let bv = load16(src, ip) as usize;
                let l2 = bv & 0xFF;
                ip += 1;
                let lb = (l2 == 255) as usize;
                cc = 16 + l2 + ((bv >> 8) & (0x100 - lb));
                ip += lb;
                ipd = ip;
                ip += cc;

                if op < opet && ipd + 64 < ipe {
                    dst[op..op + 64].copy_from_slice(&src[ipd..ipd + 64]);

                    if cc < 65 {
                        bh = src[ip] as usize;
                        op += cc;
                        continue;
                    }

                    ipd += 64;
                    op += 64;
                    cc -= 64;
                }
            }

            if !refblk {
                if ip < ipe {
                    bh = src[ip] as usize;
                } else if ip != ipe {
                    return Err(Error::SrcOob);
                }

                if op + cc > ope {
                    return Err(Error::DstOob);
                }

                dst[op..op + cc].copy_from_slice(&src[ipd..ipd + cc]);
                op += cc;
                continue;
            }
        }

        // Reference block.
        let mut cc = bh & 15;
        let mut ipd;

        if (bh & 32) == 0 {
            // Block type 1, 10-bit offset.
            let d = ((bh >> 6) | (src[ip + 1] as usize) << 2) << csh | cv;

            if d > op {
                return Err(Error::RefOob);
            }

            csh = 0;
            cv = 0;
            ipd = op - d;
            ip += 2;
            bh = src[ip] as usize;
        } else if (bh & 16) == 0 {
            // Block type 2, 18-bit offset.
            let d = ((bh >> 6) | (load16(src, ip + 1) as usize) << 2) << csh | cv;

            if d > op {
                return Err(Error::RefOob);
            }

            csh = 0;
            cv = 0;
            ipd = op - d;
            ip += 3;
            bh = src[ip] as usize;
        } else {
            // Block type 3, 24-bit offset with a two-bit carry.
            let bv = load32(src, ip + 1) as usize;
            let d = (bv & 0xFF_FFFF) << csh | cv;

            if d > op {
                return Err(Error::RefOob);
            }

            csh = 2;
            cv = bh >> 6;
            ipd = op - d;
            ip += 4;
            bh = bv >> 24;
        }

        if cc != 0 {
            cc += mref1;

            if op < opet {
                dst.copy_within(ipd..ipd + 16, op);
                dst.copy_within(ipd + 16..ipd + 20, op + 16);
                op += cc;
                continue;
            }
        } else {
            cc = 16 + mref1 + bh;
            ip += 1;
            bh = src[ip] as usize;

            if op < opet {
                dst.copy_within(ipd..ipd + 16, op);
                dst.copy_within(ipd + 16..ipd + 32, op + 16);
                dst.copy_within(ipd + 32..ipd + 48, op + 32);
                dst.copy_within(ipd + 48..ipd + 64, op + 48);

                if cc < 65 {
                    op += cc;
                    continue;
                }

                ipd += 64;
                op += 64;
                cc -= 64;
            }
        }

        if op + cc > ope {
            return Err(Error::DstOob);
        }

        for i in 0..cc {
            dst[op + i] = dst[ipd + i];
        }

        op += cc;
    }

    if op != ope {
        return Err(Error::DstLen);
    }

    Ok(op)
}
