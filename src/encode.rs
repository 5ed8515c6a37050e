// Copyright 2025 Karpeles Lab Inc.
// Based on the LZAV compression format by Aleksey Vaneev
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::constants::*;
use crate::error::{Error, Result};
use crate::matchlen::{match_len, match_len_r};
use crate::varint::encode_len;

/// Load a u16 from the slice at the given offset
#[inline]
fn load16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

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

/// Store a little-endian u32 at the given offset
#[inline]
fn store32(data: &mut [u8], offset: usize, v: u32) {
    data[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
}

/// Offset-carry state threaded through the block writer.
///
/// `bp` indexes the output byte that receives the low bits of the next
/// reference offset; `shift` is how many of those bits it takes (0 or 3).
struct Carry {
    bp: usize,
    shift: u32,
}

/// Write a literal run followed by a reference block (stream format 2).
///
/// `rc` must not be lesser than `mref`. `d` must be lesser than `WIN_LEN`
/// and not lesser than `rc`, since the fast reference copy on
/// decompression cannot reproduce data that is not in the output yet.
/// Returns the advanced output position.
fn write_block(
    dst: &mut [u8],
    mut op: usize,
    mut lc: usize,
    rc: usize,
    mut d: usize,
    src: &[u8],
    mut ipa: usize,
    carry: &mut Carry,
    mref: usize,
) -> usize {
    // Deposit the carry bits into the previous block (`shift` may be zero).
    let rc = rc + 1 - mref;
    dst[carry.bp] |= ((d << 8) >> carry.shift) as u8;
    d >>= carry.shift;

    if lc != 0 {
        // Write a literal block; two more offset bits ride in its header.
        let cv = (d & 3) << 6;
        d >>= 2;

        if lc < 9 {
            dst[op] = (cv | lc) as u8;
            op += 1;
            dst[op..op + 8].copy_from_slice(&src[ipa..ipa + 8]);
            op += lc;
        } else if lc < 16 {
            dst[op] = (cv | lc) as u8;
            op += 1;
            dst[op..op + 16].copy_from_slice(&src[ipa..ipa + 16]);
            op += lc;
        } else if lc < 16 + 128 {
            dst[op] = cv as u8;
            dst[op + 1] = (lc - 16) as u8;
            op += 2;
            dst[op..op + 32].copy_from_slice(&src[ipa..ipa + 32]);

            if lc < 33 {
                op += lc;
            } else {
                ipa += 32;
                op += 32;
                lc -= 32;
                dst[op..op + lc].copy_from_slice(&src[ipa..ipa + lc]);
                op += lc;
            }
        } else {
            dst[op] = cv as u8;
            op = encode_len(dst, op + 1, lc - 16);
            dst[op..op + lc].copy_from_slice(&src[ipa..ipa + lc]);
            op += lc;
        }
    }

    // Write a reference block.
    let bt = 1 + (d > (1 << 10) - 1) as usize + (d > (1 << 18) - 1) as usize;

    if rc < 16 {
        store32(dst, op, (d << 6 | bt << 4 | rc) as u32);
        op += bt;
        carry.shift = if bt == 3 { 3 } else { 0 };
        carry.bp = op;
        return op + 1;
    }

    store32(dst, op, (d << 6 | bt << 4) as u32);
    op += bt;
    carry.shift = if bt == 3 { 3 } else { 0 };
    carry.bp = op;

    if rc < 16 + 255 {
        dst[op + 1] = (rc - 16) as u8;
        return op + 2;
    }

    dst[op + 1] = 255;
    dst[op + 2] = (rc - 16 - 255) as u8;
    op + 3
}

/// Write the terminal literal-only block. `lc` is not lesser than
/// `LIT_FIN`; no carry bits are reserved.
fn write_fin(dst: &mut [u8], mut op: usize, src: &[u8], ipa: usize, lc: usize) -> usize {
    if lc < 16 {
        dst[op] = lc as u8;
        op += 1;
    } else {
        dst[op] = 0;
        op = encode_len(dst, op + 1, lc - 16);
    }

    dst[op..op + lc].copy_from_slice(&src[ipa..ipa + lc]);
    op + lc
}

/// Returns the maximum length of a default-compressed stream for `srcl`
/// input bytes. Always at least 16.
pub fn compress_bound(srcl: usize) -> usize {
    if srcl == 0 {
        return 16;
    }

    let k = 16 + 127 + 1;
    let l2 = srcl / (k + 6);

    (srcl - l2 * 6 + k - 1) / k * 2 + srcl + 16 - l2
}

/// Returns the maximum length of a high-ratio-compressed stream for
/// `srcl` input bytes. Always at least 16.
pub fn compress_bound_hi(srcl: usize) -> usize {
    if srcl == 0 {
        return 16;
    }

    let l2 = srcl / (16 + 5);

    (srcl - l2 * 5 + 15) / 16 * 2 + srcl + 16 - l2
}

/// Store an input shorter than `SHORT_MAX` as a single literal run,
/// zero-padded to `LIT_FIN` bytes.
fn write_short(dst: &mut [u8], src: &[u8], mref: usize) -> usize {
    dst[0] = FMT_CUR << 4 | mref as u8;
    dst[1] = src.len() as u8;
    dst[2..2 + src.len()].copy_from_slice(src);

    if src.len() >= LIT_FIN {
        return 2 + src.len();
    }

    for b in &mut dst[2 + src.len()..2 + LIT_FIN] {
        *b = 0;
    }

    2 + LIT_FIN
}

#[inline]
fn check_args(srcl: usize, dstl: usize, bound: usize) -> Result<()> {
    if srcl == 0 || srcl > 0x7FFF_FFFF || dstl < bound {
        return Err(Error::Params);
    }

    Ok(())
}

/// Compress `src` with the default compressor.
///
/// Returns the compressed stream in a freshly allocated buffer; an empty
/// input produces an empty buffer.
pub fn compress(src: &[u8]) -> Vec<u8> {
    let mut dst = vec![0u8; compress_bound(src.len())];

    match compress_into(src, &mut dst) {
        Ok(n) => {
            dst.truncate(n);
            dst
        }
        Err(_) => Vec::new(),
    }
}

/// Compress `src` with the high-ratio compressor (slower, better ratio).
///
/// Returns the compressed stream in a freshly allocated buffer; an empty
/// input produces an empty buffer.
pub fn compress_hi(src: &[u8]) -> Vec<u8> {
    let mut dst = vec![0u8; compress_bound_hi(src.len())];

    match compress_hi_into(src, &mut dst) {
        Ok(n) => {
            dst.truncate(n);
            dst
        }
        Err(_) => Vec::new(),
    }
}

/// Compress `src` into a caller-provided buffer with the default
/// compressor and return the compressed length.
///
/// `dst` must hold at least `compress_bound(src.len())` bytes.
pub fn compress_into(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    check_args(src.len(), dst.len(), compress_bound(src.len()))?;

    if src.len() < SHORT_MAX {
        return Ok(write_short(dst, src, REF_MIN));
    }

    let mut htsize = MIN_HTABLE;
    while htsize != MAX_HTABLE && htsize >> 2 < src.len() {
        htsize <<= 1;
    }

    let words = htsize / 4;
    let mut stack_buf = [0u32; STACK_HTABLE / 4];
    let mut heap_buf;

    let ht = if words <= stack_buf.len() {
        &mut stack_buf[..words]
    } else {
        heap_buf = vec![0u32; words];
        heap_buf.as_mut_slice()
    };

    Ok(compress_fmt2(src, dst, ht))
}

/// Compress with a caller-supplied hash-table buffer.
///
/// Reusing one buffer across many calls avoids per-call allocation. The
/// buffer is not read on entry and holds no meaningful state on return.
/// Capacities at or below the internal 16 KiB scratch fall back to it;
/// larger capacities lift the usual 1 MiB table ceiling.
pub fn compress_with_buffer(src: &[u8], dst: &mut [u8], ext: &mut [u32]) -> Result<usize> {
    check_args(src.len(), dst.len(), compress_bound(src.len()))?;

    if src.len() < SHORT_MAX {
        return Ok(write_short(dst, src, REF_MIN));
    }

    let extl = ext.len() * 4;
    let htsizem = if extl > STACK_HTABLE { extl } else { STACK_HTABLE };

    let mut htsize = MIN_HTABLE;
    while htsize >> 2 < src.len() {
        let htsize2 = htsize << 1;

        if htsize2 > htsizem {
            break;
        }

        htsize = htsize2;
    }

    let words = htsize / 4;

    if extl > STACK_HTABLE {
        Ok(compress_fmt2(src, dst, &mut ext[..words]))
    } else {
        let mut stack_buf = [0u32; STACK_HTABLE / 4];
        Ok(compress_fmt2(src, dst, &mut stack_buf[..words]))
    }
}

/// Compress `src` into a caller-provided buffer with the high-ratio
/// compressor and return the compressed length.
///
/// `dst` must hold at least `compress_bound_hi(src.len())` bytes.
pub fn compress_hi_into(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    check_args(src.len(), dst.len(), compress_bound_hi(src.len()))?;

    if src.len() < SHORT_MAX {
        return Ok(write_short(dst, src, REF_MIN_HI));
    }

    let mut htsize = MIN_HTABLE_HI;
    while htsize != MAX_HTABLE_HI && htsize >> 2 < src.len() {
        htsize <<= 1;
    }

    let mut ht = vec![0u32; htsize / 4];

    Ok(compress_hi_fmt2(src, dst, &mut ht))
}

/// Default compressor: greedy match finder over two-tuple hash buckets.
fn compress_fmt2(src: &[u8], dst: &mut [u8], ht: &mut [u32]) -> usize {
    dst[0] = FMT_CUR << 4 | REF_MIN as u8;
    let mut op = 1;

    // The mask keeps bucket addressing on a 16-byte stride.
    let hmask = ((ht.len() * 4 - 1) ^ 15) as u32;
    let ipe = src.len() - LIT_FIN;
    let ipet = ipe - 9; // Hashing threshold, avoids reads past the source.
    let mut ipa = 0; // Literals anchor.

    // Skip the first bytes so back-extension never reaches before the
    // source; the table is seeded to the same position.
    let mut ip = 16;

    let mut carry = Carry { bp: op, shift: 0 };
    let mut mavg: i64 = 100 << 21; // Running average of the match rate.
    let mut rndb: usize = 0; // PRNG bit derived from non-matching offsets.

    // Each bucket holds 2 tuples of (4 initial match bytes, offset).
    let iw = if ip < ipet { load32(src, 16) } else { 0 };
    for pair in ht.chunks_exact_mut(2) {
        pair[0] = iw;
        pair[1] = 16;
    }

    while ip < ipet {
        // Hash built on the "komihash" multiply-fold construct.
        let iw1 = load32(src, ip);
        let iw2 = load16(src, ip + 4);
        let seed1 = 0x243F_6A88u32 ^ iw1;
        let hm = (seed1 as u64).wrapping_mul((0x85A3_08D3u32 ^ iw2 as u32) as u64);
        let hval = (hm as u32) ^ ((hm >> 32) as u32);

        let hp = ((hval & hmask) >> 2) as usize;
        let ipo = ip as u32;
        let hw1 = ht[hp];

        // Find the position in the bucket tuples, confirming 6 bytes.
        let found = if iw1 == hw1 {
            let wp = ht[hp + 1] as usize;

            if iw2 == load16(src, wp + 4) {
                Some(wp)
            } else if iw1 == ht[hp + 2] {
                let wp = ht[hp + 3] as usize;
                if iw2 == load16(src, wp + 4) {
                    Some(wp)
                } else {
                    None
                }
            } else {
                None
            }
        } else if iw1 == ht[hp + 2] {
            let wp = ht[hp + 3] as usize;
            if iw2 == load16(src, wp + 4) {
                Some(wp)
            } else {
                None
            }
        } else {
            None
        };

        let wp = match found {
            Some(wp) => wp,
            None => {
                ht[hp + 2] = iw1;
                ht[hp + 3] = ipo;

                mavg -= mavg >> 11;

                if mavg < (200 << 14) && ip != ipa {
                    // Keeps the number of hash evaluations around 45% of
                    // the compressed length on sparse data.
                    ip += 1 + rndb; // Dither match positions.
                    rndb = (ipo & 1) as usize; // Delayed to decorrelate.

                    if mavg < (130 << 14) {
                        ip += 1;

                        if mavg < (100 << 14) {
                            ip += (100 - (mavg >> 14)) as usize; // Gradually faster.
                        }
                    }
                }

                ip += 1;
                continue;
            }
        };

        let d = ip - wp;

        if d < 8 || d >= WIN_LEN {
            // Small offsets are inefficient to encode.
            ip += 1;

            if d >= WIN_LEN {
                ht[hp + 1 + (iw1 != hw1) as usize * 2] = ipo;
            }

            continue;
        }

        // Disallow reference copy overlap by using `d` as the max length.
        let mut ml = if d > REF_LEN { REF_LEN } else { d };

        if ip + ml > ipe {
            // Make sure `LIT_FIN` literals remain at the finish.
            ml = ipe - ip;
        }

        if d > 273 {
            // Refresh an entry outside the max reference range; otherwise
            // same-byte runs would stop compressing.
            if iw1 == hw1 {
                ht[hp + 1] = ipo;
            } else {
                ht[hp + 2] = hw1;
                ht[hp + 3] = ht[hp + 1];
                ht[hp] = iw1;
                ht[hp + 1] = ipo;
            }
        }

        let mut rc = REF_MIN + match_len(src, ip + REF_MIN, wp + REF_MIN, ml - REF_MIN);
        let mut lc = ip - ipa;

        if lc != 0 {
            // Try to consume literals with a match at a back-position.
            let mut bml = ml - rc;
            let cap = if lc > 16 { 16 } else { lc };

            if bml > cap {
                bml = cap;
            }

            let bmc = match_len_r(src, ip, wp, bml);

            if bmc != 0 {
                rc += bmc;
                ip -= bmc;
                lc -= bmc;
            }
        }

        op = write_block(dst, op, lc, rc, d, src, ipa, &mut carry, REF_MIN);
        ip += rc;
        ipa = ip;
        mavg += (((rc as i64) << 21) - mavg) >> 10;
    }

    write_fin(dst, op, src, ipa, ipe - ipa + LIT_FIN)
}

/// High-ratio compressor: multi-way buckets with a one-step lazy match.
fn compress_hi_fmt2(src: &[u8], dst: &mut [u8], ht: &mut [u32]) -> usize {
    dst[0] = FMT_CUR << 4 | REF_MIN_HI as u8;
    let mut op = 1;

    let mlen = REF_LEN - REF_MIN + REF_MIN_HI;
    // The mask keeps bucket addressing on a 64-byte stride.
    let hmask = ((ht.len() * 4 - 1) ^ 63) as u32;
    let ipe = src.len() - LIT_FIN;
    let ipet = ipe - 9;
    let mut ip = 0;
    let mut ipa = 0;

    let mut carry = Carry { bp: op, shift: 0 };

    // Each bucket holds 7 live tuples; the last word of the 8th pair is
    // the head tuple offset (an even value).
    let iw = load32(src, 0);
    for pair in ht.chunks_exact_mut(2) {
        pair[0] = iw;
        pair[1] = 0;
    }

    let mut prc = 0; // Length of a previously found match.
    let mut pd = 0; // Distance of a previously found match.
    let mut pip = 0; // Source position of a previously found match.

    while ip < ipet {
        let iw1 = load32(src, ip);
        let hm = ((0x243F_6A88u32 ^ iw1) as u64)
            .wrapping_mul((0x85A3_08D3u32 ^ src[ip + 4] as u32) as u64);
        let hval = (hm as u32) ^ ((hm >> 32) as u32);

        let hp = ((hval & hmask) >> 2) as usize;
        let ipo = ip as u32;
        let ti0 = ht[hp + 15] as usize;

        // Probe up to 7 previous positions, keeping the best match. A
        // longer match only displaces a shorter one across the 18-bit
        // offset boundary if it saves the extra header byte.
        let mut wp = ip;
        let mut rc = 0;
        let mut ti = ti0;

        for _ in 0..7 {
            let ww1 = ht[hp + ti];
            let wp0 = ht[hp + ti + 1] as usize;
            let d0 = ip - wp0;
            ti = if ti == 12 { 0 } else { ti + 2 };

            if iw1 == ww1 {
                let mut ml = if d0 > mlen { mlen } else { d0 };

                if ip + ml > ipe {
                    ml = ipe - ip;
                }

                let rc0 = 4 + match_len(src, ip + 4, wp0 + 4, ml.saturating_sub(4));

                if rc0 > rc + (d0 > (1 << 18)) as usize {
                    wp = wp0;
                    rc = rc0;
                }
            }
        }

        let mut d = ip - wp;

        if rc == 0 || d > 273 {
            // Install at the rotated head slot so same-byte runs keep a
            // nearby candidate.
            let ti0 = if ti0 == 0 { 12 } else { ti0 - 2 };
            ht[hp + ti0] = iw1;
            ht[hp + ti0 + 1] = ipo;
            ht[hp + 15] = ti0 as u32;
        }

        if rc < REF_MIN_HI + (d > (1 << 18)) as usize || d < 8 || d >= WIN_LEN {
            ip += 1;
            continue;
        }

        // A match of suitable length was found.
        let ip0 = ip;
        let mut lc = ip - ipa;

        if lc != 0 {
            // Try to consume literals with a match at a back-position,
            // additionally clamped so it cannot reach before the source.
            let mut ml = if d > mlen { mlen } else { d };

            if ip + ml > ipe {
                ml = ipe - ip;
            }

            ml -= rc;

            if ml > lc {
                ml = lc;
            }

            if ml > wp {
                ml = wp;
            }

            let bmc = match_len_r(src, ip, wp, ml);

            if bmc != 0 {
                rc += bmc;
                ip -= bmc;
                lc -= bmc;
            }
        }

        if prc == 0 {
            // Hold the match for a lazy comparison at the next position.
            prc = rc;
            pd = d;
            pip = ip;
            ip = ip0 + 1;
            continue;
        }

        // Estimated encoded sizes of the competing blocks.
        let lb = (lc != 0) as usize;
        let sh0 = 10 + (carry.shift != 0) as usize * 3;
        let sh = sh0 + lb * 2;
        let ov = lc
            + lb
            + (lc > 15) as usize
            + 2
            + (d >= (1 << sh)) as usize
            + (d >= (1 << (sh + 8))) as usize;

        let plc = pip - ipa;
        let plb = (plc != 0) as usize;
        let psh = sh0 + plb * 2;
        let pov = plc
            + plb
            + (plc > 15) as usize
            + 2
            + (pd >= (1 << psh)) as usize
            + (pd >= (1 << (psh + 8))) as usize;

        if prc * ov > rc * pov {
            if pip + prc <= ip {
                // The winning previous match does not overlap the current
                // one: emit it and keep the current match pending.
                op = write_block(dst, op, plc, prc, pd, src, ipa, &mut carry, REF_MIN_HI);
                ipa = pip + prc;
                prc = rc;
                pd = d;
                pip = ip;
                ip += 1;
                continue;
            }

            rc = prc;
            d = pd;
            ip = pip;
            lc = plc;
        }

        op = write_block(dst, op, lc, rc, d, src, ipa, &mut carry, REF_MIN_HI);
        ip += rc;
        ipa = ip;
        prc = 0;
    }

    if prc != 0 {
        op = write_block(dst, op, pip - ipa, prc, pd, src, ipa, &mut carry, REF_MIN_HI);
        ipa = pip + prc;
    }

    write_fin(dst, op, src, ipa, ipe - ipa + LIT_FIN)
}
