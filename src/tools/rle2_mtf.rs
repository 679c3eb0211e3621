//! MTF and RLE2: move-to-front coding of the sorted block with zero runs
//! re-coded in bijective base 2.
//!
//! After the block sort the data is full of repeated bytes, which MTF turns
//! into mostly zeros. Index 0 is never emitted directly; runs of it become
//! sequences of RUNA/RUNB, each standing for 1 or 2 times a doubling place
//! value. Every other MTF index j is emitted as symbol j+1, and a dedicated
//! EOB symbol closes the block, so the coded alphabet holds nInUse + 2
//! symbols (at most 258).

use crate::error::BzError;
use crate::tools::symbol_map::encode_sym_map;

/// Zero-run symbols. RUNA carries 1x the place value, RUNB 2x.
pub const RUNA: u16 = 0;
pub const RUNB: u16 = 1;

/// Largest possible coded alphabet: 256 byte symbols + RUNB + EOB.
pub const MAX_ALPHA_SIZE: usize = 258;

/// Output of the MTF/RLE2 stage, everything the statistical coder needs.
pub struct Rle2Block {
    /// The coded symbol stream, EOB included as the final symbol.
    pub rle2: Vec<u16>,
    /// Frequency of every symbol in `rle2`, indexed by symbol value.
    pub freqs: [u32; MAX_ALPHA_SIZE],
    /// In-use bitmap words for the container header.
    pub sym_map: Vec<u16>,
    /// The end-of-block symbol, nInUse + 1.
    pub eob: u16,
}

fn flush_zeros(rle2: &mut Vec<u16>, freqs: &mut [u32; MAX_ALPHA_SIZE], zeros: &mut u32) {
    let mut n = *zeros - 1;
    loop {
        let sym = n as u16 & 1;
        rle2.push(sym);
        freqs[sym as usize] += 1;
        if n < 2 {
            break;
        }
        n = (n - 2) >> 1;
    }
    *zeros = 0;
}

/// MTF + zero-run encode one sorted block.
pub fn rle2_mtf_encode(data: &[u8]) -> Rle2Block {
    let mut used = [false; 256];
    for &b in data {
        used[b as usize] = true;
    }
    let sym_map = encode_sym_map(&used);

    // The MTF list starts as the used bytes in ascending order.
    let mut mtf: Vec<u8> = (0..=255_u8).filter(|&b| used[b as usize]).collect();
    let eob = (mtf.len() + 1) as u16;

    let mut rle2 = Vec::with_capacity(data.len() + 1);
    let mut freqs = [0u32; MAX_ALPHA_SIZE];
    let mut zeros = 0u32;

    for &b in data {
        // The byte is always present in the list, by construction.
        let idx = mtf.iter().position(|&x| x == b).unwrap();
        if idx == 0 {
            zeros += 1;
            continue;
        }
        if zeros > 0 {
            flush_zeros(&mut rle2, &mut freqs, &mut zeros);
        }
        mtf.copy_within(0..idx, 1);
        mtf[0] = b;
        let sym = (idx + 1) as u16;
        rle2.push(sym);
        freqs[sym as usize] += 1;
    }
    if zeros > 0 {
        flush_zeros(&mut rle2, &mut freqs, &mut zeros);
    }
    rle2.push(eob);
    freqs[eob as usize] += 1;

    Rle2Block {
        rle2,
        freqs,
        sym_map,
        eob,
    }
}

/// Invert the MTF + zero-run coding. `rle2` is the decoded symbol stream
/// without its EOB; `symbol_set` is the sorted in-use byte list from the
/// symbol map. Returns the block bytes and the per-byte counts the inverse
/// transform needs. `capacity` bounds the expanded size; corrupt streams
/// that overrun it are rejected rather than allocated for.
pub fn rle2_mtf_decode(
    rle2: &[u16],
    symbol_set: &[u8],
    capacity: usize,
) -> Result<(Vec<u8>, [u32; 256]), BzError> {
    let mut mtf = symbol_set.to_vec();
    let mut out: Vec<u8> = Vec::with_capacity(capacity.min(1024 * 1024));
    let mut unzftab = [0u32; 256];
    let mut zeros = 0usize;
    let mut mult = 1usize;

    for &sym in rle2 {
        match sym {
            RUNA => {
                zeros += mult;
                mult <<= 1;
            }
            RUNB => {
                zeros += mult << 1;
                mult <<= 1;
            }
            n => {
                if zeros > 0 {
                    if out.len() + zeros > capacity {
                        return Err(BzError::InternalConsistency("zero run overflows block"));
                    }
                    let b = mtf[0];
                    unzftab[b as usize] += zeros as u32;
                    out.resize(out.len() + zeros, b);
                    zeros = 0;
                    mult = 1;
                }
                let idx = n as usize - 1;
                if idx >= mtf.len() {
                    return Err(BzError::InternalConsistency("mtf index out of range"));
                }
                if out.len() >= capacity {
                    return Err(BzError::InternalConsistency("block overflows its size"));
                }
                let b = mtf[idx];
                mtf.copy_within(0..idx, 1);
                mtf[0] = b;
                unzftab[b as usize] += 1;
                out.push(b);
            }
        }
        // A long enough RUNA/RUNB sequence can claim an absurd expansion
        // long before a data symbol flushes it. Cut it off early.
        if zeros > capacity {
            return Err(BzError::InternalConsistency("zero run overflows block"));
        }
    }
    if zeros > 0 {
        if out.len() + zeros > capacity {
            return Err(BzError::InternalConsistency("zero run overflows block"));
        }
        let b = mtf[0];
        unzftab[b as usize] += zeros as u32;
        out.resize(out.len() + zeros, b);
    }
    Ok((out, unzftab))
}
