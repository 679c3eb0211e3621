//! Inverse Burrows-Wheeler transform, one pulled byte at a time.
//!
//! Reconstruction needs one pass to build the successor table, then walks
//! it lazily; nothing downstream ever needs the whole block in output
//! order, so no second buffer is allocated.

use crate::bwt::rand::Randomizer;
use crate::error::BzError;

pub struct UnBwt {
    /// tt[i] holds the row that sorts immediately after following the
    /// first-column/last-column correspondence from row i.
    tt: Vec<u32>,
    /// The last column as decoded from the stream.
    ll8: Vec<u8>,
    t_pos: u32,
    remaining: usize,
    rand: Option<Randomizer>,
}

impl UnBwt {
    /// `key` is the stored origin pointer, `unzftab` the per-byte counts of
    /// `ll8`. `randomized` strips the legacy scramble while walking.
    pub fn new(
        key: u32,
        ll8: Vec<u8>,
        unzftab: &[u32; 256],
        randomized: bool,
    ) -> Result<Self, BzError> {
        let n = ll8.len();
        if n == 0 {
            return Ok(Self {
                tt: Vec::new(),
                ll8,
                t_pos: 0,
                remaining: 0,
                rand: None,
            });
        }
        if key as usize >= n {
            return Err(BzError::InternalConsistency("origin pointer out of range"));
        }

        // cftab[c] = number of bytes smaller than c, then bumped into a
        // running cursor as the successor table fills.
        let mut cftab = [0u32; 257];
        for (c, &count) in unzftab.iter().enumerate() {
            cftab[c + 1] = count;
        }
        for c in 1..=256 {
            cftab[c] += cftab[c - 1];
        }

        let mut tt = vec![0u32; n];
        for (i, &b) in ll8.iter().enumerate() {
            let c = b as usize;
            tt[cftab[c] as usize] = i as u32;
            cftab[c] += 1;
        }

        let t_pos = tt[key as usize];
        Ok(Self {
            tt,
            ll8,
            t_pos,
            remaining: n,
            rand: randomized.then(Randomizer::new),
        })
    }

    /// Next byte of the reconstructed block, or None when it is exhausted.
    pub fn next_byte(&mut self) -> Option<u8> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let mut b = self.ll8[self.t_pos as usize];
        self.t_pos = self.tt[self.t_pos as usize];
        if let Some(r) = self.rand.as_mut() {
            b ^= r.next_mask();
        }
        Some(b)
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn counts(data: &[u8]) -> [u32; 256] {
        let mut c = [0u32; 256];
        for &b in data {
            c[b as usize] += 1;
        }
        c
    }

    #[test]
    fn banana_inverse() {
        let ll8 = b"nnbaaa".to_vec();
        let mut u = UnBwt::new(3, ll8.clone(), &counts(&ll8), false).unwrap();
        let out: Vec<u8> = std::iter::from_fn(|| u.next_byte()).collect();
        assert_eq!(out, b"banana");
        assert!(u.next_byte().is_none());
    }

    #[test]
    fn rejects_out_of_range_key() {
        let ll8 = b"ab".to_vec();
        assert!(UnBwt::new(2, ll8.clone(), &counts(&ll8), false).is_err());
    }

    #[test]
    fn empty_block() {
        let mut u = UnBwt::new(0, Vec::new(), &[0; 256], false).unwrap();
        assert!(u.next_byte().is_none());
    }
}
