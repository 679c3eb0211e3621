//! Canonical Huffman decoding tables.
//!
//! The stream only carries code lengths; lengths plus the canonical
//! assignment rule determine every code. Per table the decoder builds
//! three arrays: `limit[l]` is the largest code value of length l, `base`
//! turns a code of length l into a rank, and `perm` maps rank to symbol.
//! Decoding pulls `min_len` bits and then one bit at a time until the
//! value falls under the current length's limit.

use crate::bitstream::BitReader;
use crate::error::BzError;
use crate::huffman::lengths::MAX_CODE_LEN;

const LEN_SLOTS: usize = MAX_CODE_LEN as usize + 2;

pub struct HuffmanTable {
    limit: [i32; LEN_SLOTS],
    base: [i32; LEN_SLOTS],
    perm: Vec<u16>,
    min_len: usize,
    max_len: usize,
}

impl HuffmanTable {
    /// Build the decode arrays from per-symbol code lengths. The caller
    /// has already validated every length to be 1..=20.
    pub fn new(lengths: &[u8]) -> Result<Self, BzError> {
        let min_len = *lengths.iter().min().unwrap_or(&1) as usize;
        let max_len = *lengths.iter().max().unwrap_or(&1) as usize;
        if max_len > MAX_CODE_LEN as usize {
            return Err(BzError::InternalConsistency("code length exceeds maximum"));
        }

        let mut perm = Vec::with_capacity(lengths.len());
        for l in min_len..=max_len {
            for (sym, &len) in lengths.iter().enumerate() {
                if len as usize == l {
                    perm.push(sym as u16);
                }
            }
        }

        let mut base = [0i32; LEN_SLOTS];
        for &len in lengths {
            base[len as usize + 1] += 1;
        }
        for i in 1..LEN_SLOTS {
            base[i] += base[i - 1];
        }

        let mut limit = [0i32; LEN_SLOTS];
        let mut vec = 0i32;
        for i in min_len..=max_len {
            vec += base[i + 1] - base[i];
            limit[i] = vec - 1;
            vec <<= 1;
        }
        for i in min_len + 1..=max_len {
            base[i] = ((limit[i - 1] + 1) << 1) - base[i];
        }

        Ok(Self {
            limit,
            base,
            perm,
            min_len,
            max_len,
        })
    }

    /// Pull one symbol off the bitstream.
    pub fn decode_symbol<R: std::io::Read>(
        &self,
        br: &mut BitReader<R>,
    ) -> Result<u16, BzError> {
        let mut zn = self.min_len;
        let mut zvec = br.bint(zn)? as i32;
        while zvec > self.limit[zn] {
            zn += 1;
            if zn > self.max_len {
                return Err(BzError::InternalConsistency("code overruns table depth"));
            }
            zvec = (zvec << 1) | br.bint(1)? as i32;
        }
        let idx = zvec - self.base[zn];
        if idx < 0 || idx as usize >= self.perm.len() {
            return Err(BzError::InternalConsistency("decoded rank out of range"));
        }
        Ok(self.perm[idx as usize])
    }
}
