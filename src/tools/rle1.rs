//! RLE1: the byte-level run-length pass applied before the block sort.
//!
//! Runs of 4 to 259 identical bytes become the byte four times followed by
//! a count byte (0-255) for the extras. Runs of 1 to 3 pass through
//! untouched. This exists to tame the sorter's worst case on long runs;
//! runs never continue across a block boundary.

/// Longest run one (4 literals + count) unit can carry.
pub const MAX_RUN: u32 = 256 + 3;

/// Append one run of `len` copies of `byte` in encoded form. The caller
/// accumulates runs and guarantees `1 <= len <= 259`.
pub fn rle1_encode_run(out: &mut Vec<u8>, byte: u8, len: u32) {
    debug_assert!(len >= 1 && len <= MAX_RUN);
    for _ in 0..len.min(4) {
        out.push(byte);
    }
    if len >= 4 {
        out.push((len - 4) as u8);
    }
}

/// Number of encoded bytes a run of `len` will occupy.
pub fn rle1_encoded_len(len: u32) -> usize {
    if len < 4 {
        len as usize
    } else {
        5
    }
}

/// One step of RLE1 expansion.
pub enum Expanded {
    /// A literal byte of output.
    One(u8),
    /// A decoded count byte: emit the carried byte that many more times
    /// (possibly zero times, for a run of exactly four).
    Run(u8, u32),
}

/// Streaming RLE1 expander. Feed it decoded block bytes one at a time;
/// after four identical literals the next byte is consumed as a repeat
/// count rather than emitted.
pub struct Rle1Expander {
    /// Last literal seen; 0x100 means "nothing yet" so it can never match.
    last: u16,
    run: u32,
}

impl Rle1Expander {
    pub fn new() -> Self {
        Self { last: 0x100, run: 0 }
    }

    pub fn push(&mut self, byte: u8) -> Expanded {
        if self.run == 4 {
            let repeat = self.last as u8;
            self.last = 0x100;
            self.run = 0;
            return Expanded::Run(repeat, byte as u32);
        }
        if byte as u16 == self.last {
            self.run += 1;
        } else {
            self.last = byte as u16;
            self.run = 1;
        }
        Expanded::One(byte)
    }
}

impl Default for Rle1Expander {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn expand(encoded: &[u8]) -> Vec<u8> {
        let mut exp = Rle1Expander::new();
        let mut out = Vec::new();
        for &b in encoded {
            match exp.push(b) {
                Expanded::One(b) => out.push(b),
                Expanded::Run(b, n) => out.extend(std::iter::repeat(b).take(n as usize)),
            }
        }
        out
    }

    #[test]
    fn short_runs_pass_through() {
        let mut out = Vec::new();
        rle1_encode_run(&mut out, b'a', 3);
        rle1_encode_run(&mut out, b'b', 1);
        assert_eq!(out, b"aaab");
    }

    #[test]
    fn run_of_twenty() {
        let mut out = Vec::new();
        rle1_encode_run(&mut out, b'a', 20);
        assert_eq!(out, [b'a', b'a', b'a', b'a', 16]);
        assert_eq!(expand(&out), vec![b'a'; 20]);
    }

    #[test]
    fn run_of_exactly_four_gets_zero_count() {
        let mut out = Vec::new();
        rle1_encode_run(&mut out, b'x', 4);
        assert_eq!(out, [b'x', b'x', b'x', b'x', 0]);
        assert_eq!(expand(&out), vec![b'x'; 4]);
    }

    #[test]
    fn max_run() {
        let mut out = Vec::new();
        rle1_encode_run(&mut out, 0, MAX_RUN);
        assert_eq!(out, [0, 0, 0, 0, 255]);
        assert_eq!(expand(&out), vec![0; 259]);
    }

    #[test]
    fn expander_resets_after_run() {
        // 4 a's + count 1, then 4 more a's + count 0. The literal after a
        // count byte starts a fresh run even if it matches.
        let encoded = [b'a', b'a', b'a', b'a', 1, b'a', b'a', b'a', b'a', 0];
        assert_eq!(expand(&encoded), vec![b'a'; 9]);
    }

    #[test]
    fn encoded_len_matches() {
        for len in 1..=MAX_RUN {
            let mut out = Vec::new();
            rle1_encode_run(&mut out, b'q', len);
            assert_eq!(out.len(), rle1_encoded_len(len));
        }
    }
}
