//! The adaptive multi-table Huffman stage.
//!
//! `lengths` turns accumulated frequencies into length-limited code
//! lengths, `encode` runs the table competition and serializes a block's
//! coded symbols, and `decode` rebuilds canonical decoding tables from the
//! lengths the stream carries.

pub mod decode;
pub mod encode;
pub mod lengths;

pub use decode::HuffmanTable;
pub use encode::{huf_encode, GROUP_SIZE};

#[cfg(test)]
mod test {
    use super::*;
    use crate::bitstream::{BitReader, BitWriter};
    use crate::huffman::lengths::code_lengths_from_weights;

    #[test]
    fn canonical_codes_roundtrip_through_decoder() {
        // Lengths from a skewed frequency profile, canonical codes the way
        // the encoder assigns them, decoded back by the table machinery.
        let freqs: Vec<u32> = (0..24u32).map(|i| 1 + i * i * 3).collect();
        let mut lengths = vec![0u32; 24];
        code_lengths_from_weights(&mut lengths, &freqs, 24);

        let mut len_sym: Vec<(u32, u16)> = lengths
            .iter()
            .enumerate()
            .map(|(sym, &len)| (len, sym as u16))
            .collect();
        len_sym.sort_unstable();
        let mut codes = vec![0u32; 24];
        let mut next_code: (u32, u32) = (len_sym[0].0, 0);
        for &(len, sym) in &len_sym {
            if len != next_code.0 {
                next_code.1 <<= len - next_code.0;
                next_code.0 = len;
            }
            codes[sym as usize] = (len << 24) | next_code.1;
            next_code.1 += 1;
        }

        let symbols: Vec<u16> = (0..240).map(|i| (i * 7 % 24) as u16).collect();
        let mut bw = BitWriter::new(Vec::new());
        for &s in &symbols {
            bw.out24(codes[s as usize]);
        }
        bw.finish().unwrap();
        let data = bw.into_inner();

        let len_bytes: Vec<u8> = lengths.iter().map(|&l| l as u8).collect();
        let table = HuffmanTable::new(&len_bytes).unwrap();
        let mut br = BitReader::new(data.as_slice());
        for &expect in &symbols {
            assert_eq!(table.decode_symbol(&mut br).unwrap(), expect);
        }
    }
}
