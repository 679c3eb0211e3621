//! The decompression side of the container: a `Read` source that parses
//! the stream header, then pulls decompressed bytes through the inverse
//! pipeline one block at a time.
//!
//! Parsing is strict. Anything that is not a well-formed block boundary,
//! a valid table description, or a matching checksum is an error; there is
//! no tolerance for trailing garbage dressed up as an end marker.

use std::io::Read;

use log::{debug, info};

use crate::bitstream::BitReader;
use crate::bwt::UnBwt;
use crate::error::BzError;
use crate::huffman::lengths::MAX_CODE_LEN;
use crate::huffman::{HuffmanTable, GROUP_SIZE};
use crate::tools::crc::{do_crc_byte, do_stream_crc};
use crate::tools::rle1::{Expanded, Rle1Expander};
use crate::tools::rle2_mtf::rle2_mtf_decode;
use crate::tools::symbol_map::decode_sym_map;

use super::writer::BLOCK_UNIT;

const BLOCK_MAGIC_HI: u32 = 0x314159;
const BLOCK_MAGIC_LO: u32 = 0x265359;
const END_MAGIC_HI: u32 = 0x177245;
const END_MAGIC_LO: u32 = 0x385090;

/// Decompresses a bzip2 container from any `Read` source.
pub struct BzReader<R: Read> {
    br: BitReader<R>,
    block_size: u32,
    stream_crc: u32,
    blocks_decoded: u32,
    state: State,
}

enum State {
    Header,
    BetweenBlocks,
    InBlock(BlockDecoder),
    Done,
}

/// One block mid-expansion: the lazy inverse transform walk plus the RLE1
/// expander and the running CRC over emitted bytes.
struct BlockDecoder {
    unbwt: UnBwt,
    rle1: Rle1Expander,
    /// A decoded repeat still being paid out: byte and copies left.
    pending: Option<(u8, u32)>,
    crc: u32,
    expected_crc: u32,
}

impl<R: Read> BzReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            br: BitReader::new(source),
            block_size: 0,
            stream_crc: 0,
            blocks_decoded: 0,
            state: State::Header,
        }
    }

    pub fn blocks_decoded(&self) -> u32 {
        self.blocks_decoded
    }

    fn read_header(&mut self) -> Result<(), BzError> {
        let magic = self.br.bytes(3)?;
        if magic != b"BZh" {
            return Err(BzError::InvalidHeader);
        }
        let digit = self.br.byte()?;
        if !(b'1'..=b'9').contains(&digit) {
            return Err(BzError::InvalidHeader);
        }
        self.block_size = (digit - b'0') as u32;
        info!("bzip2 stream, {}00k block size", self.block_size);
        Ok(())
    }

    /// Parse one block's metadata and coded symbols, and stand up the lazy
    /// expansion pipeline for its bytes.
    fn read_block_setup(&mut self) -> Result<BlockDecoder, BzError> {
        let expected_crc = self.br.bint(32)?;
        let randomized = self.br.bool_bit()?;
        let key = self.br.bint(24)?;
        let capacity = self.block_size as usize * BLOCK_UNIT;
        if key as usize > capacity + 10 {
            return Err(BzError::InternalConsistency("origin pointer beyond block"));
        }

        let index = self.br.bint(16)? as u16;
        let mut map_words = Vec::with_capacity(17);
        map_words.push(index);
        for _ in 0..index.count_ones() {
            map_words.push(self.br.bint(16)? as u16);
        }
        let symbol_set = decode_sym_map(&map_words);
        if symbol_set.is_empty() {
            return Err(BzError::InternalConsistency("empty symbol map"));
        }
        let alpha_size = symbol_set.len() + 2;
        let eob = (symbol_set.len() + 1) as u16;

        let table_count = self.br.bint(3)? as usize;
        if !(2..=6).contains(&table_count) {
            return Err(BzError::InternalConsistency("invalid table count"));
        }
        let selector_count = self.br.bint(15)? as usize;
        if selector_count == 0 {
            return Err(BzError::InternalConsistency("no selectors"));
        }

        // Selectors: unary indices into a move-to-front list of tables.
        let mut table_idx: Vec<usize> = (0..table_count).collect();
        let mut selectors = Vec::with_capacity(selector_count);
        for _ in 0..selector_count {
            let mut j = 0;
            while self.br.bool_bit()? {
                j += 1;
                if j >= table_count {
                    return Err(BzError::InternalConsistency("selector out of range"));
                }
            }
            let t = table_idx.remove(j);
            table_idx.insert(0, t);
            selectors.push(t);
        }

        // Code lengths per table: 5-bit origin, then per symbol a walk of
        // +-1 deltas, each `10` up, `11` down, `0` stop.
        let mut tables = Vec::with_capacity(table_count);
        for _ in 0..table_count {
            let mut len = self.br.bint(5)? as i32;
            let mut lengths = Vec::with_capacity(alpha_size);
            for _ in 0..alpha_size {
                loop {
                    if !(1..=MAX_CODE_LEN as i32).contains(&len) {
                        return Err(BzError::InternalConsistency("code length out of range"));
                    }
                    if !self.br.bool_bit()? {
                        break;
                    }
                    if self.br.bool_bit()? {
                        len -= 1;
                    } else {
                        len += 1;
                    }
                }
                lengths.push(len as u8);
            }
            tables.push(HuffmanTable::new(&lengths)?);
        }

        // The coded symbol stream, in selector groups of 50, up to EOB.
        let mut rle2: Vec<u16> = Vec::new();
        let mut table = &tables[selectors[0]];
        let mut sel_idx = 1;
        let mut remaining_in_group = GROUP_SIZE;
        loop {
            if remaining_in_group == 0 {
                let &t = selectors
                    .get(sel_idx)
                    .ok_or(BzError::InternalConsistency("selectors exhausted"))?;
                table = &tables[t];
                sel_idx += 1;
                remaining_in_group = GROUP_SIZE;
            }
            remaining_in_group -= 1;
            let sym = table.decode_symbol(&mut self.br)?;
            if sym == eob {
                break;
            }
            rle2.push(sym);
            if rle2.len() > capacity {
                return Err(BzError::InternalConsistency("symbol stream overruns block"));
            }
        }

        let (ll8, unzftab) = rle2_mtf_decode(&rle2, &symbol_set, capacity)?;
        debug!(
            "block {}: {} symbols, {} rle1 bytes, randomized {}",
            self.blocks_decoded + 1,
            rle2.len(),
            ll8.len(),
            randomized
        );
        let unbwt = UnBwt::new(key, ll8, &unzftab, randomized)?;
        Ok(BlockDecoder {
            unbwt,
            rle1: Rle1Expander::new(),
            pending: None,
            crc: 0,
            expected_crc,
        })
    }

    /// Next decompressed byte, or None at the (verified) end of stream.
    pub fn read_byte(&mut self) -> Result<Option<u8>, BzError> {
        loop {
            match self.state {
                State::Header => {
                    self.read_header()?;
                    self.state = State::BetweenBlocks;
                }
                State::BetweenBlocks => {
                    let hi = self.br.bint(24)?;
                    let lo = self.br.bint(24)?;
                    if hi == BLOCK_MAGIC_HI && lo == BLOCK_MAGIC_LO {
                        let decoder = self.read_block_setup()?;
                        self.state = State::InBlock(decoder);
                    } else if hi == END_MAGIC_HI && lo == END_MAGIC_LO {
                        let stored = self.br.bint(32)?;
                        if stored != self.stream_crc {
                            return Err(BzError::CrcMismatch {
                                stored,
                                computed: self.stream_crc,
                            });
                        }
                        debug!(
                            "end of stream, {} blocks, combined crc {:#010x}",
                            self.blocks_decoded, stored
                        );
                        self.state = State::Done;
                    } else {
                        return Err(BzError::InvalidBlockHeader);
                    }
                }
                State::InBlock(ref mut dec) => {
                    if let Some((byte, left)) = dec.pending.as_mut() {
                        if *left > 0 {
                            *left -= 1;
                            let b = *byte;
                            dec.crc = do_crc_byte(dec.crc, b);
                            return Ok(Some(b));
                        }
                        dec.pending = None;
                    }
                    match dec.unbwt.next_byte() {
                        Some(raw) => match dec.rle1.push(raw) {
                            Expanded::One(b) => {
                                dec.crc = do_crc_byte(dec.crc, b);
                                return Ok(Some(b));
                            }
                            Expanded::Run(b, n) => {
                                dec.pending = Some((b, n));
                            }
                        },
                        None => {
                            let computed = dec.crc;
                            let expected = dec.expected_crc;
                            if computed != expected {
                                return Err(BzError::CrcMismatch {
                                    stored: expected,
                                    computed,
                                });
                            }
                            self.stream_crc = do_stream_crc(self.stream_crc, computed);
                            self.blocks_decoded += 1;
                            self.state = State::BetweenBlocks;
                        }
                    }
                }
                State::Done => return Ok(None),
            }
        }
    }
}

impl<R: Read> Read for BzReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut count = 0;
        while count < buf.len() {
            match self.read_byte()? {
                Some(b) => {
                    buf[count] = b;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_garbage_header() {
        let mut r = BzReader::new([0u8; 16].as_slice());
        assert!(matches!(r.read_byte(), Err(BzError::InvalidHeader)));
    }

    #[test]
    fn rejects_block_size_zero() {
        let mut r = BzReader::new(b"BZh0whatever".as_slice());
        assert!(matches!(r.read_byte(), Err(BzError::InvalidHeader)));
    }

    #[test]
    fn rejects_bad_block_magic() {
        let mut data = b"BZh9".to_vec();
        data.extend_from_slice(&[0xAA; 8]);
        let mut r = BzReader::new(data.as_slice());
        assert!(matches!(r.read_byte(), Err(BzError::InvalidBlockHeader)));
    }

    #[test]
    fn truncated_header_is_eof() {
        let mut r = BzReader::new(b"BZ".as_slice());
        assert!(matches!(
            r.read_byte(),
            Err(BzError::UnexpectedEndOfStream)
        ));
    }
}
