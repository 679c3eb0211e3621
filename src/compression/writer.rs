//! The compression side of the container: a `Write` sink that RLE1-packs
//! incoming bytes into blocks and emits each block through the transform
//! pipeline as it fills.

use std::io::Write;

use log::{debug, info};

use crate::bitstream::BitWriter;
use crate::bwt::bwt_encode;
use crate::error::BzError;
use crate::huffman::huf_encode;
use crate::tools::crc::{do_crc_byte, do_stream_crc};
use crate::tools::rle1::{rle1_encode_run, rle1_encoded_len, MAX_RUN};
use crate::tools::rle2_mtf::rle2_mtf_encode;

/// Comparison budget multiplier handed to the block sorter.
pub const DEFAULT_WORK_FACTOR: u32 = 50;

/// Block capacity per unit of the header's size digit.
pub const BLOCK_UNIT: usize = 100_000;

const NO_RUN: u16 = 0x100;

/// Compresses a byte stream into a bzip2 container. Blocks are emitted as
/// they fill; `finish` flushes the last partial block and the trailer.
pub struct BzWriter<W: Write> {
    bw: BitWriter<W>,
    block_size: u32,
    capacity: usize,
    /// RLE1-encoded bytes of the block being assembled.
    block: Vec<u8>,
    /// Current pre-RLE1 run: byte (NO_RUN when idle) and its length.
    run_byte: u16,
    run_len: u32,
    /// CRC over the original bytes of the current block.
    block_crc: u32,
    stream_crc: u32,
    blocks_written: u32,
    wrote_header: bool,
    finished: bool,
    work_factor: u32,
}

impl<W: Write> BzWriter<W> {
    /// `block_size` is the header digit 1-9, in units of 100k.
    pub fn new(sink: W, block_size: u32) -> Self {
        let block_size = block_size.clamp(1, 9);
        Self {
            bw: BitWriter::new(sink),
            block_size,
            capacity: block_size as usize * BLOCK_UNIT,
            block: Vec::with_capacity(block_size as usize * BLOCK_UNIT),
            run_byte: NO_RUN,
            run_len: 0,
            block_crc: 0,
            stream_crc: 0,
            blocks_written: 0,
            wrote_header: false,
            finished: false,
            work_factor: DEFAULT_WORK_FACTOR,
        }
    }

    /// Override the sorter's comparison budget multiplier.
    pub fn with_work_factor(mut self, work_factor: u32) -> Self {
        self.work_factor = work_factor.max(1);
        self.work_factor = self.work_factor.min(250);
        self
    }

    pub fn blocks_written(&self) -> u32 {
        self.blocks_written
    }

    fn push_byte(&mut self, byte: u8) -> Result<(), BzError> {
        if byte as u16 == self.run_byte && self.run_len < MAX_RUN {
            self.run_len += 1;
            return Ok(());
        }
        self.flush_run()?;
        self.run_byte = byte as u16;
        self.run_len = 1;
        Ok(())
    }

    /// Move the pending run into the block buffer in RLE1 form, closing
    /// the block first if the run would not fit. Runs never span blocks.
    fn flush_run(&mut self) -> Result<(), BzError> {
        if self.run_len == 0 {
            return Ok(());
        }
        if self.block.len() + rle1_encoded_len(self.run_len) > self.capacity {
            self.end_block()?;
        }
        let byte = self.run_byte as u8;
        for _ in 0..self.run_len {
            self.block_crc = do_crc_byte(self.block_crc, byte);
        }
        rle1_encode_run(&mut self.block, byte, self.run_len);
        self.run_byte = NO_RUN;
        self.run_len = 0;
        Ok(())
    }

    fn write_header(&mut self) {
        if !self.wrote_header {
            self.bw.out8(b'B');
            self.bw.out8(b'Z');
            self.bw.out8(b'h');
            self.bw.out8(b'0' + self.block_size as u8);
            self.wrote_header = true;
        }
    }

    /// Run the full pipeline over the assembled block and write it out.
    fn end_block(&mut self) -> Result<(), BzError> {
        if self.block.is_empty() {
            return Ok(());
        }
        self.write_header();

        self.bw.out24(0x18_314159);
        self.bw.out24(0x18_265359);
        self.bw.out32(self.block_crc);

        let bwt = bwt_encode(&self.block, self.work_factor)?;
        self.bw.out24(0x01_000000 | bwt.randomized as u32);
        self.bw.out24(0x18_000000 | bwt.key);

        let rle2 = rle2_mtf_encode(&bwt.bwt);
        huf_encode(&mut self.bw, &rle2);

        debug!(
            "block {}: {} rle1 bytes, crc {:#010x}, ends at {}",
            self.blocks_written + 1,
            self.block.len(),
            self.block_crc,
            self.bw.loc()
        );

        self.stream_crc = do_stream_crc(self.stream_crc, self.block_crc);
        self.blocks_written += 1;
        self.block.clear();
        self.block_crc = 0;
        self.bw.write_out()?;
        Ok(())
    }

    /// Flush everything pending and write the stream trailer. Idempotent;
    /// no data may be written afterwards.
    pub fn finish(&mut self) -> Result<(), BzError> {
        if self.finished {
            return Ok(());
        }
        self.flush_run()?;
        self.end_block()?;
        // An empty stream is still a valid container.
        self.write_header();
        self.bw.out24(0x18_177245);
        self.bw.out24(0x18_385090);
        self.bw.out32(self.stream_crc);
        self.bw.finish()?;
        self.finished = true;
        info!(
            "stream complete: {} blocks, combined crc {:#010x}",
            self.blocks_written, self.stream_crc
        );
        Ok(())
    }

    /// Consume the writer, returning the sink. Call `finish` first.
    pub fn into_inner(self) -> W {
        self.bw.into_inner()
    }
}

impl<W: Write> Write for BzWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for &b in buf {
            self.push_byte(b)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        // Deliberately a no-op: a block cannot be emitted until it is full
        // or the stream finishes.
        Ok(())
    }
}
