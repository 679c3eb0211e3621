//! BitWriter: assembles the compressed bitstream, MSB first.
//!
//! All multi-bit fields in the bzip2 format are written most-significant-bit
//! first with no padding between fields; only the very end of the stream is
//! zero-padded out to a byte boundary. Bits are staged in a small queue and
//! flushed to an internal buffer as whole bytes; the buffer is pushed to the
//! underlying sink once per block and at close.

use std::io::Write;

/// Writes an arbitrary-width bit sequence to an output sink.
pub struct BitWriter<W> {
    sink: W,
    /// Staged whole bytes, pushed to the sink by `write_out`.
    output: Vec<u8>,
    /// Bits waiting to fill out the next whole byte.
    queue: u64,
    /// Count of valid bits in the queue (always 0..8 between calls).
    q_bits: u8,
    /// Total bytes handed to the sink, for `loc` reporting.
    written: usize,
}

impl<W: Write> BitWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            output: Vec::with_capacity(64 * 1024),
            queue: 0,
            q_bits: 0,
            written: 0,
        }
    }

    /// Internal bitstream write function common to all out.XX functions.
    fn push_bits(&mut self, count: u8, bits: u32) {
        debug_assert!(count >= 1 && count <= 32);
        let masked = if count == 32 {
            bits
        } else {
            bits & ((1u32 << count) - 1)
        };
        self.queue = (self.queue << count) | masked as u64;
        self.q_bits += count;
        while self.q_bits > 7 {
            self.output.push((self.queue >> (self.q_bits - 8)) as u8);
            self.q_bits -= 8;
        }
    }

    /// Put a whole byte on the stream.
    pub fn out8(&mut self, data: u8) {
        self.push_bits(8, data as u32);
    }

    /// Put a 16 bit word on the stream.
    pub fn out16(&mut self, data: u16) {
        self.push_bits(16, data as u32);
    }

    /// Put a 32 bit word on the stream.
    pub fn out32(&mut self, data: u32) {
        self.push_bits(32, data);
    }

    /// Put 1-24 bits on the stream. The count lives in the top byte of
    /// `data`, the value in the low 24 bits: `0x02_000003` writes `11`.
    pub fn out24(&mut self, data: u32) {
        self.push_bits((data >> 24) as u8, data & 0x00ff_ffff);
    }

    /// Drain the staged whole bytes to the sink. Queued partial-byte bits
    /// carry over to the next call.
    pub fn write_out(&mut self) -> std::io::Result<()> {
        self.sink.write_all(&self.output)?;
        self.written += self.output.len();
        self.output.clear();
        Ok(())
    }

    /// Pad the last partial byte with zeros in the least significant bits,
    /// then drain everything to the sink and flush it.
    pub fn finish(&mut self) -> std::io::Result<()> {
        if self.q_bits > 0 {
            self.queue <<= 8 - self.q_bits;
            self.output.push(self.queue as u8);
            self.q_bits = 0;
        }
        self.write_out()?;
        self.sink.flush()
    }

    /// Consume the writer, returning the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Debugging function. Report the current position on the stream.
    pub fn loc(&self) -> String {
        format!("[{}.{}]", self.written + self.output.len(), self.q_bits)
    }
}

#[cfg(test)]
mod test {
    use super::BitWriter;

    #[test]
    fn out8_test() {
        let mut bw = BitWriter::new(Vec::new());
        bw.out8(b'x');
        bw.finish().unwrap();
        assert_eq!(bw.into_inner(), b"x");
    }

    #[test]
    fn last_bits_test() {
        let mut bw = BitWriter::new(Vec::new());
        bw.out8(255);
        bw.out8(1);
        bw.out8(128);
        bw.out8(255);
        bw.out24(0x03_000007); // three 1 bits, padded out with zeros
        bw.finish().unwrap();
        assert_eq!(bw.into_inner(), vec![255, 1, 128, 255, 224]);
    }

    #[test]
    fn out24_packs_count_and_value() {
        let mut bw = BitWriter::new(Vec::new());
        bw.out24(0x08_0000ff);
        bw.out24(0x02_000003);
        bw.finish().unwrap();
        assert_eq!(bw.into_inner(), vec![0b1111_1111, 0b1100_0000]);
    }

    #[test]
    fn out16_out32_alignment() {
        let mut bw = BitWriter::new(Vec::new());
        bw.out24(0x01_000001);
        bw.out16(0);
        bw.out32(0xffff_ffff);
        bw.finish().unwrap();
        assert_eq!(
            bw.into_inner(),
            vec![0b1000_0000, 0b0000_0000, 0x7f, 0xff, 0xff, 0xff, 0b1000_0000]
        );
    }
}
