//! BitReader: pulls arbitrary-width fields off a packed MSB-first bitstream.
//!
//! Can read from any I/O source that supports the read() call. Running off
//! the end of the source mid-field is an error, not an end marker; the
//! container format always knows how many bits it still expects.

use crate::error::BzError;

const BUFFER_SIZE: usize = 1024 * 1024;

/// Reads a binary bzip2 stream.
#[derive(Debug)]
pub struct BitReader<R> {
    buffer: Vec<u8>,
    cursor: usize,
    bit_index: usize,
    source: R,
}

impl<R: std::io::Read> BitReader<R> {
    /// Creates a new BitReader (with a 1Mbyte buffer).
    pub fn new(source: R) -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            bit_index: 0,
            source,
        }
    }

    /// Check (and refill) the buffer. Returns false if the source is drained.
    fn have_data(&mut self) -> Result<bool, BzError> {
        if self.cursor == self.buffer.len() {
            self.buffer.resize(BUFFER_SIZE, 0);
            let size = self.source.read(&mut self.buffer)?;
            self.buffer.truncate(size);
            self.cursor = 0;
            self.bit_index = 0;
            if size == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Return the next n bits (n <= 32) packed into the low end of a u32.
    pub fn bint(&mut self, mut n: usize) -> Result<u32, BzError> {
        debug_assert!(n <= 32);
        let mut result = 0u32;
        while n > 0 {
            if !self.have_data()? {
                return Err(BzError::UnexpectedEndOfStream);
            }
            let avail = 8 - self.bit_index;
            let take = n.min(avail);
            let bits = (self.buffer[self.cursor] >> (avail - take)) & ((1u16 << take) - 1) as u8;
            result = (result << take) | bits as u32;
            self.bit_index += take;
            if self.bit_index == 8 {
                self.cursor += 1;
                self.bit_index = 0;
            }
            n -= take;
        }
        Ok(result)
    }

    /// Return *true* if the next bit is 1, consuming the bit.
    pub fn bool_bit(&mut self) -> Result<bool, BzError> {
        Ok(self.bint(1)? == 1)
    }

    /// Convenience function, calls bint(8).
    pub fn byte(&mut self) -> Result<u8, BzError> {
        Ok(self.bint(8)? as u8)
    }

    /// Returns n bytes (not necessarily byte-aligned on the stream).
    pub fn bytes(&mut self, n: usize) -> Result<Vec<u8>, BzError> {
        let mut result = Vec::with_capacity(n);
        for _ in 0..n {
            result.push(self.byte()?);
        }
        Ok(result)
    }

    /// Debugging function. Report current position in the buffer.
    pub fn loc(&self) -> String {
        format!("[{}.{}]", self.cursor, self.bit_index)
    }
}

#[cfg(test)]
mod test {
    use super::BitReader;

    #[test]
    fn bint_test() {
        let x = [0b00011011].as_slice();
        let mut br = BitReader::new(x);
        assert_eq!(br.bint(5).unwrap(), 3);
        assert_eq!(br.bint(1).unwrap(), 0);
        assert_eq!(br.bint(2).unwrap(), 3);
        assert!(br.bint(1).is_err());
    }

    #[test]
    fn bint_spans_bytes() {
        let x = [0b0001_1011, 0b1100_0000].as_slice();
        let mut br = BitReader::new(x);
        assert_eq!(br.bint(3).unwrap(), 0);
        assert_eq!(br.bint(7).unwrap(), 0b11011_11);
    }

    #[test]
    fn bint_32_wide() {
        let x = [0xde, 0xad, 0xbe, 0xef].as_slice();
        let mut br = BitReader::new(x);
        assert_eq!(br.bint(32).unwrap(), 0xdead_beef);
    }

    #[test]
    fn byte_test() {
        let x = "Hello, world!".as_bytes();
        let mut br = BitReader::new(x);
        assert_eq!(br.byte().unwrap(), b'H');
        assert_eq!(br.byte().unwrap(), b'e');
        assert_eq!(br.byte().unwrap(), b'l');
        assert_eq!(br.byte().unwrap(), b'l');
    }

    #[test]
    fn bytes_test() {
        let x = "Hello, world!".as_bytes();
        let mut br = BitReader::new(x);
        assert_eq!(br.bytes(5).unwrap(), b"Hello".to_vec());
    }

    #[test]
    fn loc_test() {
        let x = "Hello, world!".as_bytes();
        let mut br = BitReader::new(x);
        br.bytes(5).unwrap();
        br.bint(1).unwrap();
        assert_eq!(br.loc(), "[5.1]");
    }

    #[test]
    fn bool_bit_test() {
        let x = [0b0101_0000].as_slice();
        let mut br = BitReader::new(x);
        assert_eq!(br.bool_bit().unwrap(), false);
        assert_eq!(br.bool_bit().unwrap(), true);
        assert_eq!(br.bool_bit().unwrap(), false);
        assert_eq!(br.bool_bit().unwrap(), true);
    }
}
