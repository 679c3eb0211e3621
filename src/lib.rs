//! A Rust implementation of the bzip2 block-sorting compressor.
//!
//! The pipeline per block: a byte-level run-length pass (RLE1), the
//! Burrows-Wheeler transform, move-to-front with zero-run coding (RLE2),
//! and an adaptive multi-table Huffman coder, all framed in the standard
//! `BZh` container with per-block and whole-stream CRC32 checks.
//!
//! [`BzWriter`] and [`BzReader`] are streaming `Write`/`Read` adapters;
//! [`compress`] and [`decompress`] are one-shot conveniences over them.

#![warn(rust_2018_idioms)]

pub mod bitstream;
pub mod bwt;
pub mod compression;
pub mod error;
pub mod huffman;
pub mod tools;

use std::io::{Read, Write};

pub use compression::{BzReader, BzWriter};
pub use error::BzError;

/// Compress a whole buffer into a bzip2 container in memory.
pub fn compress(data: &[u8], block_size: u32) -> Result<Vec<u8>, BzError> {
    let mut writer = BzWriter::new(Vec::new(), block_size);
    writer.write_all(data)?;
    writer.finish()?;
    Ok(writer.into_inner())
}

/// Decompress a whole bzip2 container from memory.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, BzError> {
    let mut reader = BzReader::new(data);
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}
