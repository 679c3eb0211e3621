//! Bit-level I/O for the compressed container.
//!
//! Everything in a bzip2 stream is bit-packed MSB first with no alignment
//! between fields, so both directions go through these two types rather
//! than touching the underlying reader/writer directly.

pub mod bitreader;
pub mod bitwriter;

pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
