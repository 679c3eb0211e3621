//! The block-sorting transform and its inverse.
//!
//! `block_sort` produces the last column plus an origin pointer from a
//! block of RLE1 data; `unbwt` walks the transform backwards during
//! decompression. `rand` holds the fixed scramble pattern shared by the
//! sorter's give-up path and the decoder.

pub mod block_sort;
pub mod rand;
pub mod unbwt;

pub use block_sort::{bwt_encode, BwtOut};
pub use unbwt::UnBwt;
