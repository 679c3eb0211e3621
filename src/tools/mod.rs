//! Byte-level transform stages that bracket the block sort: the initial
//! run-length pass, the in-use symbol map, the MTF + run coding of the
//! transformed block, and the CRC32 used throughout.

pub mod crc;
pub mod rle1;
pub mod rle2_mtf;
pub mod symbol_map;
