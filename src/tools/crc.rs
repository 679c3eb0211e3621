//! CRC32 checksums for the bzip2 format, both block and stream versions.
//!
//! Bzip2 uses the MSB-first CRC32 (polynomial 0x04c11db7) with the register
//! complemented on entry and exit, which is the reverse bit order from the
//! zlib/ethernet CRC. Block CRCs cover the original bytes of one block; the
//! stream CRC folds the block CRCs together with a rotate-and-xor.

const CRC32_POLY: u32 = 0x04c1_1db7;

const CRC32_TABLE: [u32; 256] = build_crc32_table();

const fn build_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ CRC32_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Update a running block CRC with a slice of data. Start from 0; the
/// complement-in/complement-out form means calls can be chained:
/// `do_crc(do_crc(0, a), b) == do_crc(0, ab)`.
pub fn do_crc(crc: u32, data: &[u8]) -> u32 {
    let mut c = !crc;
    for &byte in data {
        c = (c << 8) ^ CRC32_TABLE[(((c >> 24) ^ byte as u32) & 0xff) as usize];
    }
    !c
}

/// Single-byte form of [`do_crc`] for the byte-at-a-time decode pipeline.
pub fn do_crc_byte(crc: u32, byte: u8) -> u32 {
    let c = !crc;
    !((c << 8) ^ CRC32_TABLE[(((c >> 24) ^ byte as u32) & 0xff) as usize])
}

/// Fold one finished block CRC into the whole-stream CRC.
pub fn do_stream_crc(stream_crc: u32, block_crc: u32) -> u32 {
    stream_crc.rotate_left(1) ^ block_crc
}
