//! End-to-end tests over the public streaming API: container round-trips,
//! block boundaries, determinism, and corrupt-stream rejection.

use std::io::{Read, Write};

use rbzip2::{compress, decompress, BzError, BzReader, BzWriter};

/// Deterministic pseudo-random bytes without pulling in a crate.
fn lcg_bytes(len: usize, mut seed: u32) -> Vec<u8> {
    let mut v = Vec::with_capacity(len);
    for _ in 0..len {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        v.push((seed >> 16) as u8);
    }
    v
}

fn roundtrip(data: &[u8], block_size: u32) -> Vec<u8> {
    let packed = compress(data, block_size).unwrap();
    assert_eq!(decompress(&packed).unwrap(), data, "roundtrip mismatch");
    packed
}

#[test]
fn empty_input() {
    let packed = roundtrip(b"", 9);
    assert_eq!(&packed[0..4], b"BZh9");
}

#[test]
fn single_byte() {
    roundtrip(b"x", 1);
}

#[test]
fn short_text() {
    roundtrip(b"hello, hello, hello world", 9);
}

#[test]
fn long_run_uses_one_block() {
    let data = vec![b'a'; 20];
    let packed = compress(&data, 1).unwrap();
    assert_eq!(&packed[0..4], b"BZh1");
    let mut reader = BzReader::new(packed.as_slice());
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
    assert_eq!(reader.blocks_decoded(), 1);
}

#[test]
fn heavy_runs() {
    // RLE1 territory: long runs of several bytes.
    let mut data = Vec::new();
    for i in 0..200u32 {
        data.extend(std::iter::repeat((i % 7) as u8 + b'a').take(250 + i as usize));
    }
    roundtrip(&data, 1);
}

#[test]
fn pathological_alternation() {
    // No runs for RLE1 to eat, maximal stress on the sorter.
    let data: Vec<u8> = (0..100_000).map(|i| if i % 2 == 0 { b'a' } else { b'b' }).collect();
    roundtrip(&data, 1);
}

#[test]
fn random_data_multi_block() {
    let data = lcg_bytes(950_000, 0xdead_beef);
    let packed = compress(&data, 1).unwrap();
    let mut reader = BzReader::new(packed.as_slice());
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
    assert_eq!(reader.blocks_decoded(), 10);
}

#[test]
fn block_count_matches_writer() {
    let data = lcg_bytes(250_000, 7);
    let mut writer = BzWriter::new(Vec::new(), 1);
    writer.write_all(&data).unwrap();
    writer.finish().unwrap();
    let written = writer.blocks_written();
    assert_eq!(written, 3);

    let packed = writer.into_inner();
    let mut reader = BzReader::new(packed.as_slice());
    std::io::copy(&mut reader, &mut std::io::sink()).unwrap();
    assert_eq!(reader.blocks_decoded(), written);
}

#[test]
fn compression_is_deterministic() {
    let data = lcg_bytes(60_000, 99);
    let a = compress(&data, 9).unwrap();
    let b = compress(&data, 9).unwrap();
    assert_eq!(a, b);
}

#[test]
fn compressible_input_shrinks() {
    let data: Vec<u8> = b"the quick brown fox jumps over the lazy dog. "
        .iter()
        .copied()
        .cycle()
        .take(50_000)
        .collect();
    let packed = compress(&data, 9).unwrap();
    assert!(packed.len() < data.len() / 2);
}

#[test]
fn rejects_bad_magic() {
    assert!(matches!(
        decompress(b"not a bzip2 stream at all"),
        Err(BzError::InvalidHeader)
    ));
}

#[test]
fn rejects_bad_size_digit() {
    let mut packed = compress(b"data", 9).unwrap();
    packed[3] = b'0';
    assert!(matches!(
        decompress(&packed),
        Err(BzError::InvalidHeader)
    ));
}

#[test]
fn rejects_truncation() {
    let packed = compress(&lcg_bytes(10_000, 3), 9).unwrap();
    let cut = &packed[..packed.len() / 2];
    assert!(matches!(
        decompress(cut),
        Err(BzError::UnexpectedEndOfStream)
    ));
}

#[test]
fn detects_corrupt_block_crc() {
    let packed = compress(&lcg_bytes(10_000, 4), 9).unwrap();
    // Bytes 10..14 hold the first block's stored CRC (after the 4-byte
    // header and 6-byte block magic).
    let mut bad = packed.clone();
    bad[10] ^= 0x01;
    match decompress(&bad) {
        Err(BzError::CrcMismatch { stored, computed }) => assert_ne!(stored, computed),
        other => panic!("expected crc mismatch, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn detects_corrupt_body() {
    let packed = compress(&lcg_bytes(10_000, 5), 9).unwrap();
    let mut bad = packed.clone();
    let mid = bad.len() / 2;
    bad[mid] ^= 0x10;
    assert!(decompress(&bad).is_err());
}

#[test]
fn small_reads_through_read_trait() {
    let data = lcg_bytes(5_000, 11);
    let packed = compress(&data, 9).unwrap();
    let mut reader = BzReader::new(packed.as_slice());
    let mut out = Vec::new();
    let mut chunk = [0u8; 7];
    loop {
        let n = reader.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    assert_eq!(out, data);
}

#[test]
fn incremental_writes_match_one_shot() {
    let data = lcg_bytes(30_000, 21);
    let mut writer = BzWriter::new(Vec::new(), 9);
    for chunk in data.chunks(613) {
        writer.write_all(chunk).unwrap();
    }
    writer.finish().unwrap();
    assert_eq!(writer.into_inner(), compress(&data, 9).unwrap());
}
