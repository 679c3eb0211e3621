//! The bzip2 in-use symbol map: a 16-bit index of which 16-byte ranges
//! appear in the block, followed by one 16-bit map per present range.

const BIT_MASK: u16 = 0x8000;

/// Build the symbol map words from the per-byte usage map. The first word
/// is the range index; only ranges with at least one used byte get a word.
pub fn encode_sym_map(used: &[bool; 256]) -> Vec<u16> {
    let mut index = 0u16;
    let mut maps = [0u16; 16];
    for (i, &in_use) in used.iter().enumerate() {
        if in_use {
            index |= BIT_MASK >> (i / 16);
            maps[i / 16] |= BIT_MASK >> (i % 16);
        }
    }
    let mut out = Vec::with_capacity(17);
    out.push(index);
    out.extend(maps.iter().filter(|&&m| m != 0));
    out
}

/// Takes the unique bzip2 symbol map and returns a sorted vec of all
/// u8s used in the input.
pub fn decode_sym_map(symbol_map: &[u16]) -> Vec<u8> {
    let mut symbols: Vec<u8> = Vec::with_capacity(256);
    let mut map_idx = 0;

    for block in 0..16_u8 {
        if (symbol_map[0] & (BIT_MASK >> block)) > 0 {
            map_idx += 1;
            for byte_idx in 0..16_u8 {
                if (symbol_map[map_idx] & (BIT_MASK >> byte_idx)) > 0 {
                    symbols.push((block << 4) + byte_idx);
                }
            }
        }
    }
    symbols
}

#[test]
fn decode_symbol_map_test() {
    let maps = vec![11008, 32770, 4, 17754, 6208];
    let mut compare = "Making a silly test.".as_bytes().to_vec();
    compare.sort_unstable();
    compare.dedup();
    assert_eq!(compare, decode_sym_map(&maps));
}

#[test]
fn decode_symbol_map_full_test() {
    let maps = vec![0xffff; 17];
    let compare = (0..=255).collect::<Vec<u8>>();
    assert_eq!(compare, decode_sym_map(&maps));
}

#[test]
fn encode_symbol_map_test() {
    let mut used = [false; 256];
    for &b in "Making a silly test.".as_bytes() {
        used[b as usize] = true;
    }
    assert_eq!(encode_sym_map(&used), vec![11008, 32770, 4, 17754, 6208]);
}

#[test]
fn encode_decode_symbol_map_roundtrip() {
    let mut used = [false; 256];
    for b in [0_u8, 15, 16, 255, 42] {
        used[b as usize] = true;
    }
    let words = encode_sym_map(&used);
    assert_eq!(decode_sym_map(&words), vec![0, 15, 16, 42, 255]);
}
