//! The multi-table Huffman coder for one block of MTF/RLE2 symbols.
//!
//! Rather than one code for the whole block, the symbol stream is cut into
//! groups of 50 and between two and six coding tables compete for each
//! group. Tables are seeded by slicing the symbol alphabet into frequency
//! bands, then refined: pick the cheapest table per group, re-count the
//! frequencies each table actually saw, rebuild its code lengths, and
//! repeat. Four passes of this is where the returns stop being worth the
//! time. The winning table index per group is recorded as a selector.

use std::cmp::Ordering;
use std::io::Write;

use log::{debug, trace};

use crate::bitstream::BitWriter;
use crate::huffman::lengths::code_lengths_from_weights;
use crate::tools::rle2_mtf::{Rle2Block, MAX_ALPHA_SIZE};

/// Symbols per selector group.
pub const GROUP_SIZE: usize = 50;

/// Refinement passes over the block.
const N_ITERS: usize = 4;

/// How many coding tables a block of this many symbols gets.
pub fn table_count_for(len: usize) -> usize {
    match len {
        0..=199 => 2,
        200..=599 => 3,
        600..=1199 => 4,
        1200..=2399 => 5,
        _ => 6,
    }
}

/// Seed the coding tables by walking the alphabet in symbol order and
/// giving each table one frequency band: in-band symbols get weight 0,
/// everything else 15. Tables 2 and 4 break just short of their band
/// limit instead of just past it, so the low tables are not starved.
fn init_tables(freqs: &[u32], table_count: usize, alpha_size: usize) -> [[u32; MAX_ALPHA_SIZE]; 6] {
    let mut tables = [[15_u32; MAX_ALPHA_SIZE]; 6];
    let portion_limit: u32 = freqs.iter().take(alpha_size).sum::<u32>() / table_count as u32;

    let mut table_index = table_count - 1;
    let mut portion = 0;
    for (i, &f) in freqs.iter().enumerate().take(alpha_size) {
        if portion + f > portion_limit && (table_index == 2 || table_index == 4) {
            table_index = table_index.saturating_sub(1);
            tables[table_index][i] = 0;
            portion = f;
            if portion > portion_limit {
                tables[table_index][i] = 0;
                table_index = table_index.saturating_sub(1);
                portion = 0;
            }
        } else {
            portion += f;
            tables[table_index][i] = 0;
            if portion > portion_limit {
                table_index = table_index.saturating_sub(1);
                portion = 0;
            }
        }
    }
    tables
}

/// Encode one block's symbol stream and all its coding metadata onto the
/// bitstream: symbol map words, table count, selector count, MTF'd unary
/// selectors, the delta-coded length table per coding table, then the
/// Huffman-coded symbols themselves.
pub fn huf_encode<W: Write>(bw: &mut BitWriter<W>, block: &Rle2Block) {
    let alpha_size = block.eob as usize + 1;
    let table_count = table_count_for(block.rle2.len());
    let selector_count = (block.rle2.len() + GROUP_SIZE - 1) / GROUP_SIZE;

    let mut tables = init_tables(&block.freqs, table_count, alpha_size);
    let mut selectors = vec![0_usize; selector_count];

    for iter in 0..N_ITERS {
        let mut favorites = [0usize; 6];
        let mut total_cost = 0u32;
        let mut rfreq = [[0u32; MAX_ALPHA_SIZE]; 6];

        for (i, chunk) in block.rle2.chunks(GROUP_SIZE).enumerate() {
            // Which table codes this group cheapest?
            let mut cost = [0u32; 6];
            for &symbol in chunk {
                for (t, table) in tables.iter().enumerate().take(table_count) {
                    cost[t] += table[symbol as usize];
                }
            }
            let bt = (0..table_count).min_by_key(|&t| cost[t]).unwrap();
            total_cost += cost[bt];
            favorites[bt] += 1;

            for &symbol in chunk {
                rfreq[bt][symbol as usize] += 1;
            }
            if iter == N_ITERS - 1 {
                selectors[i] = bt;
            }
        }
        debug!(
            "pass {}: best cost is {}, grp uses are {:?}",
            iter + 1,
            total_cost / 8,
            favorites
        );

        for (t, table) in tables.iter_mut().enumerate().take(table_count) {
            code_lengths_from_weights(table, &rfreq[t], alpha_size);
        }
    }

    // Metadata first: symbol map, table count, selector count.
    for word in &block.sym_map {
        bw.out16(*word);
    }
    bw.out24((3 << 24) | table_count as u32);
    bw.out24((15 << 24) | selector_count as u32);

    // Selectors go out move-to-front coded, each index as unary ones
    // terminated by a zero.
    let mut table_idx: Vec<usize> = (0..6).collect();
    for &s in &selectors {
        let idx = table_idx.iter().position(|&c| c == s).unwrap();
        let moved = table_idx.remove(idx);
        table_idx.insert(0, moved);
        match idx {
            0 => bw.out24(0x01_000000),
            1 => bw.out24(0x02_000002),
            2 => bw.out24(0x03_000006),
            3 => bw.out24(0x04_00000e),
            4 => bw.out24(0x05_00001e),
            _ => bw.out24(0x06_00003e),
        }
    }

    // Per table: assign canonical codes, then serialize the lengths as a
    // 5-bit origin and a +-1 delta walk in symbol order.
    let mut code_tables: Vec<Vec<u32>> = Vec::with_capacity(table_count);
    for table in tables.iter().take(table_count) {
        let mut len_sym: Vec<(u32, u16)> = table
            .iter()
            .take(alpha_size)
            .enumerate()
            .map(|(sym, &len)| (len, sym as u16))
            .collect();
        len_sym.sort_unstable();

        // Canonical assignment: codes count up within a length, and shift
        // left when the length steps up.
        let mut codes = vec![0u32; alpha_size];
        let mut next_code: (u32, u32) = (len_sym[0].0, 0);
        for &(len, sym) in &len_sym {
            if len != next_code.0 {
                next_code.1 <<= len - next_code.0;
                next_code.0 = len;
            }
            codes[sym as usize] = (len << 24) | next_code.1;
            next_code.1 += 1;
        }

        let mut origin = table[0];
        trace!("table origin {} written at {}", origin, bw.loc());
        bw.out24((5 << 24) | origin);
        for &len in table.iter().take(alpha_size) {
            let mut delta = len as i32 - origin as i32;
            origin = len;
            loop {
                match delta.cmp(&0) {
                    Ordering::Greater => {
                        bw.out24(0x02_000002);
                        delta -= 1;
                    }
                    Ordering::Less => {
                        bw.out24(0x02_000003);
                        delta += 1;
                    }
                    Ordering::Equal => break,
                }
            }
            bw.out24(0x01_000000);
        }
        code_tables.push(codes);
    }

    // Finally the data, 50 symbols per selector.
    for (idx, chunk) in block.rle2.chunks(GROUP_SIZE).enumerate() {
        let codes = &code_tables[selectors[idx]];
        for &symbol in chunk {
            bw.out24(codes[symbol as usize]);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_count_thresholds() {
        assert_eq!(table_count_for(0), 2);
        assert_eq!(table_count_for(199), 2);
        assert_eq!(table_count_for(200), 3);
        assert_eq!(table_count_for(599), 3);
        assert_eq!(table_count_for(600), 4);
        assert_eq!(table_count_for(1199), 4);
        assert_eq!(table_count_for(1200), 5);
        assert_eq!(table_count_for(2399), 5);
        assert_eq!(table_count_for(2400), 6);
    }

    #[test]
    fn seeded_tables_cover_alphabet() {
        // Every symbol must land in at least one table's zero-weight band.
        let mut freqs = [0u32; MAX_ALPHA_SIZE];
        for (i, f) in freqs.iter_mut().enumerate().take(30) {
            *f = (30 - i as u32) * 10;
        }
        let tables = init_tables(&freqs, 6, 30);
        for sym in 0..30 {
            assert!(
                (0..6).any(|t| tables[t][sym] == 0),
                "symbol {} in no table",
                sym
            );
        }
    }
}
