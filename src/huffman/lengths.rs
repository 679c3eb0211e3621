//! Code length assignment from symbol weights.
//!
//! The refinement passes in the encoder hand in accumulated frequencies;
//! this builds a Huffman tree over them and reports each leaf's depth as
//! its code length. Lengths must fit in 20 bits on the wire. If the tree
//! comes out deeper, the weights are flattened (halved, floored at one)
//! and the tree rebuilt until it fits; the result is then slightly
//! sub-optimal but valid.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Longest code the container format allows.
pub const MAX_CODE_LEN: u32 = 20;

#[derive(Eq, PartialEq, Debug)]
enum NodeData {
    Kids(Box<Node>, Box<Node>),
    Leaf(u16),
}

#[derive(Eq, PartialEq, Debug)]
struct Node {
    /// Weight in the top 24 bits, subtree depth in the low 8.
    weight: u32,
    depth: u8,
    /// Sum of the symbol values below, a deterministic tie-break.
    syms: u32,
    node_data: NodeData,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then(self.syms.cmp(&other.syms))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn add_weights(a: u32, b: u32) -> u32 {
    const WEIGHT_MASK: u32 = 0xffff_ff00;
    const DEPTH_MASK: u32 = 0x0000_00ff;
    ((a & WEIGHT_MASK) + (b & WEIGHT_MASK)) | (1 + (a & DEPTH_MASK).max(b & DEPTH_MASK))
}

/// Overwrite `lengths[..alpha_size]` with code lengths derived from
/// `freqs[..alpha_size]`. Zero frequencies still get a code (weight one);
/// every symbol must remain encodable because a later group may pick this
/// table for data it was not trained on.
pub fn code_lengths_from_weights(lengths: &mut [u32], freqs: &[u32], alpha_size: usize) {
    let mut weight: Vec<(u32, u16)> = freqs
        .iter()
        .take(alpha_size)
        .enumerate()
        .map(|(i, &f)| (if f == 0 { 256 } else { f << 8 }, i as u16))
        .collect();

    loop {
        let mut heap: BinaryHeap<Reverse<Node>> = weight
            .iter()
            .map(|&(w, s)| {
                Reverse(Node {
                    weight: w,
                    depth: 0,
                    syms: s as u32,
                    node_data: NodeData::Leaf(s),
                })
            })
            .collect();

        // Merge the two lightest nodes until one tree remains.
        while heap.len() > 1 {
            let Reverse(a) = heap.pop().unwrap();
            let Reverse(b) = heap.pop().unwrap();
            heap.push(Reverse(Node {
                weight: add_weights(a.weight, b.weight),
                depth: a.depth.max(b.depth) + 1,
                syms: a.syms + b.syms,
                node_data: NodeData::Kids(Box::new(a), Box::new(b)),
            }));
        }
        let Reverse(root) = heap.pop().unwrap();

        if root.depth as u32 <= MAX_CODE_LEN {
            collect_leaves(&root, 0, lengths);
            return;
        }

        // Tree too deep for the wire format. Flatten and retry.
        for item in weight.iter_mut() {
            let j = 1 + (item.0 >> 8) / 2;
            item.0 = j << 8;
        }
    }
}

fn collect_leaves(node: &Node, depth: u32, lengths: &mut [u32]) {
    match &node.node_data {
        NodeData::Kids(left, right) => {
            collect_leaves(left, depth + 1, lengths);
            collect_leaves(right, depth + 1, lengths);
        }
        NodeData::Leaf(sym) => lengths[*sym as usize] = depth,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kraft_sum(lengths: &[u32]) -> f64 {
        lengths.iter().map(|&l| (0.5f64).powi(l as i32)).sum()
    }

    #[test]
    fn uniform_weights_balance() {
        let freqs = [10u32; 8];
        let mut lengths = [0u32; 8];
        code_lengths_from_weights(&mut lengths, &freqs, 8);
        assert!(lengths.iter().all(|&l| l == 3));
    }

    #[test]
    fn frequent_symbols_get_short_codes() {
        let freqs = [1000, 500, 100, 50, 10, 1];
        let mut lengths = [0u32; 6];
        code_lengths_from_weights(&mut lengths, &freqs, 6);
        for w in lengths.windows(2) {
            assert!(w[0] <= w[1]);
        }
        assert!((kraft_sum(&lengths) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_frequency_still_coded() {
        let freqs = [100, 0, 100, 0];
        let mut lengths = [0u32; 4];
        code_lengths_from_weights(&mut lengths, &freqs, 4);
        assert!(lengths.iter().all(|&l| l >= 1));
        assert!((kraft_sum(&lengths) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn depth_capped_at_twenty() {
        // Fibonacci-like weights force a maximally skewed tree, which
        // exceeds 20 levels at this alphabet size without flattening.
        let mut freqs = [0u32; 32];
        let (mut a, mut b) = (1u32, 1u32);
        for f in freqs.iter_mut() {
            *f = a;
            let next = a.saturating_add(b);
            a = b;
            b = next;
        }
        let mut lengths = [0u32; 32];
        code_lengths_from_weights(&mut lengths, &freqs, 32);
        assert!(lengths.iter().all(|&l| l >= 1 && l <= MAX_CODE_LEN));
        assert!(kraft_sum(&lengths) <= 1.0 + 1e-9);
    }
}
