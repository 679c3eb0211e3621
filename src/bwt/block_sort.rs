//! The Burrows-Wheeler sort, the heart of the compressor.
//!
//! Small blocks go straight to a shell sort over the rotation indices.
//! Larger blocks get a two-byte-prefix counting sort into 65536 buckets,
//! then a ternary quicksort within each bucket, with three accelerations:
//! buckets are processed smallest first, a per-rotation "quadrant" rank
//! lets deep ties resolve against already-sorted neighbours, and finishing
//! all `[ss, *]` buckets lets every `[*, ss]` bucket be derived by a single
//! scan instead of sorted.
//!
//! Comparison work is metered. A block that blows its budget on the first
//! attempt is lightly scrambled with the fixed randomization pattern and
//! sorted again; the block header flag tells the decoder to undo it.

use log::{trace, warn};

use crate::bwt::rand::Randomizer;
use crate::error::BzError;

const OVERSHOOT: usize = 32;

/// Below this size the bucket machinery costs more than it saves.
const SIMPLE_SORT_LIMIT: usize = 4000;

/// Quicksort ranges below this go to the shell sort.
const SMALL_THRESH: isize = 20;
/// Quicksort depth beyond this goes to the shell sort.
const DEPTH_THRESH: usize = 10;

/// Shell sort increments (Knuth's 3h+1 sequence).
const INCS: [usize; 14] = [
    1, 4, 13, 40, 121, 364, 1093, 3280, 9841, 29524, 88573, 265720, 797161, 2391484,
];

/// A finished forward transform.
pub struct BwtOut {
    /// Row index of the original rotation in the sorted order.
    pub key: u32,
    /// Last column of the sorted rotation matrix.
    pub bwt: Vec<u8>,
    /// True if the block was scrambled before sorting.
    pub randomized: bool,
}

struct SortState {
    /// Block bytes with the first OVERSHOOT bytes mirrored at the end, so
    /// comparisons can run past the wrap point without a modulus.
    block: Vec<u8>,
    /// Coarse sort rank per rotation, mirrored like `block`.
    quadrant: Vec<u16>,
    /// Rotation start indices, the thing actually being sorted.
    zptr: Vec<u32>,
    n: usize,
    work_done: u64,
    work_limit: u64,
    first_attempt: bool,
}

impl SortState {
    fn new(data: &[u8], work_factor: u32) -> Self {
        let n = data.len();
        let mut block = Vec::with_capacity(n + OVERSHOOT);
        block.extend_from_slice(data);
        for j in 0..OVERSHOOT {
            block.push(data[j % n]);
        }
        Self {
            block,
            quadrant: vec![0; n + OVERSHOOT],
            zptr: vec![0; n],
            n,
            work_done: 0,
            work_limit: work_factor as u64 * n as u64,
            first_attempt: true,
        }
    }

    fn overran(&self) -> bool {
        self.first_attempt && self.work_done > self.work_limit
    }

    /// Does rotation i1 sort strictly after rotation i2?
    fn full_gt_u(&mut self, mut i1: usize, mut i2: usize) -> bool {
        debug_assert!(i1 != i2);
        for _ in 0..6 {
            let c1 = self.block[i1];
            let c2 = self.block[i2];
            if c1 != c2 {
                return c1 > c2;
            }
            i1 += 1;
            i2 += 1;
        }
        let mut k = self.n as isize;
        loop {
            for _ in 0..4 {
                let c1 = self.block[i1];
                let c2 = self.block[i2];
                if c1 != c2 {
                    return c1 > c2;
                }
                let s1 = self.quadrant[i1];
                let s2 = self.quadrant[i2];
                if s1 != s2 {
                    return s1 > s2;
                }
                i1 += 1;
                i2 += 1;
            }
            if i1 >= self.n {
                i1 -= self.n;
            }
            if i2 >= self.n {
                i2 -= self.n;
            }
            k -= 4;
            self.work_done += 1;
            if k < 0 {
                return false;
            }
        }
    }

    /// Shell sort of zptr[lo..=hi], comparing rotations from depth d.
    fn simple_sort(&mut self, lo: isize, hi: isize, d: usize) {
        let big_n = hi - lo + 1;
        if big_n < 2 {
            return;
        }
        let used = INCS
            .iter()
            .position(|&inc| inc as isize >= big_n)
            .unwrap_or(INCS.len());
        for &h in INCS[..used].iter().rev() {
            let h = h as isize;
            let mut i = lo + h;
            while i <= hi {
                let v = self.zptr[i as usize];
                let mut j = i;
                while self.full_gt_u(
                    self.zptr[(j - h) as usize] as usize + d,
                    v as usize + d,
                ) {
                    self.zptr[j as usize] = self.zptr[(j - h) as usize];
                    j -= h;
                    if j < lo + h {
                        break;
                    }
                }
                self.zptr[j as usize] = v;
                i += 1;
                if self.overran() {
                    return;
                }
            }
        }
    }

    /// Three-way quicksort of zptr[lo..=hi] on the byte at depth d, with an
    /// explicit stack instead of recursion.
    fn q_sort3(&mut self, lo0: isize, hi0: isize, d0: usize) {
        let mut stack: Vec<(isize, isize, usize)> = Vec::with_capacity(64);
        stack.push((lo0, hi0, d0));
        while let Some((lo, hi, d)) = stack.pop() {
            if hi - lo < SMALL_THRESH || d > DEPTH_THRESH {
                self.simple_sort(lo, hi, d);
                if self.overran() {
                    return;
                }
                continue;
            }
            let med = med3(
                self.block[self.zptr[lo as usize] as usize + d],
                self.block[self.zptr[hi as usize] as usize + d],
                self.block[self.zptr[((lo + hi) >> 1) as usize] as usize + d],
            ) as i32;

            let (mut un_lo, mut lt_lo) = (lo, lo);
            let (mut un_hi, mut gt_hi) = (hi, hi);
            loop {
                while un_lo <= un_hi {
                    let c = self.block[self.zptr[un_lo as usize] as usize + d] as i32 - med;
                    if c == 0 {
                        self.zptr.swap(un_lo as usize, lt_lo as usize);
                        lt_lo += 1;
                        un_lo += 1;
                        continue;
                    }
                    if c > 0 {
                        break;
                    }
                    un_lo += 1;
                }
                while un_lo <= un_hi {
                    let c = self.block[self.zptr[un_hi as usize] as usize + d] as i32 - med;
                    if c == 0 {
                        self.zptr.swap(un_hi as usize, gt_hi as usize);
                        gt_hi -= 1;
                        un_hi -= 1;
                        continue;
                    }
                    if c < 0 {
                        break;
                    }
                    un_hi -= 1;
                }
                if un_lo > un_hi {
                    break;
                }
                self.zptr.swap(un_lo as usize, un_hi as usize);
                un_lo += 1;
                un_hi -= 1;
            }
            debug_assert!(un_hi == un_lo - 1);

            // Everything compared equal: one partition, one level deeper.
            if gt_hi < lt_lo {
                stack.push((lo, hi, d + 1));
                continue;
            }

            let m1 = (lt_lo - lo).min(un_lo - lt_lo);
            self.vswap(lo, un_lo - m1, m1);
            let m2 = (gt_hi - un_hi).min(hi - gt_hi);
            self.vswap(un_lo, hi - m2 + 1, m2);

            let eq_lo = lo + (un_lo - lt_lo);
            let eq_hi = hi - (gt_hi - un_hi);
            stack.push((lo, eq_lo - 1, d));
            stack.push((eq_lo, eq_hi, d + 1));
            stack.push((eq_hi + 1, hi, d));
        }
    }

    fn vswap(&mut self, mut a: isize, mut b: isize, mut len: isize) {
        while len > 0 {
            self.zptr.swap(a as usize, b as usize);
            a += 1;
            b += 1;
            len -= 1;
        }
    }

    /// Bucketed sort for blocks of SIMPLE_SORT_LIMIT bytes and up.
    fn main_sort(&mut self) {
        let n = self.n;

        // Counting sort on the 2-byte prefix of every rotation.
        let mut ftab = vec![0u32; 65537];
        for i in 0..n {
            let p = ((self.block[i] as usize) << 8) + self.block[i + 1] as usize;
            ftab[p] += 1;
        }
        for i in 1..=65536 {
            ftab[i] += ftab[i - 1];
        }
        for i in 0..n {
            let p = ((self.block[i] as usize) << 8) + self.block[i + 1] as usize;
            ftab[p] -= 1;
            self.zptr[ftab[p] as usize] = i as u32;
        }

        let mut bucket_done = vec![false; 65536];
        let mut big_done = [false; 256];

        // Big buckets smallest first, so the copy scan below retires the
        // bulk of the block cheaply.
        let mut running_order: Vec<usize> = (0..256).collect();
        running_order.sort_by_key(|&b| ftab[(b + 1) << 8] - ftab[b << 8]);

        let mut copy = [0u32; 256];
        for (i, &ss) in running_order.iter().enumerate() {
            for j in 0..256 {
                let sb = (ss << 8) + j;
                if !bucket_done[sb] {
                    let lo = ftab[sb] as isize;
                    let hi = ftab[sb + 1] as isize - 1;
                    if hi > lo {
                        trace!(
                            "sorting bucket [{:#04x},{:#04x}], {} rotations",
                            ss,
                            j,
                            hi - lo + 1
                        );
                        self.q_sort3(lo, hi, 2);
                        if self.overran() {
                            return;
                        }
                    }
                    bucket_done[sb] = true;
                }
            }

            if i < 255 {
                // Give every rotation in this big bucket a 16-bit rank so
                // later deep comparisons can stop at the first rotation
                // that falls inside an already-sorted region.
                let bb_start = ftab[ss << 8] as usize;
                let bb_size = ftab[(ss + 1) << 8] as usize - bb_start;
                let mut shifts = 0;
                while (bb_size >> shifts) > 65534 {
                    shifts += 1;
                }
                for j in (0..bb_size).rev() {
                    let a2 = self.zptr[bb_start + j] as usize;
                    let q_val = (j >> shifts) as u16;
                    self.quadrant[a2] = q_val;
                    if a2 < OVERSHOOT {
                        self.quadrant[a2 + n] = q_val;
                    }
                }
                debug_assert!(bb_size == 0 || ((bb_size - 1) >> shifts) <= 65535);
            }

            // Induce the order of every [c, ss] bucket from the finished
            // [ss, *] range: the rotations one position to the left of a
            // sorted run appear in the same relative order.
            for (j, c) in copy.iter_mut().enumerate() {
                *c = ftab[(j << 8) + ss];
            }
            for j in ftab[ss << 8] as usize..ftab[(ss + 1) << 8] as usize {
                let k = if self.zptr[j] == 0 {
                    n - 1
                } else {
                    self.zptr[j] as usize - 1
                };
                let c1 = self.block[k] as usize;
                if !big_done[c1] {
                    self.zptr[copy[c1] as usize] = k as u32;
                    copy[c1] += 1;
                }
            }
            for j in 0..256 {
                bucket_done[(j << 8) + ss] = true;
            }
            big_done[ss] = true;
        }
    }

    fn sort(&mut self) {
        if self.n < SIMPLE_SORT_LIMIT {
            for (i, z) in self.zptr.iter_mut().enumerate() {
                *z = i as u32;
            }
            self.simple_sort(0, self.n as isize - 1, 0);
        } else {
            self.main_sort();
        }
    }
}

fn med3(a: u8, b: u8, c: u8) -> u8 {
    a.max(b).min(a.min(b).max(c))
}

/// Run the forward transform over one RLE1-encoded block.
pub fn bwt_encode(data: &[u8], work_factor: u32) -> Result<BwtOut, BzError> {
    let n = data.len();
    if n == 0 {
        return Ok(BwtOut {
            key: 0,
            bwt: Vec::new(),
            randomized: false,
        });
    }

    let mut randomized = false;
    let mut state = SortState::new(data, work_factor);
    state.sort();

    if state.overran() {
        // Too repetitive to sort within budget. Scramble and go again;
        // the scrambled block always sorts cheaply.
        warn!(
            "sort abandoned after {} units (limit {}), randomizing block",
            state.work_done, state.work_limit
        );
        let mut rng = Randomizer::new();
        let scrambled: Vec<u8> = data.iter().map(|&b| b ^ rng.next_mask()).collect();
        randomized = true;
        state = SortState::new(&scrambled, work_factor);
        state.first_attempt = false;
        state.sort();
    }

    let mut bwt = vec![0u8; n];
    let mut key = None;
    for k in 0..n {
        let z = state.zptr[k] as usize;
        if z == 0 {
            key = Some(k as u32);
        }
        bwt[k] = state.block[(z + n - 1) % n];
    }
    let key = key.ok_or(BzError::InternalConsistency("origin pointer not found"))?;
    Ok(BwtOut {
        key,
        bwt,
        randomized,
    })
}
