//! Polar encoders and the successive-cancellation list decoder
//!
//! Codewords live in the NRZ domain: +1 carries bit 0, -1 carries bit 1,
//! and multiplication is exclusive-or. The list decoder runs sixteen paths
//! side by side as 16-wide int8 lanes; forks sort the doubled candidate set
//! by path metric and record a lane permutation, which is replayed lazily
//! through the tree and unwound over the decision history at the end.

use crate::polar_tables::FrozenTable;
use crate::{FecError, Result};
use hamburst_core::bits::set_le_bit;
use hamburst_core::crc::Crc32;
use hamburst_core::math::{madd, prod};

/// Number of decoder paths, one per int8 lane.
pub const LIST_SIZE: usize = 16;

type Lane = [i8; LIST_SIZE];
type LaneMap = [u8; LIST_SIZE];

const IDENTITY: LaneMap = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
// metric assigned to lanes that hold no live path yet
const DEAD: i64 = 1 << 40;

#[inline]
fn shuf(lane: Lane, map: LaneMap) -> Lane {
    let mut out = [0i8; LIST_SIZE];
    for k in 0..LIST_SIZE {
        out[k] = lane[map[k] as usize];
    }
    out
}

/// Non-systematic encoder: insert +1 at frozen positions, then run the
/// halving butterflies in place.
pub fn encode(codeword: &mut [i8], message: &[i8], frozen: &FrozenTable) {
    let n = codeword.len();
    debug_assert!(n.is_power_of_two());
    let mut msg = message.iter();
    let mut next = |i: usize| -> i8 {
        if frozen.is_frozen(i) {
            1
        } else {
            *msg.next().expect("message shorter than info count")
        }
    };
    for i in (0..n).step_by(2) {
        let m0 = next(i);
        let m1 = next(i + 1);
        codeword[i] = m0 * m1;
        codeword[i + 1] = m1;
    }
    butterflies(codeword);
}

fn butterflies(codeword: &mut [i8]) {
    let n = codeword.len();
    let mut h = 2;
    while h < n {
        for i in (0..n).step_by(2 * h) {
            for j in i..i + h {
                codeword[j] *= codeword[j + h];
            }
        }
        h *= 2;
    }
}

/// Systematic encoder: encode, then encode the codeword again with +1
/// re-inserted at the frozen positions. The result is a valid codeword
/// whose non-frozen positions equal the original message.
pub fn encode_systematic(codeword: &mut [i8], message: &[i8], frozen: &FrozenTable) {
    let n = codeword.len();
    encode(codeword, message, frozen);
    for i in (0..n).step_by(2) {
        let m0 = if frozen.is_frozen(i) { 1 } else { codeword[i] };
        let m1 = if frozen.is_frozen(i + 1) { 1 } else { codeword[i + 1] };
        codeword[i] = m0 * m1;
        codeword[i + 1] = m1;
    }
    butterflies(codeword);
}

/// Sixteen-lane successive-cancellation list decoder.
pub struct PolarListDecoder {
    order: u32,
    soft: Vec<Lane>,
    hard: Vec<Lane>,
    maps: Vec<LaneMap>,
    metric: [i64; LIST_SIZE],
    frozen_prefix: Vec<u32>,
    count: usize,
}

impl PolarListDecoder {
    pub fn new(order: u32) -> Result<Self> {
        if order < 1 || order > 20 {
            return Err(FecError::InvalidParameters {
                msg: format!("unsupported code order {}", order),
            });
        }
        let n = 1usize << order;
        Ok(Self {
            order,
            soft: vec![[0; LIST_SIZE]; 2 * n],
            hard: vec![[0; LIST_SIZE]; n],
            maps: Vec::with_capacity(n),
            metric: [0; LIST_SIZE],
            frozen_prefix: vec![0; n + 1],
            count: 0,
        })
    }

    /// Decode `code` into per-lane message decisions. `message` receives one
    /// lane vector per information bit, in natural bit order and final lane
    /// order; the returned metrics are per lane, smaller is better.
    pub fn decode(
        &mut self,
        message: &mut [Lane],
        code: &[i8],
        frozen: &FrozenTable,
    ) -> [i64; LIST_SIZE] {
        let n = 1usize << self.order;
        debug_assert_eq!(code.len(), n);
        self.metric = [DEAD; LIST_SIZE];
        self.metric[0] = 0;
        self.maps.clear();
        self.count = 0;
        for i in 0..n {
            self.frozen_prefix[i + 1] = self.frozen_prefix[i] + frozen.is_frozen(i) as u32;
        }
        for i in 0..n {
            self.soft[n + i] = [code[i]; LIST_SIZE];
        }
        self.node(self.order, 0, message);

        // express every recorded decision in the final lane order
        let mut acc = IDENTITY;
        for j in (0..self.count).rev() {
            let mut lane = [0i8; LIST_SIZE];
            let mut map = [0u8; LIST_SIZE];
            for k in 0..LIST_SIZE {
                lane[k] = message[j][acc[k] as usize];
                map[k] = self.maps[j][acc[k] as usize];
            }
            message[j] = lane;
            acc = map;
        }
        self.metric
    }

    fn node(&mut self, level: u32, base: usize, message: &mut [Lane]) -> LaneMap {
        let n = 1usize << level;
        if self.frozen_prefix[base + n] - self.frozen_prefix[base] == n as u32 {
            // rate-0 subtree: hard decisions are all +1
            for i in 0..n {
                self.hard[base + i] = [1; LIST_SIZE];
                let soft = self.soft[n + i];
                for k in 0..LIST_SIZE {
                    self.metric[k] += (-(soft[k] as i64)).max(0);
                }
            }
            return IDENTITY;
        }
        if n == 1 {
            return self.fork(base, message);
        }
        let h = n / 2;
        for i in 0..h {
            let a = self.soft[n + i];
            let b = self.soft[n + i + h];
            let mut out = [0i8; LIST_SIZE];
            for k in 0..LIST_SIZE {
                out[k] = prod(a[k], b[k]);
            }
            self.soft[h + i] = out;
        }
        let lmap = self.node(level - 1, base, message);
        for i in 0..h {
            let a = shuf(self.soft[n + i], lmap);
            let b = shuf(self.soft[n + i + h], lmap);
            let hard = self.hard[base + i];
            let mut out = [0i8; LIST_SIZE];
            for k in 0..LIST_SIZE {
                out[k] = madd(hard[k], a[k], b[k]);
            }
            self.soft[h + i] = out;
        }
        let rmap = self.node(level - 1, base + h, message);
        for i in 0..h {
            let left = shuf(self.hard[base + i], rmap);
            let right = self.hard[base + h + i];
            let mut out = [0i8; LIST_SIZE];
            for k in 0..LIST_SIZE {
                out[k] = left[k] * right[k];
            }
            self.hard[base + i] = out;
        }
        let mut out = [0u8; LIST_SIZE];
        for k in 0..LIST_SIZE {
            out[k] = lmap[rmap[k] as usize];
        }
        out
    }

    /// Information leaf: fork every path on both bit decisions, keep the
    /// best half of the doubled candidate set.
    fn fork(&mut self, base: usize, message: &mut [Lane]) -> LaneMap {
        let llr = self.soft[1];
        let mut cand = [(0i64, 0u8, 0i8); 2 * LIST_SIZE];
        for k in 0..LIST_SIZE {
            let penalty_pos = (-(llr[k] as i64)).max(0);
            let penalty_neg = (llr[k] as i64).max(0);
            cand[2 * k] = (self.metric[k] + penalty_pos, k as u8, 1);
            cand[2 * k + 1] = (self.metric[k] + penalty_neg, k as u8, -1);
        }
        cand.sort_by_key(|&(metric, lane, _)| (metric, lane));
        let mut map = [0u8; LIST_SIZE];
        let mut dec = [0i8; LIST_SIZE];
        for k in 0..LIST_SIZE {
            let (metric, lane, bit) = cand[k];
            self.metric[k] = metric;
            map[k] = lane;
            dec[k] = bit;
        }
        self.hard[base] = dec;
        message[self.count] = dec;
        self.maps.push(map);
        self.count += 1;
        map
    }
}

/// CRC-32 aided decoder: list-decode, re-encode every surviving path and
/// take the first whose systematic data stream passes the CRC.
pub struct PolarDecoder {
    list: PolarListDecoder,
    crc: Crc32,
    lanes: Vec<Lane>,
    path: Vec<i8>,
    reencoded: Vec<i8>,
}

impl PolarDecoder {
    pub fn new(order: u32) -> Result<Self> {
        let n = 1usize << order;
        Ok(Self {
            list: PolarListDecoder::new(order)?,
            crc: Crc32::new(CRC_POLY),
            lanes: vec![[0; LIST_SIZE]; n],
            path: vec![0; n],
            reencoded: vec![0; n],
        })
    }

    /// Decode `code` and scatter the recovered data bits into `data_out`
    /// (little-endian bit order). Returns the number of corrected bit
    /// flips, or -1 if no list path passes the CRC.
    pub fn decode(
        &mut self,
        data_out: &mut [u8],
        code: &[i8],
        frozen: &FrozenTable,
        data_bits: usize,
    ) -> i32 {
        let n = code.len();
        let info_bits = data_bits + 32;
        debug_assert_eq!(frozen.info_count(), info_bits);
        let metrics = self.list.decode(&mut self.lanes, code, frozen);
        for lane in 0..LIST_SIZE {
            if metrics[lane] >= DEAD {
                continue;
            }
            for i in 0..info_bits {
                self.path[i] = self.lanes[i][lane];
            }
            encode(&mut self.reencoded, &self.path[..info_bits], frozen);
            self.crc.reset();
            for i in 0..n {
                if !frozen.is_frozen(i) {
                    self.crc.update_bit(self.reencoded[i] < 0);
                }
            }
            if self.crc.value() != 0 {
                continue;
            }
            let mut flips = 0;
            for i in 0..n {
                if (code[i] < 0) != (self.reencoded[i] < 0) {
                    flips += 1;
                }
            }
            let mut bit = 0;
            for i in 0..n {
                if frozen.is_frozen(i) {
                    continue;
                }
                if bit < data_bits {
                    set_le_bit(data_out, bit, self.reencoded[i] < 0);
                }
                bit += 1;
            }
            return flips;
        }
        -1
    }
}

/// Payload CRC polynomial (reflected).
pub const CRC_POLY: u32 = 0x8F6E_37A0;
