//! Ordered-statistics decoding, reprocessing order 2
//!
//! Soft-decision decoder for the preamble's BCH block: sort positions by
//! reliability, bring the permuted generator matrix to systematic form over
//! the most reliable coordinates, then test the hard-decision codeword and
//! every single and double flip of the information set. The winner must beat
//! the runner-up strictly, otherwise the block is rejected.

use crate::bch::{CODE_BITS, CODE_BYTES, DATA_BITS};
use hamburst_core::bits::get_be_bit;

pub struct OrderedStatisticsDecoder {
    perm: [u16; CODE_BITS],
    rows: Vec<[u8; CODE_BYTES]>,
    soft_perm: [i8; CODE_BITS],
}

impl OrderedStatisticsDecoder {
    pub fn new() -> Self {
        Self {
            perm: [0; CODE_BITS],
            rows: vec![[0; CODE_BYTES]; DATA_BITS],
            soft_perm: [0; CODE_BITS],
        }
    }

    /// Decode `soft` (positive favors bit 0) against the systematic
    /// generator matrix. On success writes the codeword, natural bit order,
    /// into `hard` and returns true.
    pub fn decode(
        &mut self,
        hard: &mut [u8; CODE_BYTES],
        soft: &[i8; CODE_BITS],
        genmat: &[[u8; CODE_BYTES]],
    ) -> bool {
        debug_assert_eq!(genmat.len(), DATA_BITS);
        for (i, p) in self.perm.iter_mut().enumerate() {
            *p = i as u16;
        }
        let perm = &mut self.perm;
        perm.sort_by_key(|&i| (std::cmp::Reverse(soft[i as usize].unsigned_abs()), i));

        // generator with columns permuted by reliability
        for (r, row) in self.rows.iter_mut().enumerate() {
            row.fill(0);
            for (j, &p) in perm.iter().enumerate() {
                if get_be_bit(&genmat[r], p as usize) {
                    row[j / 8] |= 0x80 >> (j % 8);
                }
            }
        }

        // systematize the leading DATA_BITS columns, pivoting columns when a
        // pivot is missing
        let bit = |row: &[u8; CODE_BYTES], j: usize| row[j / 8] & (0x80 >> (j % 8)) != 0;
        for col in 0..DATA_BITS {
            let mut pivot = (col..DATA_BITS).find(|&r| bit(&self.rows[r], col));
            if pivot.is_none() {
                'search: for c2 in col + 1..CODE_BITS {
                    for r in col..DATA_BITS {
                        if bit(&self.rows[r], c2) {
                            for row in self.rows.iter_mut() {
                                let b1 = bit(row, col);
                                let b2 = bit(row, c2);
                                if b1 != b2 {
                                    row[col / 8] ^= 0x80 >> (col % 8);
                                    row[c2 / 8] ^= 0x80 >> (c2 % 8);
                                }
                            }
                            perm.swap(col, c2);
                            pivot = Some(r);
                            break 'search;
                        }
                    }
                }
            }
            let Some(pivot) = pivot else { return false };
            self.rows.swap(col, pivot);
            let lead = self.rows[col];
            for (r, row) in self.rows.iter_mut().enumerate() {
                if r != col && bit(row, col) {
                    for (a, b) in row.iter_mut().zip(lead.iter()) {
                        *a ^= b;
                    }
                }
            }
        }

        for (j, &p) in perm.iter().enumerate() {
            self.soft_perm[j] = soft[p as usize];
        }

        // hard decisions on the most reliable coordinates
        let mut base = [0u8; CODE_BYTES];
        for j in 0..DATA_BITS {
            if self.soft_perm[j] < 0 {
                for (a, b) in base.iter_mut().zip(self.rows[j].iter()) {
                    *a ^= b;
                }
            }
        }

        let metric = |cw: &[u8; CODE_BYTES], soft_perm: &[i8; CODE_BITS]| -> i64 {
            let mut sum = 0i64;
            for (j, &s) in soft_perm.iter().enumerate() {
                if cw[j / 8] & (0x80 >> (j % 8)) != 0 {
                    sum -= s as i64;
                } else {
                    sum += s as i64;
                }
            }
            sum
        };

        let mut best = metric(&base, &self.soft_perm);
        let mut second = i64::MIN;
        let mut best_cw = base;
        let mut consider = |cw: [u8; CODE_BYTES], soft_perm: &[i8; CODE_BITS]| {
            let m = metric(&cw, soft_perm);
            if m > best {
                second = best;
                best = m;
                best_cw = cw;
            } else if m > second {
                second = m;
            }
        };

        for i in 0..DATA_BITS {
            let mut cand = base;
            for (a, b) in cand.iter_mut().zip(self.rows[i].iter()) {
                *a ^= b;
            }
            consider(cand, &self.soft_perm);
        }
        for i in 0..DATA_BITS {
            let mut flip_i = base;
            for (a, b) in flip_i.iter_mut().zip(self.rows[i].iter()) {
                *a ^= b;
            }
            for j in i + 1..DATA_BITS {
                let mut cand = flip_i;
                for (a, b) in cand.iter_mut().zip(self.rows[j].iter()) {
                    *a ^= b;
                }
                consider(cand, &self.soft_perm);
            }
        }

        if best == second {
            return false;
        }
        hard.fill(0);
        for (j, &p) in perm.iter().enumerate() {
            if best_cw[j / 8] & (0x80 >> (j % 8)) != 0 {
                hard[p as usize / 8] |= 0x80 >> (p % 8);
            }
        }
        true
    }
}

impl Default for OrderedStatisticsDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bch::BchEncoder;
    use hamburst_core::prng::Xorshift32;

    fn encode_random(rng: &mut Xorshift32) -> ([u8; CODE_BYTES], [u8; 9]) {
        let enc = BchEncoder::new();
        let mut data = [0u8; 9];
        for b in data.iter_mut() {
            *b = rng.next_byte();
        }
        data[8] &= 0x80; // 71 bits
        let mut code = [0u8; CODE_BYTES];
        enc.encode(&mut code, &data);
        (code, data)
    }

    fn soft_of(code: &[u8; CODE_BYTES]) -> [i8; CODE_BITS] {
        let mut soft = [0i8; CODE_BITS];
        for (i, s) in soft.iter_mut().enumerate() {
            *s = if get_be_bit(code, i) { -127 } else { 127 };
        }
        soft
    }

    #[test]
    fn test_clean_codeword_decodes() {
        let mut rng = Xorshift32::new();
        let genmat = BchEncoder::new().generator_matrix();
        let mut osd = OrderedStatisticsDecoder::new();
        let (code, _) = encode_random(&mut rng);
        let soft = soft_of(&code);
        let mut hard = [0u8; CODE_BYTES];
        assert!(osd.decode(&mut hard, &soft, &genmat));
        for i in 0..CODE_BITS {
            assert_eq!(get_be_bit(&hard, i), get_be_bit(&code, i), "bit {i}");
        }
    }

    #[test]
    fn test_low_confidence_errors_corrected() {
        let mut rng = Xorshift32::new();
        let genmat = BchEncoder::new().generator_matrix();
        let mut osd = OrderedStatisticsDecoder::new();
        for _ in 0..4 {
            let (code, _) = encode_random(&mut rng);
            let mut soft = soft_of(&code);
            // flip a batch of positions with low confidence
            for _ in 0..18 {
                let p = (rng.next() % CODE_BITS as u32) as usize;
                soft[p] = if soft[p] > 0 { -9 } else { 9 };
            }
            let mut hard = [0u8; CODE_BYTES];
            assert!(osd.decode(&mut hard, &soft, &genmat));
            for i in 0..CODE_BITS {
                assert_eq!(get_be_bit(&hard, i), get_be_bit(&code, i), "bit {i}");
            }
        }
    }

    #[test]
    fn test_garbage_rejected_or_inexact() {
        // all-zero soft input carries no information; the strict tie rule
        // must reject it
        let genmat = BchEncoder::new().generator_matrix();
        let mut osd = OrderedStatisticsDecoder::new();
        let soft = [0i8; CODE_BITS];
        let mut hard = [0u8; CODE_BYTES];
        assert!(!osd.decode(&mut hard, &soft, &genmat));
    }
}
