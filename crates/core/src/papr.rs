//! Peak-to-average power reduction
//!
//! Iterative-clipping style crest factor control for one OFDM symbol: the
//! sparse frequency vector is zero-padded to an oversampled grid, taken to
//! the time domain, clipped to unit magnitude, and transformed back. Only
//! the originally active bins are restored; everything else returns to zero,
//! so the subcarrier set is preserved exactly.

use crate::fft::FftProcessor;
use crate::math::Complex32;
use crate::Result;

/// Oversampling factor used for a given sample rate.
pub fn oversample_factor(sample_rate: u32) -> usize {
    ((32000 + sample_rate / 2) / sample_rate) as usize
}

pub struct PaprReducer {
    length: usize,
    factor: usize,
    fft: FftProcessor,
    work: Vec<Complex32>,
    active: Vec<usize>,
}

impl PaprReducer {
    pub fn new(length: usize, factor: usize) -> Result<Self> {
        let factor = factor.max(1);
        Ok(Self {
            length,
            factor,
            fft: FftProcessor::new(factor * length)?,
            work: vec![Complex32::default(); factor * length],
            active: Vec::with_capacity(length),
        })
    }

    /// Clip the symbol in an oversampled time domain and write the flattened
    /// spectrum back onto the active bins of `freq`.
    pub fn reduce(&mut self, freq: &mut [Complex32]) -> Result<()> {
        debug_assert_eq!(freq.len(), self.length);
        let over = self.factor * self.length;
        let half = self.length / 2;
        let scale = (over as f32).sqrt();

        self.active.clear();
        self.work.fill(Complex32::default());
        for (bin, &value) in freq.iter().enumerate() {
            if value.norm_sqr() > 0.0 {
                self.active.push(bin);
                // keep the wrap-around layout: low half stays, high half
                // moves to the top of the oversampled grid
                let mapped = if bin < half { bin } else { over - self.length + bin };
                self.work[mapped] = value;
            }
        }

        self.fft.inverse(&mut self.work)?;
        for value in self.work.iter_mut() {
            *value *= scale;
            let power = value.norm_sqr();
            if power > 1.0 {
                *value /= power.sqrt();
            }
        }
        self.fft.forward(&mut self.work)?;

        freq.fill(Complex32::default());
        for &bin in self.active.iter() {
            let mapped = if bin < half { bin } else { over - self.length + bin };
            freq[bin] = self.work[mapped] / scale;
        }
        Ok(())
    }
}
