//! FFT processing wrapper
//!
//! Owns forward and inverse plans plus scratch for one transform size. The
//! planner factors composite sizes (the OFDM symbol lengths 1280, 2560,
//! 5120, 7056, and 7680 all decompose over small primes), so any size the
//! symbol geometry produces is usable.

use crate::math::Complex32;
use crate::{CoreError, Result};
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub struct FftProcessor {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex32>,
}

impl FftProcessor {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(CoreError::FftError {
                msg: "FFT size must be nonzero".to_string(),
            });
        }
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        Ok(Self {
            size,
            fft,
            ifft,
            scratch: vec![Complex32::default(); scratch_len],
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// In-place forward DFT, unnormalized.
    pub fn forward(&mut self, buffer: &mut [Complex32]) -> Result<()> {
        self.check(buffer.len())?;
        self.fft.process_with_scratch(buffer, &mut self.scratch);
        Ok(())
    }

    /// In-place inverse DFT, normalized by 1/N so it inverts `forward`.
    pub fn inverse(&mut self, buffer: &mut [Complex32]) -> Result<()> {
        self.check(buffer.len())?;
        self.ifft.process_with_scratch(buffer, &mut self.scratch);
        let scale = 1.0 / self.size as f32;
        for value in buffer.iter_mut() {
            *value *= scale;
        }
        Ok(())
    }

    fn check(&self, len: usize) -> Result<()> {
        if len != self.size {
            return Err(CoreError::BufferSizeMismatch {
                expected: self.size,
                actual: len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::polar;
    use std::f32::consts::TAU;

    #[test]
    fn test_roundtrip_at_symbol_size() {
        let size = 7680;
        let mut fft = FftProcessor::new(size).unwrap();
        let mut rng = crate::prng::Xorshift32::new();
        let original: Vec<Complex32> = (0..size)
            .map(|_| {
                Complex32::new(
                    rng.next() as f32 / u32::MAX as f32 - 0.5,
                    rng.next() as f32 / u32::MAX as f32 - 0.5,
                )
            })
            .collect();
        let mut buffer = original.clone();
        fft.forward(&mut buffer).unwrap();
        fft.inverse(&mut buffer).unwrap();
        let num: f32 = buffer
            .iter()
            .zip(&original)
            .map(|(a, b)| (a - b).norm_sqr())
            .sum();
        let den: f32 = original.iter().map(|v| v.norm_sqr()).sum();
        assert!((num / den).sqrt() < 1e-3);
    }

    #[test]
    fn test_parseval() {
        let size = 128;
        let mut fft = FftProcessor::new(size).unwrap();
        let mut rng = crate::prng::Xorshift32::new();
        let time: Vec<Complex32> = (0..size)
            .map(|_| {
                Complex32::new(
                    rng.next() as f32 / u32::MAX as f32 - 0.5,
                    rng.next() as f32 / u32::MAX as f32 - 0.5,
                )
            })
            .collect();
        let mut freq = time.clone();
        fft.forward(&mut freq).unwrap();
        let time_energy: f32 = time.iter().map(|v| v.norm_sqr()).sum();
        let freq_energy: f32 = freq.iter().map(|v| v.norm_sqr()).sum::<f32>() / size as f32;
        assert!((time_energy - freq_energy).abs() < 0.01 * time_energy);
    }

    #[test]
    fn test_pure_exponential_concentrates() {
        let size = 1280;
        let bin = 240;
        let mut fft = FftProcessor::new(size).unwrap();
        let mut buffer: Vec<Complex32> = (0..size)
            .map(|n| polar(1.0, TAU * bin as f32 * n as f32 / size as f32))
            .collect();
        fft.forward(&mut buffer).unwrap();
        let total: f32 = buffer.iter().map(|v| v.norm_sqr()).sum();
        assert!(buffer[bin].norm_sqr() > 0.99 * total);
        assert!((buffer[bin].norm() - size as f32).abs() < 1.0);
    }
}
