//! Numerically controlled oscillator

use crate::math::{polar, Complex32};
use std::f32::consts::TAU;

/// Unit-modulus phasor advanced by one complex multiply per sample.
///
/// The magnitude is re-normalized on every step, so the rotator never
/// spirals in or out over long runs.
#[derive(Debug, Clone)]
pub struct Phasor {
    state: Complex32,
    delta: Complex32,
}

impl Phasor {
    pub fn new() -> Self {
        Self {
            state: Complex32::new(1.0, 0.0),
            delta: Complex32::new(1.0, 0.0),
        }
    }

    /// Set the per-sample phase increment in radians.
    pub fn omega(&mut self, radians: f32) {
        self.delta = polar(1.0, radians);
    }

    /// Set the per-sample phase increment in cycles.
    pub fn freq(&mut self, cycles: f32) {
        self.omega(TAU * cycles);
    }

    /// Restart at phase zero.
    pub fn reset(&mut self) {
        self.state = Complex32::new(1.0, 0.0);
    }

    /// Current phasor value; advances the state afterwards.
    pub fn next(&mut self) -> Complex32 {
        let out = self.state;
        self.state *= self.delta;
        self.state *= 0.5 * (3.0 - self.state.norm_sqr());
        out
    }
}

impl Default for Phasor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_matches_polar() {
        let mut osc = Phasor::new();
        osc.omega(0.25);
        for n in 0..100 {
            let v = osc.next();
            let want = polar(1.0, 0.25 * n as f32);
            assert!((v - want).norm() < 1e-4, "sample {n}");
        }
    }

    #[test]
    fn test_magnitude_stays_unit() {
        let mut osc = Phasor::new();
        osc.freq(0.01);
        let mut worst = 0.0f32;
        for _ in 0..100_000 {
            worst = worst.max((osc.next().norm() - 1.0).abs());
        }
        assert!(worst < 1e-3, "drift {worst}");
    }
}
