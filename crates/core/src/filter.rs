//! Streaming filters: DC blocker and Hilbert transformer

use crate::math::Complex32;
use crate::window::kaiser;
use crate::{CoreError, Result};

/// One-pole DC blocking high-pass.
///
/// For a window of `length` samples the pole sits at a = (length-1)/length
/// with gain correction b = (1+a)/2.
#[derive(Debug, Clone)]
pub struct DcBlocker {
    a: f32,
    b: f32,
    x_prev: f32,
    y_prev: f32,
}

impl DcBlocker {
    pub fn new(length: usize) -> Self {
        let a = (length as f32 - 1.0) / length as f32;
        Self {
            a,
            b: (1.0 + a) / 2.0,
            x_prev: 0.0,
            y_prev: 0.0,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b * (input - self.x_prev) + self.a * self.y_prev;
        self.x_prev = input;
        self.y_prev = output;
        output
    }

    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }
}

/// Streaming Hilbert transformer emitting the analytic signal.
///
/// Kaiser-windowed FIR whose tap count must be odd with (taps-1)/2 even, so
/// the center tap passes the real branch while the odd taps feed the
/// imaginary branch.
#[derive(Debug, Clone)]
pub struct Hilbert {
    coeff: Vec<f32>,
    line: Vec<f32>,
    index: usize,
}

impl Hilbert {
    /// Tap count for a sample rate, scaled from 33 taps at 8 kHz.
    pub fn taps_for_rate(sample_rate: u32) -> usize {
        (((33 * sample_rate as usize / 8000) & !3) | 1).max(5)
    }

    pub fn new(taps: usize, beta: f32) -> Result<Self> {
        if taps < 5 || taps % 4 != 1 {
            return Err(CoreError::InvalidFilterParameters {
                msg: format!("Hilbert tap count must be 1 mod 4, got {}", taps),
            });
        }
        let center = (taps - 1) / 2;
        let mut coeff = vec![0.0f32; taps];
        for (i, c) in coeff.iter_mut().enumerate() {
            let k = i as isize - center as isize;
            if k % 2 != 0 {
                *c = 2.0 / (std::f32::consts::PI * k as f32) * kaiser(beta, i, taps);
            }
        }
        Ok(Self {
            coeff,
            line: vec![0.0; taps],
            index: 0,
        })
    }

    /// Push one real sample, get the analytic sample (delayed by the filter
    /// group delay).
    pub fn process(&mut self, input: f32) -> Complex32 {
        let taps = self.line.len();
        self.line[self.index] = input;
        let center = (taps - 1) / 2;
        let re = self.line[(self.index + taps - center) % taps];
        let mut im = 0.0f32;
        for (i, &c) in self.coeff.iter().enumerate() {
            if c != 0.0 {
                im += c * self.line[(self.index + taps - i) % taps];
            }
        }
        self.index = (self.index + 1) % taps;
        Complex32::new(re, im)
    }

    pub fn reset(&mut self) {
        self.line.fill(0.0);
        self.index = 0;
    }
}
