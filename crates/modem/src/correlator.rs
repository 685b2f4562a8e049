//! Schmidl-Cox synchronization
//!
//! Coarse acquisition runs three sliding aggregates over the sample window:
//! the lag-L/2 autocorrelation P, the signal power R, and the normalized
//! timing metric M matched-filtered over a guard length. A Schmitt trigger
//! on the filtered metric marks the detection plateau and its falling edge
//! starts fine synchronization: fractional CFO from the correlation phase,
//! an FFT of a window anchored a fixed distance back from the edge, and a
//! cyclic cross-correlation of the frequency differential against the known
//! sequence. The peak bin gives the integer carrier shift, its phase the
//! timing refinement modulo half a symbol (the waveform occupies only even
//! bins, so half-symbol slips are invisible here and are resolved later by
//! the preamble checksum).

use crate::params::{SymbolGeometry, COR_SEQ_LEN, COR_SEQ_OFF, COR_SEQ_POLY};
use crate::Result;
use hamburst_core::buffer::DelayLine;
use hamburst_core::fft::FftProcessor;
use hamburst_core::math::{nrz, Complex32};
use hamburst_core::prng::Mls;
use hamburst_core::sma::{ComplexSma, RealSma};
use hamburst_core::trigger::{FallingEdge, SchmittTrigger};
use std::f32::consts::{PI, TAU};
use tracing::debug;

/// A sync candidate: the refined symbol position inside the window that was
/// handed to `process`, and the full carrier frequency offset.
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub position: usize,
    pub cfo_rad: f32,
    pub timing: f32,
}

pub struct SchmidlCox {
    symbol_length: usize,
    buffer_length: usize,
    search_position: usize,
    test_back: usize,
    cor: ComplexSma,
    pwr: RealSma,
    matched: RealSma,
    delay: DelayLine,
    schmitt: SchmittTrigger,
    falling: FallingEdge,
    timing_max: f32,
    phase_max: f32,
    fft: FftProcessor,
    kernel: Vec<Complex32>,
    work: Vec<Complex32>,
    diff: Vec<Complex32>,
}

impl SchmidlCox {
    pub fn new(geometry: &SymbolGeometry) -> Result<Self> {
        let symbol_length = geometry.symbol_length();
        let guard_length = geometry.guard_length();
        let buffer_length = geometry.buffer_length();
        let match_len = guard_length | 1;
        let match_del = (match_len - 1) / 2;
        let search_position = buffer_length - symbol_length - guard_length - match_del;
        let test_back = symbol_length + symbol_length / 4 + match_del;

        let mut fft = FftProcessor::new(symbol_length)?;
        // differential of the nominal sequence placement, transformed once
        let mut seq = Mls::new(COR_SEQ_POLY);
        let mut kernel = vec![Complex32::default(); symbol_length];
        for i in 0..COR_SEQ_LEN {
            let bin = geometry.bin(2 * i as i32 + COR_SEQ_OFF);
            kernel[bin] = Complex32::new(nrz(seq.next()), 0.0);
        }
        fft.forward(&mut kernel)?;

        Ok(Self {
            symbol_length,
            buffer_length,
            search_position,
            test_back,
            cor: ComplexSma::new(symbol_length),
            pwr: RealSma::new(2 * symbol_length),
            matched: RealSma::new(match_len),
            delay: DelayLine::new(match_del),
            schmitt: SchmittTrigger::new(0.17 * match_len as f32, 0.19 * match_len as f32),
            falling: FallingEdge::new(),
            timing_max: 0.0,
            phase_max: 0.0,
            fft,
            kernel,
            work: vec![Complex32::default(); symbol_length],
            diff: vec![Complex32::default(); symbol_length],
        })
    }

    /// Frequency-domain sequence for the transmitter, placed relative to
    /// `carrier_bin`. The differential seed two bins below the sequence
    /// start carries the amplitude that equalizes symbol power against the
    /// payload symbols.
    pub fn transmit_sequence(geometry: &SymbolGeometry, carrier_bin: i32, freq: &mut [Complex32]) {
        freq.fill(Complex32::default());
        let mut seq = Mls::new(COR_SEQ_POLY);
        let mut value = Complex32::new(std::f32::consts::SQRT_2, 0.0);
        freq[geometry.bin(COR_SEQ_OFF - 2 + carrier_bin)] = value;
        for i in 0..COR_SEQ_LEN {
            value *= nrz(seq.next());
            freq[geometry.bin(2 * i as i32 + COR_SEQ_OFF + carrier_bin)] = value;
        }
    }

    /// Consume the window ending at the newest sample. Returns a detection
    /// once per burst, on the falling edge of the timing metric.
    pub fn process(&mut self, view: &[Complex32]) -> Option<Detection> {
        debug_assert_eq!(view.len(), self.buffer_length);
        let sp = self.search_position;
        let half = self.symbol_length / 2;

        let p = self.cor.push(view[sp].conj() * view[sp + half]);
        let r = 0.5 * self.pwr.push(view[sp + self.symbol_length].norm_sqr());
        let r = r.max(1e-9 * self.symbol_length as f32);
        let timing = self.matched.push(p.norm_sqr() / (r * r));
        let delayed = self.delay.push(p);

        let collect = self.schmitt.process(timing);
        let edge = self.falling.process(collect);
        if collect && timing > self.timing_max {
            self.timing_max = timing;
            self.phase_max = delayed.arg();
        }
        if !edge {
            return None;
        }
        let peak_timing = self.timing_max;
        self.timing_max = 0.0;

        let frac_cfo = 2.0 * self.phase_max / self.symbol_length as f32;
        let test = self.search_position - self.test_back;

        // mix the fractional offset out and transform
        for (t, w) in self.work.iter_mut().enumerate() {
            let phase = -frac_cfo * t as f32;
            *w = view[test + t] * Complex32::new(phase.cos(), phase.sin());
        }
        if self.fft.forward(&mut self.work).is_err() {
            return None;
        }

        // erase quiet bins, flatten the rest to unit modulus
        let mean = self.work.iter().map(|v| v.norm_sqr()).sum::<f32>() / self.symbol_length as f32;
        for v in self.work.iter_mut() {
            let power = v.norm_sqr();
            *v = if power > mean { *v / power.sqrt() } else { Complex32::default() };
        }

        // correlate the two-bin frequency differential against the kernel
        // over all cyclic shifts
        let len = self.symbol_length;
        for k in 0..len {
            self.diff[k] = self.work[k] * self.work[(k + len - 2) % len].conj();
        }
        if self.fft.forward(&mut self.diff).is_err() {
            return None;
        }
        for (d, k) in self.diff.iter_mut().zip(self.kernel.iter()) {
            *d *= k.conj();
        }
        if self.fft.inverse(&mut self.diff).is_err() {
            return None;
        }

        let mut peak = 0.0f32;
        let mut second = 0.0f32;
        let mut peak_bin = 0usize;
        for (i, v) in self.diff.iter().enumerate() {
            let power = v.norm_sqr();
            if power > peak {
                second = peak;
                peak = power;
                peak_bin = i;
            } else if power > second {
                second = power;
            }
        }
        if peak <= 4.0 * second {
            debug!(peak, second, "correlation peak not distinct, dropping candidate");
            return None;
        }

        let shift = if peak_bin <= len / 2 {
            peak_bin as i32
        } else {
            peak_bin as i32 - len as i32
        };
        let refine =
            (-self.diff[peak_bin].arg() * len as f32 / (2.0 * TAU)).round() as i32;
        let mut cfo_rad = shift as f32 * TAU / len as f32 + frac_cfo;
        if cfo_rad > PI {
            cfo_rad -= TAU;
        } else if cfo_rad <= -PI {
            cfo_rad += TAU;
        }
        let position = test as i32 + refine;
        if position < 0 || position as usize + self.symbol_length > self.buffer_length {
            return None;
        }
        debug!(position, shift, refine, cfo_rad, peak_timing, "sync candidate");
        Some(Detection {
            position: position as usize,
            cfo_rad,
            timing: peak_timing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SymbolGeometry;

    #[test]
    fn test_no_detection_on_silence() {
        let geometry = SymbolGeometry::new(8000).unwrap();
        let mut cor = SchmidlCox::new(&geometry).unwrap();
        let view = vec![Complex32::default(); geometry.buffer_length()];
        for _ in 0..3 * geometry.extended_length() {
            assert!(cor.process(&view).is_none());
        }
    }

    #[test]
    fn test_transmit_sequence_occupies_even_bins() {
        let geometry = SymbolGeometry::new(8000).unwrap();
        let mut freq = vec![Complex32::default(); geometry.symbol_length()];
        SchmidlCox::transmit_sequence(&geometry, 240, &mut freq);
        let occupied: Vec<usize> = freq
            .iter()
            .enumerate()
            .filter(|(_, v)| v.norm_sqr() > 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(occupied.len(), COR_SEQ_LEN + 1);
        for &bin in occupied.iter() {
            // all populated bins share the seed's parity
            assert_eq!(bin % 2, geometry.bin(COR_SEQ_OFF - 2 + 240) % 2);
        }
    }
}
