//! Streaming burst decoder
//!
//! Long-lived consumer of int16 audio. Every sample runs through the
//! analytic front end into the history buffer and past the correlator;
//! every `extended_length` samples the window is snapshotted and one
//! status becomes available from `process`. A correlator hit replays the
//! preamble (trying the staged position and its half-symbol neighbours,
//! with the BCH checksum as referee), a success schedules four payload
//! symbols of differential QPSK demodulation, and `fetch` runs the polar
//! list decoder over the collected soft bits.

use crate::correlator::SchmidlCox;
use crate::params::{
    Channel, ModemConfig, OperationMode, Status, SymbolGeometry, CODE_ORDER, PAYLOAD_BYTES,
    PAY_CAR_CNT, PAY_CAR_OFF, PAY_SYM_CNT, PRE_SEQ_LEN, PRE_SEQ_POLY,
};
use crate::theilsen::TheilSen;
use crate::{base37, meta, Result};
use hamburst_core::buffer::BipBuffer;
use hamburst_core::fft::FftProcessor;
use hamburst_core::filter::{DcBlocker, Hilbert};
use hamburst_core::math::{nrz, polar as cpolar, Complex32};
use hamburst_core::osc::Phasor;
use hamburst_core::prng::{Mls, Xorshift32};
use hamburst_fec::bch::{BchEncoder, CODE_BITS as BCH_BITS, CODE_BYTES as BCH_BYTES};
use hamburst_fec::osd::OrderedStatisticsDecoder;
use hamburst_fec::polar::PolarDecoder;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, SQRT_2, TAU};
use tracing::{debug, trace};

/// Scale that saturates the int8 soft bits once the constellation is clean.
const SOFT_GAIN_LIMIT: f32 = 180.0;

/// Metadata of the most recent accepted preamble.
#[derive(Debug, Clone, Default)]
pub struct StagedInfo {
    pub cfo_hz: f32,
    pub mode: u8,
    pub call_sign: String,
}

#[derive(Debug, Clone, Copy)]
struct StoredHit {
    /// Global sample index of the expected preamble symbol body.
    position: i64,
    cfo_rad: f32,
}

pub struct Decoder {
    geometry: SymbolGeometry,
    channel: Channel,
    dc_blocker: DcBlocker,
    hilbert: Hilbert,
    buffer: BipBuffer,
    correlator: SchmidlCox,
    fft: FftProcessor,
    generator: Vec<[u8; BCH_BYTES]>,
    osd: OrderedStatisticsDecoder,
    polar: PolarDecoder,

    global: i64,
    accumulated: usize,
    stored: Option<StoredHit>,
    snapshot: Vec<Complex32>,
    snapshot_end: i64,

    staged_cfo_rad: f32,
    staged_mode: OperationMode,
    staged_call: u64,
    symbol_number: i32,
    view_position: usize,
    osc: Phasor,
    prev: [Complex32; PAY_CAR_CNT],
    code: Vec<i8>,
    work: Vec<Complex32>,
    points: Vec<(f32, f32)>,
    ratios: [Complex32; PAY_CAR_CNT],
}

impl Decoder {
    pub fn new(config: &ModemConfig) -> Result<Self> {
        let geometry = SymbolGeometry::new(config.sample_rate)?;
        let taps = Hilbert::taps_for_rate(config.sample_rate);
        Ok(Self {
            geometry,
            channel: config.channel,
            dc_blocker: DcBlocker::new(taps),
            hilbert: Hilbert::new(taps, TAU)?,
            buffer: BipBuffer::new(geometry.buffer_length()),
            correlator: SchmidlCox::new(&geometry)?,
            fft: FftProcessor::new(geometry.symbol_length())?,
            generator: BchEncoder::new().generator_matrix(),
            osd: OrderedStatisticsDecoder::new(),
            polar: PolarDecoder::new(CODE_ORDER)?,
            global: -1,
            accumulated: 0,
            stored: None,
            snapshot: vec![Complex32::default(); geometry.buffer_length()],
            snapshot_end: 0,
            staged_cfo_rad: 0.0,
            staged_mode: OperationMode::Ping,
            staged_call: 0,
            symbol_number: PAY_SYM_CNT as i32,
            view_position: 0,
            osc: Phasor::new(),
            prev: [Complex32::default(); PAY_CAR_CNT],
            code: vec![0; 1 << CODE_ORDER],
            work: vec![Complex32::default(); geometry.symbol_length()],
            points: Vec::with_capacity(PAY_CAR_CNT),
            ratios: [Complex32::default(); PAY_CAR_CNT],
        })
    }

    pub fn extended_length(&self) -> usize {
        self.geometry.extended_length()
    }

    /// Consume audio. Mono input is one value per sample; the other channel
    /// modes expect interleaved stereo pairs. Returns true when a status is
    /// ready, at most once per `extended_length` samples; call `process`
    /// before feeding more.
    pub fn feed(&mut self, samples: &[i16]) -> bool {
        let frames = match self.channel {
            Channel::Mono => samples.len(),
            _ => samples.len() / 2,
        };
        debug_assert!(frames <= self.geometry.extended_length());
        match self.channel {
            Channel::Mono => {
                for &s in samples {
                    self.push_real(s as f32 / 32768.0);
                }
            }
            Channel::Left => {
                for pair in samples.chunks_exact(2) {
                    self.push_real(pair[0] as f32 / 32768.0);
                }
            }
            Channel::Right => {
                for pair in samples.chunks_exact(2) {
                    self.push_real(pair[1] as f32 / 32768.0);
                }
            }
            Channel::Sum => {
                for pair in samples.chunks_exact(2) {
                    self.push_real((pair[0] as f32 + pair[1] as f32) / 65536.0);
                }
            }
            Channel::Iq => {
                for pair in samples.chunks_exact(2) {
                    let analytic =
                        Complex32::new(pair[0] as f32 / 32768.0, pair[1] as f32 / 32768.0);
                    self.push_analytic(analytic);
                }
            }
        }
        if self.accumulated >= self.geometry.extended_length() {
            self.accumulated -= self.geometry.extended_length();
            return true;
        }
        false
    }

    fn push_real(&mut self, sample: f32) {
        let filtered = self.dc_blocker.process(sample);
        let analytic = self.hilbert.process(filtered);
        self.push_analytic(analytic);
    }

    fn push_analytic(&mut self, sample: Complex32) {
        self.global += 1;
        let extended = self.geometry.extended_length();
        let buffer_length = self.geometry.buffer_length();
        let view = self.buffer.push(sample);
        if let Some(hit) = self.correlator.process(view) {
            self.stored = Some(StoredHit {
                position: self.global - buffer_length as i64
                    + 1
                    + hit.position as i64
                    + extended as i64,
                cfo_rad: hit.cfo_rad,
            });
        }
        self.accumulated += 1;
        if self.accumulated == extended {
            self.snapshot.copy_from_slice(view);
            self.snapshot_end = self.global;
        }
    }

    /// Handle the snapshot taken by the last `feed` boundary.
    pub fn process(&mut self) -> Status {
        let length = self.geometry.symbol_length() as i64;
        let buffer_length = self.geometry.buffer_length() as i64;
        if let Some(hit) = self.stored.take() {
            let base = hit.position - (self.snapshot_end - buffer_length + 1);
            let mut accepted = None;
            for candidate in [base, base + length / 2, base - length / 2] {
                if candidate < 0 || candidate + length > buffer_length {
                    continue;
                }
                if let Some(md) = self.try_preamble(candidate as usize, hit.cfo_rad) {
                    accepted = Some((candidate as usize, md));
                    break;
                }
            }
            let Some((position, md)) = accepted else {
                debug!("sync candidate failed preamble decode");
                return Status::Fail;
            };
            let call_sign = md >> 8;
            let mode_id = (md & 0xff) as u8;
            self.staged_cfo_rad = hit.cfo_rad;
            self.staged_call = call_sign;
            if mode_id == 0 {
                self.staged_mode = OperationMode::Ping;
                debug!(call_sign, "ping received");
                return Status::Ping;
            }
            let mode = OperationMode::from_id(mode_id);
            let Some(mode) = mode.filter(|m| m.frozen_table().is_some()) else {
                debug!(mode_id, "unsupported mode");
                return Status::Nope;
            };
            if call_sign >= base37::LIMIT {
                debug!(call_sign, "callsign out of range");
                return Status::Nope;
            }
            self.staged_mode = mode;
            self.view_position = position;
            // the preamble itself seeds the differential chain
            for i in 0..PAY_CAR_CNT {
                self.prev[i] = self.work[self.geometry.bin(i as i32 + PAY_CAR_OFF)];
            }
            for _ in 0..self.geometry.guard_length() {
                self.osc.next();
            }
            self.symbol_number = 0;
            debug!(mode = mode_id, call_sign, cfo = hit.cfo_rad, "sync");
            return Status::Sync;
        }
        if self.symbol_number < PAY_SYM_CNT as i32 {
            return self.payload_symbol();
        }
        Status::Ok
    }

    /// FFT the symbol at `position` against the staged oscillator and try
    /// to decode it as the preamble. On success `self.work` holds the
    /// transformed bins and the oscillator the post-symbol phase.
    fn try_preamble(&mut self, position: usize, cfo_rad: f32) -> Option<u64> {
        self.osc.reset();
        self.osc.omega(-cfo_rad);
        for (t, w) in self.work.iter_mut().enumerate() {
            *w = self.snapshot[position + t] * self.osc.next();
        }
        self.fft.forward(&mut self.work).ok()?;

        let mut seq = Mls::new(PRE_SEQ_POLY);
        let mut bins = [Complex32::default(); PRE_SEQ_LEN + 1];
        for (b, bin) in bins.iter_mut().enumerate() {
            let value = self.work[self.geometry.bin(b as i32 + PAY_CAR_OFF)];
            *bin = value * nrz(seq.next());
        }

        let mut soft = [0i8; BCH_BITS];
        let mut ratios = [Complex32::default(); PRE_SEQ_LEN];
        let mut hard_energy = 0.0f32;
        let mut error_energy = 0.0f32;
        for i in 0..PRE_SEQ_LEN {
            let ratio = demod_or_erase(bins[i + 1], bins[i]);
            ratios[i] = ratio;
            if ratio != Complex32::default() {
                let hard = if ratio.re >= 0.0 { 1.0 } else { -1.0 };
                hard_energy += 1.0;
                error_energy += (ratio - Complex32::new(hard, 0.0)).norm_sqr();
            }
        }
        let precision = if error_energy > 0.0 {
            (hard_energy / error_energy).min(1e6)
        } else {
            1e6
        };
        for (s, ratio) in soft.iter_mut().zip(ratios.iter()) {
            *s = quantize(precision * ratio.re);
        }

        let mut hard = [0u8; BCH_BYTES];
        if !self.osd.decode(&mut hard, &soft, &self.generator) {
            return None;
        }
        let (call_sign, mode) = meta::from_bits(&hard)?;
        Some((call_sign << 8) | mode as u64)
    }

    /// Demodulate the next payload symbol from the current snapshot.
    fn payload_symbol(&mut self) -> Status {
        let sym = self.symbol_number as usize;
        for (t, w) in self.work.iter_mut().enumerate() {
            *w = self.snapshot[self.view_position + t] * self.osc.next();
        }
        if self.fft.forward(&mut self.work).is_err() {
            return Status::Fail;
        }
        for _ in 0..self.geometry.guard_length() {
            self.osc.next();
        }

        let mut cur = [Complex32::default(); PAY_CAR_CNT];
        for (i, c) in cur.iter_mut().enumerate() {
            *c = self.work[self.geometry.bin(i as i32 + PAY_CAR_OFF)];
        }
        self.points.clear();
        for i in 0..PAY_CAR_CNT {
            let ratio = demod_or_erase(cur[i], self.prev[i]);
            self.ratios[i] = ratio;
            if ratio != Complex32::default() {
                self.points
                    .push(((i as i32 + PAY_CAR_OFF) as f32, qpsk_residual(ratio)));
            }
        }
        let fit = TheilSen::fit(&self.points);

        let mut hard_energy = 0.0f32;
        let mut error_energy = 0.0f32;
        for (i, ratio) in self.ratios.iter_mut().enumerate() {
            if *ratio != Complex32::default() {
                *ratio *= cpolar(1.0, -fit.evaluate((i as i32 + PAY_CAR_OFF) as f32));
                let unit = *ratio / ratio.norm();
                let hard = cpolar(1.0, qpsk_phase(unit.arg()));
                hard_energy += 1.0;
                error_energy += (unit - hard).norm_sqr();
            }
        }
        let gain = if error_energy > 0.0 {
            (hard_energy / error_energy).min(SOFT_GAIN_LIMIT)
        } else {
            SOFT_GAIN_LIMIT
        };
        for (i, ratio) in self.ratios.iter().enumerate() {
            let (b0, b1) = if *ratio == Complex32::default() {
                (0, 0)
            } else {
                (
                    quantize(gain * ratio.re * SQRT_2),
                    quantize(gain * ratio.im * SQRT_2),
                )
            };
            self.code[2 * (PAY_CAR_CNT * sym + i)] = b0;
            self.code[2 * (PAY_CAR_CNT * sym + i) + 1] = b1;
        }
        trace!(
            symbol = sym,
            carriers = self.points.len(),
            slope = fit.slope(),
            gain,
            "payload symbol demodulated"
        );
        self.prev = cur;
        self.symbol_number += 1;
        if self.symbol_number == PAY_SYM_CNT as i32 {
            debug!("payload complete");
            return Status::Done;
        }
        Status::Ok
    }

    /// Metadata of the most recent `Sync` or `Ping`.
    pub fn staged(&self) -> StagedInfo {
        StagedInfo {
            cfo_hz: self.staged_cfo_rad * self.geometry.sample_rate() as f32 / TAU,
            mode: self.staged_mode.id(),
            call_sign: base37::decode(self.staged_call, base37::CALLSIGN_LEN),
        }
    }

    /// Run the polar decoder over the demodulated soft bits. Writes the
    /// descrambled payload (null-padded to 170 bytes) and returns the
    /// number of corrected bit flips, or -1 when every list path fails the
    /// checksum.
    pub fn fetch(&mut self, payload: &mut [u8]) -> i32 {
        debug_assert!(payload.len() >= PAYLOAD_BYTES);
        payload[..PAYLOAD_BYTES].fill(0);
        let Some(frozen) = self.staged_mode.frozen_table() else {
            return -1;
        };
        let data_bits = self.staged_mode.data_bits();
        let data_bytes = self.staged_mode.data_bytes();
        let mut data = [0u8; PAYLOAD_BYTES];
        let flips = self
            .polar
            .decode(&mut data[..data_bytes], &self.code, frozen, data_bits);
        if flips < 0 {
            return -1;
        }
        let mut scrambler = Xorshift32::new();
        for i in 0..data_bytes {
            payload[i] = data[i] ^ scrambler.next_byte();
        }
        flips
    }
}

/// Ratio of two bins, erased to zero when the reference is empty or the
/// magnitude jump is implausible.
fn demod_or_erase(cur: Complex32, prev: Complex32) -> Complex32 {
    if prev.norm_sqr() <= 0.0 {
        return Complex32::default();
    }
    let ratio = cur / prev;
    if ratio.norm_sqr() > 4.0 {
        return Complex32::default();
    }
    ratio
}

/// Phase of the nearest QPSK constellation point.
fn qpsk_phase(angle: f32) -> f32 {
    FRAC_PI_4 + FRAC_PI_2 * ((angle - FRAC_PI_4) / FRAC_PI_2).round()
}

/// Phase residual against the nearest QPSK constellation point.
fn qpsk_residual(ratio: Complex32) -> f32 {
    let angle = ratio.arg();
    angle - qpsk_phase(angle)
}

fn quantize(value: f32) -> i8 {
    value.round().clamp(-127.0, 127.0) as i8
}
