//! Burst encoder
//!
//! Turns one payload plus callsign into a sequence of OFDM symbols pulled
//! out one `produce` call at a time: optional noise leader, two
//! Schmidl-Cox symbols, the BCH-protected preamble, four polar-coded
//! payload symbols, an optional callsign banner, and a closing silence.
//! Every symbol is assembled on frequency bins, crest-reduced, inverse
//! transformed, and spliced to its neighbour with a raised-cosine guard
//! cross-fade.

use crate::correlator::SchmidlCox;
use crate::font;
use crate::params::{
    ModemConfig, OperationMode, SymbolGeometry, CODE_ORDER, FANCY_SYM_CNT, NOISE_POLY,
    PAYLOAD_BYTES, PAY_CAR_CNT, PAY_CAR_OFF, PAY_SYM_CNT, PRE_SEQ_LEN, PRE_SEQ_OFF, PRE_SEQ_POLY,
};
use crate::{base37, meta, Result};
use hamburst_core::bits::{get_be_bit, get_le_bit};
use hamburst_core::crc::Crc32;
use hamburst_core::fft::FftProcessor;
use hamburst_core::math::{nrz, Complex32};
use hamburst_core::papr::{oversample_factor, PaprReducer};
use hamburst_core::prng::{Mls, Xorshift32};
use hamburst_fec::bch::BchEncoder;
use hamburst_fec::polar;
use std::f32::consts::{FRAC_1_SQRT_2, PI};
use tracing::debug;

pub struct Encoder {
    geometry: SymbolGeometry,
    fft: FftProcessor,
    papr: PaprReducer,
    bch: BchEncoder,
    freq: Vec<Complex32>,
    body: Vec<Complex32>,
    guard_tail: Vec<Complex32>,
    prev: [Complex32; PAY_CAR_CNT],
    code: Vec<i8>,
    preamble_bits: [u8; 32],
    mode: OperationMode,
    call_sign: u64,
    carrier_bin: i32,
    count_down: u8,
    noise_left: usize,
    payload_symbol: usize,
    fancy_header: bool,
    fancy_line: usize,
    noise_seq: Mls,
}

impl Encoder {
    pub fn new(config: &ModemConfig) -> Result<Self> {
        let geometry = SymbolGeometry::new(config.sample_rate)?;
        let length = geometry.symbol_length();
        Ok(Self {
            geometry,
            fft: FftProcessor::new(length)?,
            papr: PaprReducer::new(length, oversample_factor(config.sample_rate))?,
            bch: BchEncoder::new(),
            freq: vec![Complex32::default(); length],
            body: vec![Complex32::default(); length],
            guard_tail: vec![Complex32::default(); geometry.guard_length()],
            prev: [Complex32::default(); PAY_CAR_CNT],
            code: vec![0; 1 << CODE_ORDER],
            preamble_bits: [0; 32],
            mode: OperationMode::Ping,
            call_sign: 0,
            carrier_bin: 0,
            count_down: 0,
            noise_left: 0,
            payload_symbol: 0,
            fancy_header: false,
            fancy_line: 0,
            noise_seq: Mls::new(NOISE_POLY),
        })
    }

    pub fn extended_length(&self) -> usize {
        self.geometry.extended_length()
    }

    /// Arm the encoder with one message. The payload is truncated to 170
    /// bytes, the callsign to nine characters; the mode follows from the
    /// payload length.
    pub fn configure(
        &mut self,
        payload: &[u8],
        call_sign: &str,
        carrier_hz: f32,
        noise_symbols: usize,
        fancy_header: bool,
    ) {
        let length = payload.len().min(PAYLOAD_BYTES);
        self.mode = OperationMode::for_length(length);
        self.call_sign = base37::encode(call_sign);
        self.carrier_bin = self.geometry.carrier_bin(carrier_hz);

        let md = meta::pack(self.call_sign, self.mode.id());
        let mut data = [0u8; 9];
        meta::to_bits(md, &mut data);
        self.bch.encode(&mut self.preamble_bits, &data);

        if let Some(frozen) = self.mode.frozen_table() {
            let data_bytes = self.mode.data_bytes();
            let mut scrambler = Xorshift32::new();
            let mut mesg = [0u8; PAYLOAD_BYTES];
            for (i, m) in mesg.iter_mut().take(data_bytes).enumerate() {
                *m = payload.get(i).copied().unwrap_or(0) ^ scrambler.next_byte();
            }
            let mut crc = Crc32::new(polar::CRC_POLY);
            crc.update(&mesg[..data_bytes]);
            let checksum = crc.value();

            let data_bits = self.mode.data_bits();
            let mut message = vec![0i8; data_bits + 32];
            for (i, m) in message.iter_mut().take(data_bits).enumerate() {
                *m = if get_le_bit(&mesg, i) { -1 } else { 1 };
            }
            for i in 0..32 {
                message[data_bits + i] = if (checksum >> i) & 1 != 0 { -1 } else { 1 };
            }
            polar::encode_systematic(&mut self.code, &message, frozen);
        }

        self.count_down = 5;
        self.noise_left = noise_symbols;
        self.payload_symbol = 0;
        self.fancy_header = fancy_header;
        self.fancy_line = 0;
        self.noise_seq = Mls::new(NOISE_POLY);
        self.guard_tail.fill(Complex32::default());
        self.prev.fill(Complex32::default());
        debug!(mode = self.mode.id(), carrier_bin = self.carrier_bin, "encoder configured");
    }

    /// Write the next symbol. Returns false once the burst is complete, in
    /// which case the output is silence.
    pub fn produce(&mut self, samples: &mut [i16]) -> bool {
        debug_assert_eq!(samples.len(), self.geometry.extended_length());
        match self.count_down {
            5 => {
                if self.noise_left > 0 {
                    self.noise_left -= 1;
                    self.noise_symbol();
                } else {
                    self.count_down = 4;
                    SchmidlCox::transmit_sequence(&self.geometry, self.carrier_bin, &mut self.freq);
                }
                self.emit(samples, false);
                true
            }
            4 => {
                self.count_down = 3;
                SchmidlCox::transmit_sequence(&self.geometry, self.carrier_bin, &mut self.freq);
                self.emit(samples, false);
                true
            }
            3 => {
                self.count_down = if self.mode == OperationMode::Ping { 1 } else { 2 };
                self.preamble_symbol();
                self.emit(samples, false);
                true
            }
            2 => {
                let sym = self.payload_symbol;
                self.payload_symbol += 1;
                if self.payload_symbol == PAY_SYM_CNT {
                    self.count_down = 1;
                }
                self.payload_symbol_freq(sym);
                self.emit(samples, false);
                true
            }
            1 => {
                if self.fancy_header && self.fancy_line < FANCY_SYM_CNT {
                    let line = self.fancy_line;
                    self.fancy_line += 1;
                    self.fancy_symbol(line);
                    self.emit(samples, false);
                } else {
                    self.count_down = 0;
                    self.emit(samples, true);
                }
                true
            }
            _ => {
                samples.fill(0);
                false
            }
        }
    }

    fn noise_symbol(&mut self) {
        self.freq.fill(Complex32::default());
        for i in 0..PAY_CAR_CNT {
            let re = nrz(self.noise_seq.next());
            let im = nrz(self.noise_seq.next());
            self.freq[self.geometry.bin(i as i32 + PAY_CAR_OFF + self.carrier_bin)] =
                Complex32::new(re, im) * FRAC_1_SQRT_2;
        }
    }

    /// Differential BPSK of the BCH block across the preamble bins, each
    /// bin scrambled by the preamble sequence. The placed values seed the
    /// payload differential chain.
    fn preamble_symbol(&mut self) {
        self.freq.fill(Complex32::default());
        let mut seq = Mls::new(PRE_SEQ_POLY);
        let mut value = Complex32::new(1.0, 0.0);
        let seed_bin = self.geometry.bin(PRE_SEQ_OFF - 1 + self.carrier_bin);
        let seed = value * nrz(seq.next());
        self.freq[seed_bin] = seed;
        self.prev[0] = seed;
        for i in 0..PRE_SEQ_LEN {
            value *= nrz(get_be_bit(&self.preamble_bits, i));
            let scrambled = value * nrz(seq.next());
            self.freq[self.geometry.bin(i as i32 + PRE_SEQ_OFF + self.carrier_bin)] = scrambled;
            self.prev[i + 1] = scrambled;
        }
    }

    fn payload_symbol_freq(&mut self, sym: usize) {
        self.freq.fill(Complex32::default());
        for i in 0..PAY_CAR_CNT {
            let b0 = self.code[2 * (PAY_CAR_CNT * sym + i)] as f32;
            let b1 = self.code[2 * (PAY_CAR_CNT * sym + i) + 1] as f32;
            self.prev[i] *= Complex32::new(b0, b1) * FRAC_1_SQRT_2;
            self.freq[self.geometry.bin(i as i32 + PAY_CAR_OFF + self.carrier_bin)] = self.prev[i];
        }
    }

    /// One pixel row of the callsign banner on 72 carriers.
    fn fancy_symbol(&mut self, line: usize) {
        self.freq.fill(Complex32::default());
        let call = base37::decode(self.call_sign, base37::CALLSIGN_LEN);
        for (pos, ch) in call.bytes().enumerate() {
            let digit = match ch {
                b'0'..=b'9' => ch - b'0' + 1,
                b'A'..=b'Z' => ch - b'A' + 11,
                _ => 0,
            };
            let row = font::glyph(digit as usize)[line];
            for col in 0..font::GLYPH_COLS {
                if row & (0x80 >> col) != 0 {
                    let carrier = (pos * font::GLYPH_COLS + col) as i32 - 36;
                    self.freq[self.geometry.bin(carrier + self.carrier_bin)] =
                        Complex32::new(nrz(self.noise_seq.next()), 0.0);
                }
            }
        }
    }

    /// Crest-reduce, transform, cross-fade the guard, and write int16.
    fn emit(&mut self, samples: &mut [i16], silence: bool) {
        let length = self.geometry.symbol_length();
        let guard = self.geometry.guard_length();
        if silence {
            self.body.fill(Complex32::default());
        } else {
            let _ = self.papr.reduce(&mut self.freq);
            self.body.copy_from_slice(&self.freq);
            let _ = self.fft.inverse(&mut self.body);
            let scale = (length as f32 / 8.0).sqrt();
            for v in self.body.iter_mut() {
                *v *= scale;
            }
        }
        let to_int = |x: f32| -> i16 {
            (32767.0 * x).round().clamp(-32767.0, 32767.0) as i16
        };
        for i in 0..guard {
            let x = (i as f32 / (guard - 1) as f32).min(0.5) / 0.5;
            let y = 0.5 * (1.0 - (PI * x).cos());
            let faded = self.guard_tail[i] * (1.0 - y) + self.body[length - guard + i] * y;
            samples[i] = to_int(faded.re);
        }
        for i in 0..length {
            samples[guard + i] = to_int(self.body[i].re);
        }
        self.guard_tail.copy_from_slice(&self.body[..guard]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ModemConfig;

    fn collect_burst(text: &str, call: &str) -> (usize, Vec<i16>) {
        let config = ModemConfig::default();
        let mut encoder = Encoder::new(&config).unwrap();
        encoder.configure(text.as_bytes(), call, 1500.0, 0, false);
        let e = encoder.extended_length();
        let mut wave = Vec::new();
        let mut block = vec![0i16; e];
        let mut symbols = 0;
        while encoder.produce(&mut block) {
            symbols += 1;
            wave.extend_from_slice(&block);
        }
        (symbols, wave)
    }

    #[test]
    fn test_symbol_count_with_payload() {
        let (symbols, wave) = collect_burst("HELLO", "TEST");
        // two sync, preamble, four payload, silence
        assert_eq!(symbols, 8);
        assert_eq!(wave.len(), 8 * 1440);
    }

    #[test]
    fn test_symbol_count_ping() {
        let (symbols, _) = collect_burst("", "TEST");
        // two sync, preamble, silence
        assert_eq!(symbols, 4);
    }

    #[test]
    fn test_output_stays_in_range() {
        let (_, wave) = collect_burst("CQ CQ CQ", "W1AW");
        let peak = wave.iter().map(|&v| (v as i32).abs()).max().unwrap();
        assert!(peak <= 32767);
        assert!(peak > 1000, "burst suspiciously quiet: {peak}");
    }

    #[test]
    fn test_fancy_header_extends_burst() {
        let config = ModemConfig::default();
        let mut encoder = Encoder::new(&config).unwrap();
        encoder.configure(b"HI", "TEST", 1500.0, 0, true);
        let mut block = vec![0i16; encoder.extended_length()];
        let mut symbols = 0;
        while encoder.produce(&mut block) {
            symbols += 1;
        }
        assert_eq!(symbols, 8 + FANCY_SYM_CNT);
    }
}
