//! Waveform parameters: symbol geometry, operation modes, status codes
//!
//! Everything here is part of the wire contract; the encoder and decoder
//! derive identical bin positions and sequence constants from one
//! `SymbolGeometry`.

use crate::{ModemError, Result};
use hamburst_fec::polar_tables::{
    FrozenTable, FROZEN_2048_1056, FROZEN_2048_1392, FROZEN_2048_712,
};
use serde::{Deserialize, Serialize};

/// Payload buffer size in bytes; shorter messages are null-terminated.
pub const PAYLOAD_BYTES: usize = 170;

/// Payload subcarriers per OFDM symbol.
pub const PAY_CAR_CNT: usize = 256;
/// First payload subcarrier relative to the carrier bin.
pub const PAY_CAR_OFF: i32 = -128;
/// OFDM symbols carrying payload.
pub const PAY_SYM_CNT: usize = 4;
/// Coded bits per burst: 4 symbols x 256 carriers x 2 bits.
pub const CODE_BITS: usize = 2 * PAY_SYM_CNT * PAY_CAR_CNT;
/// log2 of the polar code length.
pub const CODE_ORDER: u32 = 11;

/// Correlation-sequence shift register polynomial (degree 7, period 127).
pub const COR_SEQ_POLY: u32 = 0b1000_1001;
/// Bits in the correlation sequence.
pub const COR_SEQ_LEN: usize = 127;
/// First correlation-sequence bin relative to the carrier; the sequence
/// occupies every second bin, seeded two bins below.
pub const COR_SEQ_OFF: i32 = -126;

/// Preamble scrambler polynomial (degree 8, period 255).
pub const PRE_SEQ_POLY: u32 = 0b1_0010_1011;
/// Bits on the preamble symbol.
pub const PRE_SEQ_LEN: usize = 255;
/// First preamble bin relative to the carrier (the differential seed sits
/// one bin lower).
pub const PRE_SEQ_OFF: i32 = -127;

/// Noise-symbol scrambler polynomial (degree 11).
pub const NOISE_POLY: u32 = 0b1001_0101_0001;

/// Preamble integrity checksum polynomial (reflected).
pub const CRC16_POLY: u16 = 0xA8F4;

/// Number of fancy-header symbols (one per pixel row).
pub const FANCY_SYM_CNT: usize = 11;

const SUPPORTED_RATES: [u32; 5] = [8000, 16000, 32000, 44100, 48000];

/// Decoder status, one per `process` call. Numeric values are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    /// Nothing to report, keep feeding.
    Ok = 0,
    /// A sync candidate failed preamble decoding.
    Fail = 1,
    /// Preamble accepted, payload symbols follow.
    Sync = 2,
    /// All payload symbols demodulated; call `fetch`.
    Done = 3,
    /// Reserved, never emitted.
    Heap = 4,
    /// Preamble valid but mode or callsign unusable.
    Nope = 5,
    /// Preamble-only transmission.
    Ping = 6,
}

/// Input channel selection for multi-channel audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Channel {
    #[default]
    Mono = 0,
    Left = 1,
    Right = 2,
    Sum = 3,
    /// Interpret (left, right) as (in-phase, quadrature); bypasses the
    /// analytic front end.
    Iq = 4,
}

/// Transmission mode, selecting payload capacity and polar code rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationMode {
    /// Mode 0: preamble only.
    Ping,
    /// Mode 14: 170 payload bytes.
    Long,
    /// Mode 15: 128 payload bytes.
    Medium,
    /// Mode 16: 85 payload bytes.
    Short,
}

impl OperationMode {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Ping),
            14 => Some(Self::Long),
            15 => Some(Self::Medium),
            16 => Some(Self::Short),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Self::Ping => 0,
            Self::Long => 14,
            Self::Medium => 15,
            Self::Short => 16,
        }
    }

    /// Smallest mode that fits `length` payload bytes.
    pub fn for_length(length: usize) -> Self {
        match length {
            0 => Self::Ping,
            1..=85 => Self::Short,
            86..=128 => Self::Medium,
            _ => Self::Long,
        }
    }

    pub fn data_bits(self) -> usize {
        match self {
            Self::Ping => 0,
            Self::Long => 1360,
            Self::Medium => 1024,
            Self::Short => 680,
        }
    }

    pub fn data_bytes(self) -> usize {
        self.data_bits() / 8
    }

    pub fn frozen_table(self) -> Option<&'static FrozenTable> {
        match self {
            Self::Ping => None,
            Self::Long => Some(&FROZEN_2048_1392),
            Self::Medium => Some(&FROZEN_2048_1056),
            Self::Short => Some(&FROZEN_2048_712),
        }
    }
}

/// Symbol geometry derived from the sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolGeometry {
    sample_rate: u32,
    symbol_length: usize,
    guard_length: usize,
}

impl SymbolGeometry {
    pub fn new(sample_rate: u32) -> Result<Self> {
        if !SUPPORTED_RATES.contains(&sample_rate) {
            return Err(ModemError::UnsupportedSampleRate { rate: sample_rate });
        }
        let symbol_length = 1280 * sample_rate as usize / 8000;
        Ok(Self {
            sample_rate,
            symbol_length,
            guard_length: symbol_length / 8,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn symbol_length(&self) -> usize {
        self.symbol_length
    }

    pub fn guard_length(&self) -> usize {
        self.guard_length
    }

    pub fn extended_length(&self) -> usize {
        self.symbol_length + self.guard_length
    }

    /// History kept by the decoder's sample buffer.
    pub fn buffer_length(&self) -> usize {
        4 * self.extended_length()
    }

    /// Map a carrier index (possibly negative) onto an FFT bin.
    #[inline]
    pub fn bin(&self, carrier: i32) -> usize {
        carrier.rem_euclid(self.symbol_length as i32) as usize
    }

    /// Bin offset of a carrier frequency in Hz.
    pub fn carrier_bin(&self, carrier_hz: f32) -> i32 {
        (carrier_hz * self.symbol_length as f32 / self.sample_rate as f32).round() as i32
    }

    /// Radians per sample for a bin offset.
    pub fn bin_to_rad(&self, bin: i32) -> f32 {
        std::f32::consts::TAU * bin as f32 / self.symbol_length as f32
    }
}

/// Static modem configuration shared by hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModemConfig {
    pub sample_rate: u32,
    pub carrier_hz: f32,
    pub channel: Channel,
    pub noise_symbols: usize,
    pub fancy_header: bool,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            carrier_hz: 1500.0,
            channel: Channel::Mono,
            noise_symbols: 0,
            fancy_header: false,
        }
    }
}
