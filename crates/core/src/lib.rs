//! Hamburst Core - DSP primitives and signal processing
//!
//! This crate provides the fundamental building blocks of the hamburst
//! OFDM modem: saturating fixed-point math, bit-addressable buffers,
//! pseudo-random and maximum-length sequences, CRC engines, streaming
//! filters, sliding-window aggregates, FFT wrappers, and peak-to-average
//! power reduction.

pub mod bits;
pub mod buffer;
pub mod crc;
pub mod error;
pub mod fft;
pub mod filter;
pub mod math;
pub mod osc;
pub mod papr;
pub mod prng;
pub mod sma;
pub mod trigger;
pub mod window;

pub use error::{CoreError, Result};
pub use math::Complex32;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        buffer::{BipBuffer, DelayLine},
        crc::Crc,
        error::{CoreError, Result},
        fft::FftProcessor,
        filter::{DcBlocker, Hilbert},
        math::Complex32,
        osc::Phasor,
        papr::PaprReducer,
        prng::{Mls, Xorshift32},
        sma::{ComplexSma, RealSma},
        trigger::{FallingEdge, SchmittTrigger},
    };
}
