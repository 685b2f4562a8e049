//! Error types for the hamburst modem

use thiserror::Error;

/// Modem error types
#[derive(Error, Debug)]
pub enum ModemError {
    #[error("Unsupported sample rate: {rate}")]
    UnsupportedSampleRate { rate: u32 },

    #[error(transparent)]
    Core(#[from] hamburst_core::CoreError),

    #[error(transparent)]
    Fec(#[from] hamburst_fec::FecError),
}

/// Result type for hamburst modem operations
pub type Result<T> = std::result::Result<T, ModemError>;
