//! Error types for hamburst core

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid filter parameters: {msg}")]
    InvalidFilterParameters { msg: String },

    #[error("FFT error: {msg}")]
    FftError { msg: String },

    #[error("Shift register polynomial 0x{poly:x} does not generate a maximal sequence")]
    NotMaximalLength { poly: u32 },
}

/// Result type for hamburst core operations
pub type Result<T> = std::result::Result<T, CoreError>;
