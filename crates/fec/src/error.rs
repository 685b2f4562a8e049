//! Error types for hamburst FEC

use thiserror::Error;

/// FEC error types
#[derive(Error, Debug)]
pub enum FecError {
    #[error("Invalid code parameters: {msg}")]
    InvalidParameters { msg: String },
}

/// Result type for hamburst FEC operations
pub type Result<T> = std::result::Result<T, FecError>;
