//! Error types for kafka-types crate.

use thiserror::Error;

/// Errors that can occur while parsing a wire envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("envelope too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("invalid magic byte: expected {expected:#04x}, got {actual:#04x}")]
    InvalidMagicByte { expected: u8, actual: u8 },
}

/// Result type alias for kafka-types operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
