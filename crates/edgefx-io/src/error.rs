//! Error types for I/O operations.

use std::io;
use thiserror::Error;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unsupported container format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file decodes, but not to an 8-bit single-channel image.
    #[error("unsupported pixel format: {0} (8-bit single-channel required)")]
    UnsupportedPixelFormat(String),

    /// Decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Decoded data could not form a valid image buffer.
    #[error("invalid image: {0}")]
    InvalidImage(#[from] edgefx_core::Error),
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
