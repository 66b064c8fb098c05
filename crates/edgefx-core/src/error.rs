//! Error types for edgefx-core operations.
//!
//! Covers the failure modes of building and addressing host image buffers:
//! bad dimensions, bad pitch, mismatched backing storage and regions that
//! fall outside an image.
//!
//! # Usage
//!
//! ```rust
//! use edgefx_core::{Error, HostImage};
//!
//! let err = HostImage::from_vec(4, 4, vec![0u8; 10]).unwrap_err();
//! assert!(matches!(err, Error::BufferSizeMismatch { expected: 16, actual: 10 }));
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while constructing or addressing host image buffers.
#[derive(Debug, Error)]
pub enum Error {
    /// Width or height is zero (or too large to address).
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Row pitch is smaller than the row width.
    #[error("pitch {pitch} is smaller than row width {width}")]
    InvalidPitch {
        /// Requested pitch in bytes
        pitch: usize,
        /// Row width in bytes
        width: u32,
    },

    /// Backing storage does not match `pitch * height`.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Required byte count
        expected: usize,
        /// Supplied byte count
        actual: usize,
    },

    /// Region of interest extends beyond image bounds.
    #[error("region ({rx}, {ry}, {rw}x{rh}) exceeds image bounds {width}x{height}")]
    InvalidRegion {
        /// Region X origin
        rx: u32,
        /// Region Y origin
        ry: u32,
        /// Region width
        rw: u32,
        /// Region height
        rh: u32,
        /// Image width
        width: u32,
        /// Image height
        height: u32,
    },
}

impl Error {
    /// Creates an [`Error::InvalidDimensions`].
    pub fn invalid_dimensions(width: u32, height: u32) -> Self {
        Self::InvalidDimensions { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_dimensions(0, 10);
        assert_eq!(err.to_string(), "invalid dimensions: 0x10");

        let err = Error::InvalidPitch { pitch: 3, width: 8 };
        assert!(err.to_string().contains("pitch 3"));

        let err = Error::InvalidRegion { rx: 5, ry: 5, rw: 10, rh: 10, width: 8, height: 8 };
        assert!(err.to_string().contains("8x8"));
    }
}
