//! # edgefx-io
//!
//! Reads and writes 8-bit single-channel images as [`HostImage`] buffers.
//!
//! | Format | Read | Write | Notes                          |
//! |--------|------|-------|--------------------------------|
//! | PNG    | Yes  | Yes   | 1/2/4/8-bit gray (expanded)    |
//! | PGM    | Yes  | Yes   | P5 binary, P2 ASCII, maxval<256 |
//! | JPEG   | Yes  | Yes   | Luma only, lossy               |
//! | TIFF   | Yes  | Yes   | Gray8, LZW on write            |
//!
//! Color or 16-bit inputs are rejected with
//! [`IoError::UnsupportedPixelFormat`]; no conversion is attempted.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use edgefx_io::{read, write};
//!
//! let image = read("input.pgm")?;
//! write("output.png", &image)?;
//! ```
//!
//! # Feature Flags
//!
//! - `png`, `jpeg`, `tiff`, `pnm` - codecs (all on by default)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod detect;
mod error;

#[cfg(feature = "png")]
pub mod png;

#[cfg(feature = "pnm")]
pub mod pnm;

#[cfg(feature = "jpeg")]
pub mod jpeg;

#[cfg(feature = "tiff")]
pub mod tiff;

pub use detect::Format;
pub use edgefx_core::HostImage;
pub use error::{IoError, IoResult};

use std::path::Path;
use tracing::debug;

/// Reads an image from a file, auto-detecting the format.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be opened
/// - The format is not supported
/// - The file is corrupted or not 8-bit single-channel
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<HostImage> {
    let path = path.as_ref();
    let format = Format::detect(path)?;
    debug!(path = %path.display(), ?format, "reading image");

    match format {
        #[cfg(feature = "png")]
        Format::Png => png::read(path),

        #[cfg(feature = "pnm")]
        Format::Pgm => pnm::read(path),

        #[cfg(feature = "jpeg")]
        Format::Jpeg => jpeg::read(path),

        #[cfg(feature = "tiff")]
        Format::Tiff => tiff::read(path),

        _ => Err(IoError::UnsupportedFormat(format!(
            "cannot read {}",
            path.display()
        ))),
    }
}

/// Writes an image to a file, choosing the format from the extension.
///
/// # Errors
///
/// Returns an error if the extension is not a supported format or the
/// destination cannot be written.
pub fn write<P: AsRef<Path>>(path: P, image: &HostImage) -> IoResult<()> {
    let path = path.as_ref();
    let format = Format::from_extension(path);
    debug!(path = %path.display(), ?format, size = %image.size(), "writing image");

    match format {
        #[cfg(feature = "png")]
        Format::Png => png::write(path, image),

        #[cfg(feature = "pnm")]
        Format::Pgm => pnm::write(path, image),

        #[cfg(feature = "jpeg")]
        Format::Jpeg => jpeg::write(path, image),

        #[cfg(feature = "tiff")]
        Format::Tiff => tiff::write(path, image),

        _ => Err(IoError::UnsupportedFormat(format!(
            "cannot write {}",
            path.display()
        ))),
    }
}

/// True if `path` has the extension of a format this build can read.
pub fn is_supported_path<P: AsRef<Path>>(path: P) -> bool {
    Format::from_extension(path).is_supported()
}
