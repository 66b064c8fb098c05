//! JPEG format support.
//!
//! Decodes luma-only JPEGs and encodes [`HostImage`] buffers as
//! single-component JPEGs. Encoding is lossy: a save/load cycle keeps the
//! dimensions but not the exact pixel values.

use crate::{HostImage, IoError, IoResult};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default encoder quality (1-100).
pub const DEFAULT_QUALITY: u8 = 90;

/// Reads a JPEG file from the given path.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<HostImage> {
    let file = File::open(path.as_ref())?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));
    let pixels = decoder
        .decode()
        .map_err(|e| IoError::DecodeError(e.to_string()))?;

    let info = decoder
        .info()
        .ok_or_else(|| IoError::DecodeError("missing JPEG info".into()))?;

    match info.pixel_format {
        jpeg_decoder::PixelFormat::L8 => Ok(HostImage::from_vec(
            info.width as u32,
            info.height as u32,
            pixels,
        )?),
        other => Err(IoError::UnsupportedPixelFormat(format!("JPEG {:?}", other))),
    }
}

/// Writes an image to a JPEG file with [`DEFAULT_QUALITY`].
pub fn write<P: AsRef<Path>>(path: P, image: &HostImage) -> IoResult<()> {
    write_with_quality(path, image, DEFAULT_QUALITY)
}

/// Writes an image to a JPEG file with an explicit quality.
pub fn write_with_quality<P: AsRef<Path>>(path: P, image: &HostImage, quality: u8) -> IoResult<()> {
    use jpeg_encoder::{ColorType, Encoder};

    let (width, height) = (image.width(), image.height());
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(IoError::EncodeError(format!(
            "{}x{} exceeds the JPEG size limit",
            width, height
        )));
    }

    let encoder = Encoder::new_file(path.as_ref(), quality.clamp(1, 100))
        .map_err(|e| IoError::EncodeError(e.to_string()))?;
    encoder
        .encode(&image.to_packed(), width as u16, height as u16, ColorType::Luma)
        .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;

    Ok(())
}
