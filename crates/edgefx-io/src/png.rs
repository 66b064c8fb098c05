//! PNG format support.
//!
//! Reads grayscale PNGs (sub-byte depths are expanded to 8 bits) and writes
//! 8-bit grayscale.
//!
//! # Example
//!
//! ```rust,ignore
//! use edgefx_io::png::{read, write};
//!
//! let image = read("input.png")?;
//! write("output.png", &image)?;
//! ```

use crate::{HostImage, IoError, IoResult};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Reads a PNG file from the given path.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<HostImage> {
    let file = File::open(path.as_ref())?;
    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::EXPAND);
    let mut reader = decoder
        .read_info()
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("cannot determine output buffer size".into()))?;
    let mut buf = vec![0u8; buf_size];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

    match (info.color_type, info.bit_depth) {
        (png::ColorType::Grayscale, png::BitDepth::Eight) => {
            buf.truncate(info.buffer_size());
            Ok(HostImage::from_vec_with_pitch(
                info.width,
                info.height,
                info.line_size,
                buf,
            )?)
        }
        (color_type, bit_depth) => Err(IoError::UnsupportedPixelFormat(format!(
            "PNG {:?} {:?}",
            color_type, bit_depth
        ))),
    }
}

/// Writes an image to an 8-bit grayscale PNG file.
pub fn write<P: AsRef<Path>>(path: P, image: &HostImage) -> IoResult<()> {
    let file = File::create(path.as_ref())?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, image.width(), image.height());
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::default());

    let mut png_writer = encoder
        .write_header()
        .map_err(|e| IoError::EncodeError(e.to_string()))?;

    png_writer
        .write_image_data(&image.to_packed())
        .map_err(|e| IoError::EncodeError(e.to_string()))?;
    png_writer
        .finish()
        .map_err(|e| IoError::EncodeError(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_gray() {
        let (width, height) = (33, 17);
        let data: Vec<u8> = (0..width * height).map(|i| (i * 5) as u8).collect();
        let image = HostImage::from_vec(width, height, data).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");

        write(&path, &image).expect("Failed to write PNG");
        let loaded = read(&path).expect("Failed to read PNG");

        assert_eq!(loaded.width(), width);
        assert_eq!(loaded.height(), height);
        assert!(loaded.same_pixels(&image));
    }

    #[test]
    fn test_rgb_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = png::Encoder::new(BufWriter::new(file), 2, 2);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut w = encoder.write_header().unwrap();
            w.write_image_data(&[0u8; 12]).unwrap();
        }

        assert!(matches!(read(&path), Err(IoError::UnsupportedPixelFormat(_))));
    }
}
