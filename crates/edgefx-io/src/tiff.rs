//! TIFF format support.
//!
//! Reads 8-bit grayscale TIFFs; writes Gray8 with LZW compression.

use crate::{HostImage, IoError, IoResult};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Reads a TIFF file from the given path.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<HostImage> {
    use tiff::ColorType;
    use tiff::decoder::{Decoder, DecodingResult};

    let file = File::open(path.as_ref())?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e: tiff::TiffError| IoError::DecodeError(e.to_string()))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e: tiff::TiffError| IoError::DecodeError(e.to_string()))?;
    let color_type = decoder
        .colortype()
        .map_err(|e: tiff::TiffError| IoError::DecodeError(e.to_string()))?;

    if color_type != ColorType::Gray(8) {
        return Err(IoError::UnsupportedPixelFormat(format!("TIFF {:?}", color_type)));
    }

    match decoder
        .read_image()
        .map_err(|e: tiff::TiffError| IoError::DecodeError(e.to_string()))?
    {
        DecodingResult::U8(buf) => Ok(HostImage::from_vec(width, height, buf)?),
        _ => Err(IoError::DecodeError("TIFF Gray8 decoded to a non-u8 buffer".into())),
    }
}

/// Writes an image to an LZW-compressed Gray8 TIFF file.
pub fn write<P: AsRef<Path>>(path: P, image: &HostImage) -> IoResult<()> {
    use tiff::encoder::{Compression, TiffEncoder, colortype};

    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e: tiff::TiffError| IoError::EncodeError(e.to_string()))?
        .with_compression(Compression::Lzw);

    encoder
        .write_image::<colortype::Gray8>(image.width(), image.height(), &image.to_packed())
        .map_err(|e: tiff::TiffError| IoError::EncodeError(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_gray8() {
        let data: Vec<u8> = (0..19 * 11).map(|i| (i * 3 % 256) as u8).collect();
        let image = HostImage::from_vec(19, 11, data).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.tif");
        write(&path, &image).unwrap();

        let loaded = read(&path).unwrap();
        assert!(loaded.same_pixels(&image));
    }
}
