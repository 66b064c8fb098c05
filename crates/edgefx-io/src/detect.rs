//! Format detection utilities.
//!
//! Detects image formats from file extensions and magic bytes.

use crate::IoResult;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// PNG format.
    Png,
    /// Portable graymap (binary P5 or ASCII P2).
    Pgm,
    /// JPEG format.
    Jpeg,
    /// TIFF format.
    Tiff,
    /// Unknown/unsupported format.
    Unknown,
}

impl Format {
    /// Detects format from file path (magic bytes, then extension).
    pub fn detect<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let path = path.as_ref();

        let format = Self::from_magic_bytes(path)?;
        if format != Format::Unknown {
            return Ok(format);
        }

        Ok(Self::from_extension(path))
    }

    /// Detects format from file extension only.
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("png") => Format::Png,
            Some("pgm") | Some("pnm") => Format::Pgm,
            Some("jpg") | Some("jpeg") => Format::Jpeg,
            Some("tif") | Some("tiff") => Format::Tiff,
            _ => Format::Unknown,
        }
    }

    /// Detects format from file magic bytes.
    pub fn from_magic_bytes<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let mut file = File::open(path)?;
        let mut header = [0u8; 8];

        let bytes_read = file.read(&mut header)?;
        Ok(Self::from_bytes(&header[..bytes_read]))
    }

    /// Detects format from raw bytes (magic number check).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        // PNG: 0x89 0x50 0x4E 0x47 0x0D 0x0A 0x1A 0x0A
        if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
            return Format::Png;
        }

        // JPEG: 0xFF 0xD8 0xFF
        if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
            return Format::Jpeg;
        }

        // TIFF: II (little-endian) or MM (big-endian)
        if bytes.len() >= 4
            && (bytes[0..4] == [0x49, 0x49, 0x2A, 0x00] || bytes[0..4] == [0x4D, 0x4D, 0x00, 0x2A])
        {
            return Format::Tiff;
        }

        // PGM: "P5" / "P2" followed by whitespace
        if bytes.len() >= 3
            && bytes[0] == b'P'
            && (bytes[1] == b'5' || bytes[1] == b'2')
            && bytes[2].is_ascii_whitespace()
        {
            return Format::Pgm;
        }

        Format::Unknown
    }

    /// True if a codec for this format is compiled in.
    pub fn is_supported(&self) -> bool {
        match self {
            Format::Png => cfg!(feature = "png"),
            Format::Pgm => cfg!(feature = "pnm"),
            Format::Jpeg => cfg!(feature = "jpeg"),
            Format::Tiff => cfg!(feature = "tiff"),
            Format::Unknown => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Format::from_extension("a.PNG"), Format::Png);
        assert_eq!(Format::from_extension("dir/lena.pgm"), Format::Pgm);
        assert_eq!(Format::from_extension("x.jpeg"), Format::Jpeg);
        assert_eq!(Format::from_extension("x.tif"), Format::Tiff);
        assert_eq!(Format::from_extension("x.exr"), Format::Unknown);
        assert_eq!(Format::from_extension("noext"), Format::Unknown);
    }

    #[test]
    fn test_from_bytes() {
        assert_eq!(Format::from_bytes(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]), Format::Png);
        assert_eq!(Format::from_bytes(b"P5\n4 4\n255\n"), Format::Pgm);
        assert_eq!(Format::from_bytes(b"P2 4 4"), Format::Pgm);
        assert_eq!(Format::from_bytes(b"P6\n"), Format::Unknown);
        assert_eq!(Format::from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), Format::Jpeg);
        assert_eq!(Format::from_bytes(b"II*\0"), Format::Tiff);
        assert_eq!(Format::from_bytes(b"ab"), Format::Unknown);
    }
}
