//! Portable graymap (PGM) support.
//!
//! Reads binary (`P5`) and ASCII (`P2`) graymaps with `maxval <= 255`,
//! including `#` comments in the header. Writes binary `P5` with
//! `maxval = 255`.
//!
//! ```text
//! P5
//! # optional comment
//! <width> <height>
//! <maxval>
//! <width * height bytes>
//! ```

use crate::{HostImage, IoError, IoResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Reads a PGM file from the given path.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<HostImage> {
    let bytes = std::fs::read(path.as_ref())?;
    read_from_memory(&bytes)
}

/// Decodes a PGM image held in memory.
pub fn read_from_memory(bytes: &[u8]) -> IoResult<HostImage> {
    let mut header = HeaderCursor { bytes, pos: 0 };

    let magic = header.token()?;
    let ascii = match magic {
        b"P5" => false,
        b"P2" => true,
        b"P6" | b"P3" => {
            return Err(IoError::UnsupportedPixelFormat("PPM color image".into()));
        }
        other => {
            return Err(IoError::DecodeError(format!(
                "bad PGM magic: {:?}",
                String::from_utf8_lossy(other)
            )));
        }
    };

    let width = header.number()?;
    let height = header.number()?;
    let maxval = header.number()?;
    if maxval == 0 || maxval > 255 {
        return Err(IoError::UnsupportedPixelFormat(format!("PGM maxval {}", maxval)));
    }

    let count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| IoError::DecodeError(format!("PGM size {}x{} overflows", width, height)))?;
    let data = if ascii {
        // Each ASCII sample takes at least one digit and one separator
        let remaining = bytes.len().saturating_sub(header.pos);
        if count > remaining.div_ceil(2) {
            return Err(IoError::DecodeError(format!(
                "PGM header claims {} samples but only {} bytes follow",
                count, remaining
            )));
        }
        let mut data = Vec::with_capacity(count);
        for _ in 0..count {
            let v = header.number()?;
            if v > maxval {
                return Err(IoError::DecodeError(format!("sample {} exceeds maxval {}", v, maxval)));
            }
            data.push(scale_sample(v, maxval));
        }
        data
    } else {
        // Exactly one whitespace byte separates maxval from the raster.
        let start = header.pos + 1;
        let raster = bytes
            .get(start..start.saturating_add(count))
            .ok_or_else(|| IoError::DecodeError("truncated PGM raster".into()))?;
        raster.iter().map(|&v| scale_sample(v as u32, maxval)).collect()
    };

    Ok(HostImage::from_vec(width, height, data)?)
}

/// Writes an image as a binary (P5) PGM file.
pub fn write<P: AsRef<Path>>(path: P, image: &HostImage) -> IoResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write!(writer, "P5\n{} {}\n255\n", image.width(), image.height())?;
    for row in image.rows() {
        writer.write_all(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn scale_sample(v: u32, maxval: u32) -> u8 {
    if maxval == 255 {
        v as u8
    } else {
        ((v * 255 + maxval / 2) / maxval) as u8
    }
}

struct HeaderCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HeaderCursor<'a> {
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'#' {
                while let Some(&c) = self.bytes.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn token(&mut self) -> IoResult<&'a [u8]> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() || b == b'#' {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(IoError::DecodeError("unexpected end of PGM header".into()));
        }
        Ok(&self.bytes[start..self.pos])
    }

    fn number(&mut self) -> IoResult<u32> {
        let token = self.token()?;
        std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                IoError::DecodeError(format!("bad PGM number: {:?}", String::from_utf8_lossy(token)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_with_comment() {
        let mut bytes = b"P5\n# made by hand\n3 2\n255\n".to_vec();
        bytes.extend_from_slice(&[0, 10, 20, 30, 40, 255]);

        let img = read_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
        assert_eq!(img.to_packed(), vec![0, 10, 20, 30, 40, 255]);
    }

    #[test]
    fn test_ascii_rescales_maxval() {
        let img = read_from_memory(b"P2 2 2 15\n0 15\n5 10\n").unwrap();
        assert_eq!(img.to_packed(), vec![0, 255, 85, 170]);
    }

    #[test]
    fn test_truncated_raster() {
        let err = read_from_memory(b"P5\n4 4\n255\n\x01\x02").unwrap_err();
        assert!(matches!(err, IoError::DecodeError(_)));
    }

    #[test]
    fn test_oversized_ascii_header() {
        let err = read_from_memory(b"P2 4294967295 4294967295 255\n1 2 3\n").unwrap_err();
        assert!(matches!(err, IoError::DecodeError(_)));

        let err = read_from_memory(b"P2 100000 100000 255\n0 0 0 0\n").unwrap_err();
        assert!(matches!(err, IoError::DecodeError(_)));
    }

    #[test]
    fn test_oversized_binary_header() {
        let err = read_from_memory(b"P5 4294967295 4294967295 255\n\0\0").unwrap_err();
        assert!(matches!(err, IoError::DecodeError(_)));
    }

    #[test]
    fn test_color_and_wide_rejected() {
        assert!(matches!(
            read_from_memory(b"P6\n1 1\n255\n\0\0\0"),
            Err(IoError::UnsupportedPixelFormat(_))
        ));
        assert!(matches!(
            read_from_memory(b"P5\n1 1\n65535\n\0\0"),
            Err(IoError::UnsupportedPixelFormat(_))
        ));
    }

    #[test]
    fn test_roundtrip_padded_source() {
        let mut img = HostImage::with_pitch(5, 3, 8).unwrap();
        for y in 0..3 {
            for (x, v) in img.row_mut(y).iter_mut().enumerate() {
                *v = (x as u8) * 50 + y as u8;
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("padded.pgm");
        write(&path, &img).unwrap();
        let loaded = read(&path).unwrap();

        assert_eq!(loaded.pitch(), 5);
        assert!(loaded.same_pixels(&img));
    }
}
