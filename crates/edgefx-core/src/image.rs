//! Host-side image buffer.
//!
//! [`HostImage`] owns an 8-bit single-channel image in ordinary RAM. Rows
//! are stored top-to-bottom and may be padded: the byte distance between
//! row starts is the *pitch*, which is always `>= width`.
//!
//! ```text
//! pitch = 6, width = 4:
//!
//!   [p p p p . .]  <- row 0
//!   [p p p p . .]  <- row 1
//!   ...
//! ```
//!
//! Images loaded from disk are tightly packed (`pitch == width`). Padded
//! images appear when a caller builds one explicitly, e.g. to mirror a
//! device allocation's layout.

use crate::{Error, Result, Size};

/// 8-bit single-channel image in host memory.
#[derive(Clone, PartialEq, Eq)]
pub struct HostImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    pitch: usize,
}

impl HostImage {
    /// Creates a zero-filled, tightly packed image.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_pitch(width, height, width as usize)
    }

    /// Creates a zero-filled image with an explicit row pitch.
    pub fn with_pitch(width: u32, height: u32, pitch: usize) -> Result<Self> {
        let len = checked_len(width, height, pitch)?;
        Ok(Self { data: vec![0; len], width, height, pitch })
    }

    /// Wraps tightly packed pixel data (`width * height` bytes).
    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::from_vec_with_pitch(width, height, width as usize, data)
    }

    /// Wraps padded pixel data (`pitch * height` bytes).
    pub fn from_vec_with_pitch(width: u32, height: u32, pitch: usize, data: Vec<u8>) -> Result<Self> {
        let expected = checked_len(width, height, pitch)?;
        if data.len() != expected {
            return Err(Error::BufferSizeMismatch { expected, actual: data.len() });
        }
        Ok(Self { data, width, height, pitch })
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between the starts of consecutive rows.
    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Image dimensions.
    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Raw backing storage including row padding.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Active pixels of row `y` (padding excluded).
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        &self.data[start..start + self.width as usize]
    }

    /// Mutable active pixels of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.pitch;
        let width = self.width as usize;
        &mut self.data[start..start + width]
    }

    /// Iterator over the active pixels of every row.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }

    /// Pixel value at (x, y), or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y as usize * self.pitch + x as usize])
    }

    /// Pixel data with row padding removed (`width * height` bytes).
    pub fn to_packed(&self) -> Vec<u8> {
        if self.pitch == self.width as usize {
            return self.data.clone();
        }
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for row in self.rows() {
            out.extend_from_slice(row);
        }
        out
    }

    /// Consumes the image, returning tightly packed pixel data.
    pub fn into_packed(self) -> Vec<u8> {
        if self.pitch == self.width as usize {
            self.data
        } else {
            self.to_packed()
        }
    }

    /// True if both images hold the same pixels, ignoring row padding.
    pub fn same_pixels(&self, other: &HostImage) -> bool {
        self.size() == other.size() && self.rows().zip(other.rows()).all(|(a, b)| a == b)
    }
}

impl std::fmt::Debug for HostImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pitch", &self.pitch)
            .finish()
    }
}

fn checked_len(width: u32, height: u32, pitch: usize) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_dimensions(width, height));
    }
    if pitch < width as usize {
        return Err(Error::InvalidPitch { pitch, width });
    }
    pitch
        .checked_mul(height as usize)
        .ok_or_else(|| Error::invalid_dimensions(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        (0..height)
            .flat_map(|y| (0..width).map(move |x| (x * 7 + y * 13) as u8))
            .collect()
    }

    #[test]
    fn test_new_is_packed_and_zeroed() {
        let img = HostImage::new(5, 3).unwrap();
        assert_eq!(img.pitch(), 5);
        assert_eq!(img.as_bytes().len(), 15);
        assert!(img.as_bytes().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(HostImage::new(0, 4), Err(Error::InvalidDimensions { .. })));
        assert!(matches!(HostImage::new(4, 0), Err(Error::InvalidDimensions { .. })));
    }

    #[test]
    fn test_pitch_smaller_than_width_rejected() {
        assert!(matches!(
            HostImage::with_pitch(8, 2, 7),
            Err(Error::InvalidPitch { pitch: 7, width: 8 })
        ));
    }

    #[test]
    fn test_rows_skip_padding() {
        let mut data = vec![0xEE; 6 * 2];
        data[..4].copy_from_slice(&[1, 2, 3, 4]);
        data[6..10].copy_from_slice(&[5, 6, 7, 8]);
        let img = HostImage::from_vec_with_pitch(4, 2, 6, data).unwrap();

        assert_eq!(img.row(0), &[1, 2, 3, 4]);
        assert_eq!(img.row(1), &[5, 6, 7, 8]);
        assert_eq!(img.to_packed(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(img.pixel(3, 1), Some(8));
        assert_eq!(img.pixel(4, 1), None);
    }

    #[test]
    fn test_same_pixels_ignores_pitch() {
        let packed = HostImage::from_vec(7, 3, gradient(7, 3)).unwrap();
        let mut padded = HostImage::with_pitch(7, 3, 16).unwrap();
        for y in 0..3 {
            padded.row_mut(y).copy_from_slice(packed.row(y));
        }
        assert!(packed.same_pixels(&padded));
        assert_ne!(packed, padded);
        assert_eq!(padded.into_packed(), gradient(7, 3));
    }
}
