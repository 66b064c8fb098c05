//! Image dimensions and rectangular regions.
//!
//! [`Size`] mirrors the `{width, height}` pairs accelerator libraries take by
//! value; [`Rect`] is a region of interest anchored at a pixel origin.
//!
//! ```text
//! (0,0)
//!   +----------------------+
//!   |   (x,y)              |
//!   |     +--------+       |
//!   |     |  ROI   | h     |
//!   |     +--------+       |
//!   |         w            |
//!   +----------------------+ (width, height)
//! ```

use crate::{Error, Result};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct Size {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Size {
    /// Creates a new size.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels.
    #[inline]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True if either dimension is zero.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A rectangle defined by origin (x, y) and dimensions (width, height).
///
/// All values are in pixels, with (0, 0) at the top-left corner.
///
/// # Example
///
/// ```rust
/// use edgefx_core::Rect;
///
/// let rect = Rect::new(10, 20, 100, 50);
/// assert_eq!(rect.right(), 110);
/// assert_eq!(rect.bottom(), 70);
/// assert_eq!(rect.size().area(), 5000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct Rect {
    /// X coordinate of the left edge (inclusive)
    pub x: u32,
    /// Y coordinate of the top edge (inclusive)
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle with the given origin and dimensions.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Creates a rectangle at the origin covering `width x height`.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Dimensions of the region.
    #[inline]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// True if the rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Checks that this region is non-empty and lies inside an image of `bounds`.
    pub fn check_within(&self, bounds: Size) -> Result<()> {
        if self.is_empty()
            || self.right() > bounds.width as u64
            || self.bottom() > bounds.height as u64
        {
            return Err(Error::InvalidRegion {
                rx: self.x,
                ry: self.y,
                rw: self.width,
                rh: self.height,
                width: bounds.width,
                height: bounds.height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size() {
        let s = Size::new(640, 480);
        assert_eq!(s.area(), 307_200);
        assert!(!s.is_empty());
        assert!(Size::new(0, 10).is_empty());
        assert_eq!(s.to_string(), "640x480");
    }

    #[test]
    fn test_check_within() {
        let bounds = Size::new(100, 50);
        assert!(Rect::from_size(100, 50).check_within(bounds).is_ok());
        assert!(Rect::new(10, 10, 90, 40).check_within(bounds).is_ok());
        assert!(Rect::new(10, 10, 91, 40).check_within(bounds).is_err());
        assert!(Rect::new(0, 0, 0, 10).check_within(bounds).is_err());
    }

    #[test]
    fn test_no_overflow_at_u32_max() {
        let r = Rect::new(u32::MAX, 0, u32::MAX, 1);
        assert!(r.check_within(Size::new(u32::MAX, 1)).is_err());
    }
}
