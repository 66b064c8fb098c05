//! Accelerator primitives abstraction shared by every backend.

use edgefx_core::{HostImage, Rect, Size};

use crate::ComputeResult;
use crate::filter::CannyConfig;
use crate::probe::DeviceInfo;

/// Handle to an 8-bit single-channel image in accelerator memory.
///
/// Implementations own their memory and release it in `Drop`.
pub trait DeviceImage {
    /// Image dimensions (width, height).
    fn dimensions(&self) -> (u32, u32);

    /// Width.
    fn width(&self) -> u32 { self.dimensions().0 }

    /// Height.
    fn height(&self) -> u32 { self.dimensions().1 }

    /// Bytes between row starts in accelerator memory.
    fn pitch(&self) -> usize;

    /// Dimensions as a [`Size`].
    fn size(&self) -> Size {
        let (w, h) = self.dimensions();
        Size::new(w, h)
    }

    /// Bytes of accelerator memory held.
    fn size_bytes(&self) -> u64 {
        self.pitch() as u64 * self.height() as u64
    }
}

/// Transient accelerator memory used by a single kernel call.
///
/// Implementations release their memory in `Drop`.
pub trait ScratchBuffer {
    /// Size in bytes.
    fn len(&self) -> usize;

    /// True for a zero-byte buffer.
    fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Core accelerator operations.
pub trait Accelerator {
    /// Backend-specific image handle type.
    type Image: DeviceImage;

    /// Backend-specific scratch buffer type.
    type Scratch: ScratchBuffer;

    /// Backend name.
    fn name(&self) -> &'static str;

    /// Library, driver and device report for the selected device.
    fn probe(&self) -> ComputeResult<DeviceInfo>;

    /// Copy a host image into newly allocated accelerator memory.
    fn upload(&self, host: &HostImage) -> ComputeResult<Self::Image>;

    /// Copy an accelerator image into a tightly packed host image.
    fn download(&self, image: &Self::Image) -> ComputeResult<HostImage>;

    /// Allocate an uninitialized accelerator image.
    fn allocate(&self, width: u32, height: u32) -> ComputeResult<Self::Image>;

    /// Scratch bytes the Canny primitive needs for a region of `roi`.
    fn canny_scratch_size(&self, roi: Size) -> ComputeResult<usize>;

    /// Allocate `len` bytes of scratch memory.
    fn allocate_scratch(&self, len: usize) -> ComputeResult<Self::Scratch>;

    /// Run the bordered Canny primitive on `roi` of `src`, writing `dst`.
    ///
    /// `dst` must have the dimensions of `roi`. Pixels outside `roi` but
    /// inside `src` are read as border; beyond `src` the border mode applies.
    /// Blocks until the result is complete.
    fn exec_canny(
        &self,
        src: &Self::Image,
        roi: Rect,
        dst: &mut Self::Image,
        config: &CannyConfig,
        scratch: Option<&mut Self::Scratch>,
    ) -> ComputeResult<()>;
}
