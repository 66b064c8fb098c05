//! Host backend using imageproc's Canny detector.
//!
//! Images live in pitched host buffers laid out like device memory, so the
//! filter code path is the same as for NPP. Every buffer holds a lease on
//! the accelerator's allocation counter; [`CpuAccelerator::live_allocations`]
//! reports how many are outstanding.

use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use edgefx_core::{HostImage, Rect, Size};
use image::GrayImage;
use tracing::trace;

use super::primitives::{Accelerator, DeviceImage, ScratchBuffer};
use crate::filter::{BorderMode, CannyConfig, DifferentialKernel, GradientNorm, MaskSize};
use crate::probe::{DeviceInfo, Version};
use crate::{ComputeError, ComputeResult};

/// Row alignment of host images, matching typical device pitch.
const PITCH_ALIGN: usize = 64;

/// Source pixels read around the region so the smoothing and gradient
/// stencils see real neighbours instead of replicated edges.
const ROI_MARGIN: u32 = 8;

/// imageproc release providing the Canny kernel.
const IMAGEPROC_VERSION: Version = Version::new(0, 25, 0);

fn aligned_pitch(width: u32) -> usize {
    (width as usize).div_ceil(PITCH_ALIGN) * PITCH_ALIGN
}

/// Counts one live allocation until dropped.
struct Lease(Arc<AtomicUsize>);

impl Lease {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Host image handle with device-style row pitch.
pub struct CpuImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    pitch: usize,
    _lease: Lease,
}

impl CpuImage {
    fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        &self.data[start..start + self.width as usize]
    }

    fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.pitch;
        let width = self.width as usize;
        &mut self.data[start..start + width]
    }
}

impl DeviceImage for CpuImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pitch(&self) -> usize {
        self.pitch
    }
}

/// Host scratch buffer.
pub struct CpuScratch {
    data: Vec<u8>,
    len: usize,
    _lease: Lease,
}

impl ScratchBuffer for CpuScratch {
    fn len(&self) -> usize {
        self.len
    }
}

/// Host accelerator.
pub struct CpuAccelerator {
    live: Arc<AtomicUsize>,
}

impl CpuAccelerator {
    pub fn new() -> Self {
        Self { live: Arc::new(AtomicUsize::new(0)) }
    }

    /// Images and scratch buffers allocated by this accelerator and not yet
    /// dropped.
    pub fn live_allocations(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn check_supported(config: &CannyConfig) -> ComputeResult<()> {
        let supported = config.kernel == DifferentialKernel::Sobel
            && config.mask == MaskSize::Mask3x3
            && config.norm == GradientNorm::L2
            && config.border == BorderMode::Replicate;
        if supported {
            Ok(())
        } else {
            Err(ComputeError::UnsupportedParameters(format!(
                "host Canny supports Sobel 3x3, L2 norm, replicate border only (got {:?} {:?} {:?} {:?})",
                config.kernel, config.mask, config.norm, config.border
            )))
        }
    }
}

impl Default for CpuAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accelerator for CpuAccelerator {
    type Image = CpuImage;
    type Scratch = CpuScratch;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn probe(&self) -> ComputeResult<DeviceInfo> {
        let os = sys_info::os_type().unwrap_or_else(|_| "unknown".to_string());
        let processors = sys_info::cpu_num().unwrap_or(1);
        let memory = sys_info::mem_info().ok().map(|m| m.avail * 1024);

        Ok(DeviceInfo {
            backend: self.name(),
            library: IMAGEPROC_VERSION,
            driver: None,
            runtime: None,
            device: 0,
            device_name: format!("{} host CPU", os),
            capability: None,
            processors,
            memory,
        })
    }

    fn upload(&self, host: &HostImage) -> ComputeResult<Self::Image> {
        let mut image = self.allocate(host.width(), host.height())?;
        for (y, row) in host.rows().enumerate() {
            image.row_mut(y as u32).copy_from_slice(row);
        }
        Ok(image)
    }

    fn download(&self, image: &Self::Image) -> ComputeResult<HostImage> {
        let mut packed = Vec::with_capacity(image.width as usize * image.height as usize);
        for y in 0..image.height {
            packed.extend_from_slice(image.row(y));
        }
        Ok(HostImage::from_vec(image.width, image.height, packed)?)
    }

    fn allocate(&self, width: u32, height: u32) -> ComputeResult<Self::Image> {
        if width == 0 || height == 0 {
            return Err(edgefx_core::Error::invalid_dimensions(width, height).into());
        }
        let pitch = aligned_pitch(width);
        trace!(width, height, pitch, "cpu allocate");
        Ok(CpuImage {
            data: vec![0; pitch * height as usize],
            width,
            height,
            pitch,
            _lease: Lease::new(&self.live),
        })
    }

    fn canny_scratch_size(&self, roi: Size) -> ComputeResult<usize> {
        let w = roi.width as usize + 2 * ROI_MARGIN as usize;
        let h = roi.height as usize + 2 * ROI_MARGIN as usize;
        Ok(w * h)
    }

    fn allocate_scratch(&self, len: usize) -> ComputeResult<Self::Scratch> {
        Ok(CpuScratch {
            data: Vec::with_capacity(len),
            len,
            _lease: Lease::new(&self.live),
        })
    }

    fn exec_canny(
        &self,
        src: &Self::Image,
        roi: Rect,
        dst: &mut Self::Image,
        config: &CannyConfig,
        scratch: Option<&mut Self::Scratch>,
    ) -> ComputeResult<()> {
        Self::check_supported(config)?;
        roi.check_within(src.size())?;
        if dst.size() != roi.size() {
            return Err(ComputeError::BufferSizeMismatch {
                expected: roi.size().area() as usize,
                actual: dst.size().area() as usize,
            });
        }

        // Region plus margin, clipped to the source
        let x0 = roi.x.saturating_sub(ROI_MARGIN);
        let y0 = roi.y.saturating_sub(ROI_MARGIN);
        let x1 = (roi.right() as u32).saturating_add(ROI_MARGIN).min(src.width);
        let y1 = (roi.bottom() as u32).saturating_add(ROI_MARGIN).min(src.height);
        let (ew, eh) = (x1 - x0, y1 - y0);
        let needed = ew as usize * eh as usize;

        let scratch = scratch.ok_or(ComputeError::BufferSizeMismatch { expected: needed, actual: 0 })?;
        if scratch.len < needed {
            return Err(ComputeError::BufferSizeMismatch { expected: needed, actual: scratch.len });
        }

        scratch.data.clear();
        for y in y0..y1 {
            let row = src.row(y);
            scratch.data.extend_from_slice(&row[x0 as usize..x1 as usize]);
        }

        let input = GrayImage::from_raw(ew, eh, mem::take(&mut scratch.data))
            .ok_or(ComputeError::BufferSizeMismatch { expected: needed, actual: 0 })?;
        let edges = imageproc::edges::canny(
            &input,
            config.low_threshold as f32,
            config.high_threshold as f32,
        );
        scratch.data = input.into_raw();

        let (ox, oy) = ((roi.x - x0) as usize, (roi.y - y0) as usize);
        let edge_pitch = ew as usize;
        let raw = edges.as_raw();
        for y in 0..roi.height {
            let start = (oy + y as usize) * edge_pitch + ox;
            dst.row_mut(y).copy_from_slice(&raw[start..start + roi.width as usize]);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32) -> HostImage {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| ((x * 7 + y * 3) % 256) as u8))
            .collect();
        HostImage::from_vec(width, height, data).unwrap()
    }

    #[test]
    fn test_pitch_alignment() {
        assert_eq!(aligned_pitch(1), 64);
        assert_eq!(aligned_pitch(64), 64);
        assert_eq!(aligned_pitch(65), 128);
    }

    #[test]
    fn test_upload_download_identity() {
        let accel = CpuAccelerator::new();
        let host = ramp(67, 5);
        let image = accel.upload(&host).unwrap();
        assert_eq!(image.pitch(), 128);
        assert_eq!(image.size_bytes(), 128 * 5);

        let back = accel.download(&image).unwrap();
        assert!(back.same_pixels(&host));
        assert_eq!(accel.live_allocations(), 1);
        drop(image);
        assert_eq!(accel.live_allocations(), 0);
    }

    #[test]
    fn test_zero_size_allocation_rejected() {
        let accel = CpuAccelerator::new();
        assert!(accel.allocate(0, 4).is_err());
        assert_eq!(accel.live_allocations(), 0);
    }

    #[test]
    fn test_unsupported_config() {
        let accel = CpuAccelerator::new();
        let src = accel.upload(&ramp(8, 8)).unwrap();
        let mut dst = accel.allocate(8, 8).unwrap();
        let mut scratch = accel.allocate_scratch(accel.canny_scratch_size(Size::new(8, 8)).unwrap()).unwrap();
        let config = CannyConfig { norm: GradientNorm::L1, ..CannyConfig::default() };

        let err = accel
            .exec_canny(&src, Rect::from_size(8, 8), &mut dst, &config, Some(&mut scratch))
            .unwrap_err();
        assert!(matches!(err, ComputeError::UnsupportedParameters(_)));
    }

    #[test]
    fn test_missing_scratch() {
        let accel = CpuAccelerator::new();
        let src = accel.upload(&ramp(8, 8)).unwrap();
        let mut dst = accel.allocate(8, 8).unwrap();
        let result = accel.exec_canny(&src, Rect::from_size(8, 8), &mut dst, &CannyConfig::default(), None);
        assert!(matches!(result, Err(ComputeError::BufferSizeMismatch { .. })));
    }

    #[test]
    fn test_probe_reports_host() {
        let info = CpuAccelerator::new().probe().unwrap();
        assert_eq!(info.backend, "cpu");
        assert!(info.capability.is_none());
        assert!(info.processors >= 1);
    }
}
