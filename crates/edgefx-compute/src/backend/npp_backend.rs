//! NPP accelerator on a CUDA device.
//!
//! Requires the `npp` feature and the CUDA runtime plus NPP libraries at
//! run time. Images are pitched `nppiMalloc_8u_C1` allocations; scratch
//! buffers are plain `cudaMalloc` allocations. Both are freed in `Drop`.

use std::ffi::c_void;
use std::sync::Arc;

use edgefx_core::{HostImage, Rect, Size};
use tracing::{debug, info, warn};

use super::npp_sys::{self, NppRuntime, NppiPoint, NppiSize};
use super::primitives::{Accelerator, DeviceImage, ScratchBuffer};
use crate::filter::{BorderMode, CannyConfig, DifferentialKernel, GradientNorm, MaskSize};
use crate::probe::{ComputeCapability, DeviceInfo, Version};
use crate::{ComputeError, ComputeResult};

/// NPP takes dimensions as `int`.
const MAX_DIM: u32 = i32::MAX as u32;

/// Pitched 8-bit image in device memory.
pub struct NppImage {
    ptr: *mut u8,
    width: u32,
    height: u32,
    pitch: usize,
    rt: Arc<NppRuntime>,
}

impl DeviceImage for NppImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pitch(&self) -> usize {
        self.pitch
    }
}

impl Drop for NppImage {
    fn drop(&mut self) {
        unsafe { self.rt.free_image(self.ptr) }
    }
}

/// Device scratch buffer.
pub struct NppScratch {
    ptr: *mut c_void,
    len: usize,
    rt: Arc<NppRuntime>,
}

impl ScratchBuffer for NppScratch {
    fn len(&self) -> usize {
        self.len
    }
}

impl Drop for NppScratch {
    fn drop(&mut self) {
        if let Err(e) = unsafe { self.rt.free(self.ptr) } {
            warn!("failed to free scratch buffer: {}", e);
        }
    }
}

/// NPP accelerator bound to one CUDA device.
pub struct NppAccelerator {
    rt: Arc<NppRuntime>,
    device: i32,
}

impl NppAccelerator {
    /// True if the libraries load and at least one device is present.
    pub fn is_available() -> bool {
        NppRuntime::get()
            .and_then(|rt| rt.device_count())
            .map(|n| n > 0)
            .unwrap_or(false)
    }

    /// Bind to `device`, or to the most capable device when `None`.
    pub fn new(device: Option<u32>) -> ComputeResult<Self> {
        let rt = NppRuntime::get()?;
        let count = rt.device_count()?;
        if count <= 0 {
            return Err(ComputeError::NoDevice("no CUDA devices present".into()));
        }

        let device = match device {
            Some(d) if (d as i64) < count as i64 => d as i32,
            Some(d) => return Err(ComputeError::InvalidDevice { requested: d, count: count as u32 }),
            None => Self::select_device(&rt, count)?,
        };

        rt.set_device(device)?;
        info!(device, "NPP accelerator ready");
        Ok(Self { rt, device })
    }

    /// Highest compute capability wins; ties go to the larger SM count.
    fn select_device(rt: &NppRuntime, count: i32) -> ComputeResult<i32> {
        let mut best: Option<((ComputeCapability, i32), i32)> = None;
        for dev in 0..count {
            let key = (Self::capability(rt, dev)?, rt.device_attribute(npp_sys::ATTR_MULTIPROCESSOR_COUNT, dev)?);
            debug!(dev, cc = %key.0, sms = key.1, "candidate device");
            if best.is_none_or(|(k, _)| key > k) {
                best = Some((key, dev));
            }
        }
        best.map(|(_, dev)| dev)
            .ok_or_else(|| ComputeError::NoDevice("no CUDA devices present".into()))
    }

    fn capability(rt: &NppRuntime, dev: i32) -> ComputeResult<ComputeCapability> {
        Ok(ComputeCapability::new(
            rt.device_attribute(npp_sys::ATTR_COMPUTE_CAPABILITY_MAJOR, dev)?,
            rt.device_attribute(npp_sys::ATTR_COMPUTE_CAPABILITY_MINOR, dev)?,
        ))
    }

    /// Selected device ordinal.
    pub fn device(&self) -> u32 {
        self.device as u32
    }

    fn npp_size(size: Size) -> ComputeResult<NppiSize> {
        if size.width > MAX_DIM || size.height > MAX_DIM {
            return Err(ComputeError::ImageTooLarge { width: size.width, height: size.height, limit: MAX_DIM });
        }
        Ok(NppiSize { width: size.width as i32, height: size.height as i32 })
    }

    fn npp_params(config: &CannyConfig) -> (i32, i32, i32, i32) {
        let kernel = match config.kernel {
            DifferentialKernel::Sobel => npp_sys::NPP_FILTER_SOBEL,
            DifferentialKernel::Scharr => npp_sys::NPP_FILTER_SCHARR,
        };
        let mask = match config.mask {
            MaskSize::Mask3x3 => npp_sys::NPP_MASK_SIZE_3_X_3,
            MaskSize::Mask5x5 => npp_sys::NPP_MASK_SIZE_5_X_5,
        };
        let norm = match config.norm {
            GradientNorm::L1 => npp_sys::NPPI_NORM_L1,
            GradientNorm::L2 => npp_sys::NPPI_NORM_L2,
        };
        let border = match config.border {
            BorderMode::Replicate => npp_sys::NPP_BORDER_REPLICATE,
        };
        (kernel, mask, norm, border)
    }
}

impl Accelerator for NppAccelerator {
    type Image = NppImage;
    type Scratch = NppScratch;

    fn name(&self) -> &'static str {
        "npp"
    }

    fn probe(&self) -> ComputeResult<DeviceInfo> {
        let memory = self.rt.mem_info().ok().map(|(_, total)| total as u64);
        Ok(DeviceInfo {
            backend: self.name(),
            library: self.rt.lib_version(),
            driver: Some(Version::from_cuda(self.rt.driver_version()?)),
            runtime: Some(Version::from_cuda(self.rt.runtime_version()?)),
            device: self.device(),
            device_name: format!("CUDA device {}", self.device),
            capability: Some(Self::capability(&self.rt, self.device)?),
            processors: self.rt.device_attribute(npp_sys::ATTR_MULTIPROCESSOR_COUNT, self.device)?.max(0) as u32,
            memory,
        })
    }

    fn upload(&self, host: &HostImage) -> ComputeResult<Self::Image> {
        let image = self.allocate(host.width(), host.height())?;
        unsafe {
            self.rt.memcpy_2d(
                image.ptr.cast(),
                image.pitch,
                host.as_bytes().as_ptr().cast(),
                host.pitch(),
                host.width() as usize,
                host.height() as usize,
                npp_sys::CUDA_MEMCPY_HOST_TO_DEVICE,
            )?;
        }
        Ok(image)
    }

    fn download(&self, image: &Self::Image) -> ComputeResult<HostImage> {
        let width = image.width as usize;
        let mut packed = vec![0u8; width * image.height as usize];
        unsafe {
            self.rt.memcpy_2d(
                packed.as_mut_ptr().cast(),
                width,
                image.ptr.cast_const().cast(),
                image.pitch,
                width,
                image.height as usize,
                npp_sys::CUDA_MEMCPY_DEVICE_TO_HOST,
            )?;
        }
        Ok(HostImage::from_vec(image.width, image.height, packed)?)
    }

    fn allocate(&self, width: u32, height: u32) -> ComputeResult<Self::Image> {
        if width == 0 || height == 0 {
            return Err(edgefx_core::Error::invalid_dimensions(width, height).into());
        }
        let size = Self::npp_size(Size::new(width, height))?;
        let (ptr, pitch) = self
            .rt
            .malloc_image(size.width, size.height)
            .ok_or(ComputeError::AllocationFailed { width, height })?;
        Ok(NppImage { ptr, width, height, pitch, rt: Arc::clone(&self.rt) })
    }

    fn canny_scratch_size(&self, roi: Size) -> ComputeResult<usize> {
        self.rt.canny_buffer_size(Self::npp_size(roi)?)
    }

    fn allocate_scratch(&self, len: usize) -> ComputeResult<Self::Scratch> {
        let ptr = self.rt.malloc(len).map_err(|e| {
            debug!("scratch allocation: {}", e);
            ComputeError::ScratchAllocation(len)
        })?;
        Ok(NppScratch { ptr, len, rt: Arc::clone(&self.rt) })
    }

    fn exec_canny(
        &self,
        src: &Self::Image,
        roi: Rect,
        dst: &mut Self::Image,
        config: &CannyConfig,
        scratch: Option<&mut Self::Scratch>,
    ) -> ComputeResult<()> {
        roi.check_within(src.size())?;
        if dst.size() != roi.size() {
            return Err(ComputeError::BufferSizeMismatch {
                expected: roi.size().area() as usize,
                actual: dst.size().area() as usize,
            });
        }

        let src_size = Self::npp_size(src.size())?;
        let roi_size = Self::npp_size(roi.size())?;
        let needed = self.canny_scratch_size(roi.size())?;
        let buffer = match scratch {
            Some(s) if s.len >= needed => s.ptr.cast::<u8>(),
            Some(s) => return Err(ComputeError::BufferSizeMismatch { expected: needed, actual: s.len }),
            None if needed == 0 => std::ptr::null_mut(),
            None => return Err(ComputeError::BufferSizeMismatch { expected: needed, actual: 0 }),
        };
        let (kernel, mask, norm, border) = Self::npp_params(config);

        // Source pointer addresses the region origin; the offset tells NPP
        // how much real image lies above and to the left of it.
        let origin = roi.y as usize * src.pitch + roi.x as usize;
        unsafe {
            self.rt.filter_canny_border(
                src.ptr.add(origin).cast_const(),
                src.pitch as i32,
                src_size,
                NppiPoint { x: roi.x as i32, y: roi.y as i32 },
                dst.ptr,
                dst.pitch as i32,
                roi_size,
                kernel,
                mask,
                config.low_threshold,
                config.high_threshold,
                norm,
                border,
                buffer,
            )?;
        }

        self.rt.synchronize()
    }
}
