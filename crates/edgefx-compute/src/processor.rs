//! Unified processing API over any backend.

use edgefx_core::HostImage;
use tracing::{debug, info};

use crate::backend::{AnyAccelerator, Backend, create_accelerator};
use crate::filter::FilterSpec;
use crate::probe::DeviceInfo;
use crate::ComputeResult;

/// Runs filters on one accelerator.
///
/// ```ignore
/// let proc = Processor::with_device(Backend::Npp, Some(1))?;
/// let out = proc.apply(&spec, &image)?;
/// ```
pub struct Processor {
    accel: AnyAccelerator,
}

impl Processor {
    /// Create with the given backend and its default device.
    pub fn new(backend: Backend) -> ComputeResult<Self> {
        Self::with_device(backend, None)
    }

    /// Create with the given backend and CUDA device ordinal.
    pub fn with_device(backend: Backend, device: Option<u32>) -> ComputeResult<Self> {
        let accel = create_accelerator(backend, device)?;
        info!(backend = accel.name(), "processor created");
        Ok(Self { accel })
    }

    /// Backend in use.
    pub fn backend(&self) -> Backend {
        self.accel.backend()
    }

    /// Backend name.
    pub fn backend_name(&self) -> &'static str {
        self.accel.name()
    }

    /// Library, driver and device report.
    pub fn probe(&self) -> ComputeResult<DeviceInfo> {
        self.accel.probe()
    }

    /// Filter `image`, returning a new host image.
    ///
    /// All accelerator memory used is released before returning, on
    /// success and on error.
    pub fn apply(&self, spec: &FilterSpec, image: &HostImage) -> ComputeResult<HostImage> {
        debug!(filter = %spec.kind(), size = %image.size(), backend = self.accel.name(), "apply");
        self.accel.apply(spec, image)
    }

    /// Upload then download `image` unchanged.
    pub fn round_trip(&self, image: &HostImage) -> ComputeResult<HostImage> {
        self.accel.round_trip(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CannyConfig, FilterKind};

    #[test]
    fn test_cpu_processor() {
        let proc = Processor::new(Backend::Cpu).unwrap();
        assert_eq!(proc.backend(), Backend::Cpu);
        assert_eq!(proc.backend_name(), "cpu");

        let image = HostImage::from_vec(16, 8, vec![40; 128]).unwrap();
        let out = proc
            .apply(&FilterKind::Canny.with_config(CannyConfig::default()), &image)
            .unwrap();
        assert_eq!(out.size(), image.size());
        assert!(out.rows().flatten().all(|&p| p == 0));

        assert!(proc.round_trip(&image).unwrap().same_pixels(&image));
    }
}
