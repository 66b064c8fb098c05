//! Accelerator backends.
//!
//! Provides a host backend (imageproc) and an NPP backend (CUDA) with
//! automatic selection.
//!
//! # Architecture
//!
//! ```text
//! Filter<A: Accelerator>
//!     +-- CpuAccelerator (host memory, imageproc Canny)
//!     +-- NppAccelerator (device memory, nppiFilterCannyBorder)
//! ```

mod primitives;
mod detect;
mod cpu_backend;

#[cfg(feature = "npp")]
mod npp_sys;

#[cfg(feature = "npp")]
mod npp_backend;

use std::fmt;
use std::str::FromStr;

use edgefx_core::HostImage;

// Core types
pub use primitives::{Accelerator, DeviceImage, ScratchBuffer};
pub use detect::{detect_backends, select_best_backend, describe_backends, BackendInfo};

// Backends
pub use cpu_backend::{CpuAccelerator, CpuImage, CpuScratch};

#[cfg(feature = "npp")]
pub use npp_backend::{NppAccelerator, NppImage, NppScratch};

use crate::filter::FilterSpec;
use crate::probe::DeviceInfo;
use crate::{ComputeError, ComputeResult};

/// Available accelerator backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Auto-select best available (NPP > CPU).
    #[default]
    Auto,
    /// Host memory with imageproc kernels.
    Cpu,
    /// NVIDIA Performance Primitives on a CUDA device.
    Npp,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto => true,
            Self::Cpu => true,
            #[cfg(feature = "npp")]
            Self::Npp => NppAccelerator::is_available(),
            #[cfg(not(feature = "npp"))]
            Self::Npp => false,
        }
    }

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Npp => "npp",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "npp" | "cuda" => Ok(Self::Npp),
            other => Err(ComputeError::BackendNotAvailable(format!(
                "unknown backend '{}' (expected auto, cpu or npp)",
                other
            ))),
        }
    }
}

/// Accelerator enum for dynamic dispatch.
pub enum AnyAccelerator {
    Cpu(CpuAccelerator),
    #[cfg(feature = "npp")]
    Npp(NppAccelerator),
}

impl AnyAccelerator {
    /// Get backend name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu(a) => a.name(),
            #[cfg(feature = "npp")]
            Self::Npp(a) => a.name(),
        }
    }

    /// Which backend this is.
    pub fn backend(&self) -> Backend {
        match self {
            Self::Cpu(_) => Backend::Cpu,
            #[cfg(feature = "npp")]
            Self::Npp(_) => Backend::Npp,
        }
    }

    /// Library, driver and device report.
    pub fn probe(&self) -> ComputeResult<DeviceInfo> {
        match self {
            Self::Cpu(a) => a.probe(),
            #[cfg(feature = "npp")]
            Self::Npp(a) => a.probe(),
        }
    }

    /// Upload, filter and download in one scoped pass.
    pub fn apply(&self, spec: &FilterSpec, host: &HostImage) -> ComputeResult<HostImage> {
        match self {
            Self::Cpu(a) => run(a, spec, host),
            #[cfg(feature = "npp")]
            Self::Npp(a) => run(a, spec, host),
        }
    }

    /// Upload and download without filtering.
    pub fn round_trip(&self, host: &HostImage) -> ComputeResult<HostImage> {
        match self {
            Self::Cpu(a) => a.download(&a.upload(host)?),
            #[cfg(feature = "npp")]
            Self::Npp(a) => a.download(&a.upload(host)?),
        }
    }
}

/// Upload `host`, run `spec` on it and download the result.
///
/// Device images live only for the duration of this call.
pub fn run<A: Accelerator>(accel: &A, spec: &FilterSpec, host: &HostImage) -> ComputeResult<HostImage> {
    let filter = spec.build::<A>();
    let src = accel.upload(host)?;
    let dst = filter.apply(accel, &src)?;
    accel.download(&dst)
}

/// Create an accelerator for the specified backend.
///
/// `device` selects a CUDA ordinal for NPP; `None` picks the most capable
/// device. Ignored by the host backend.
pub fn create_accelerator(backend: Backend, device: Option<u32>) -> ComputeResult<AnyAccelerator> {
    match backend {
        Backend::Auto => {
            let best = select_best_backend();
            create_accelerator(best, device)
        }
        Backend::Cpu => Ok(AnyAccelerator::Cpu(CpuAccelerator::new())),
        Backend::Npp => {
            #[cfg(feature = "npp")]
            {
                Ok(AnyAccelerator::Npp(NppAccelerator::new(device)?))
            }
            #[cfg(not(feature = "npp"))]
            {
                let _ = device;
                Err(ComputeError::BackendNotAvailable(
                    "npp feature not enabled".to_string()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("auto".parse::<Backend>().unwrap(), Backend::Auto);
        assert_eq!("CPU".parse::<Backend>().unwrap(), Backend::Cpu);
        assert_eq!("npp".parse::<Backend>().unwrap(), Backend::Npp);
        assert!("metal".parse::<Backend>().is_err());
    }

    #[test]
    fn test_cpu_always_available() {
        assert!(Backend::Cpu.is_available());
        assert!(Backend::Auto.is_available());
        let accel = create_accelerator(Backend::Cpu, None).unwrap();
        assert_eq!(accel.backend(), Backend::Cpu);
    }
}
