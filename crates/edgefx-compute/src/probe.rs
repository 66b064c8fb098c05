//! Library, driver and device reports.

use std::fmt;

/// Lowest compute capability the NPP Canny primitive is run on.
pub const MIN_COMPUTE_CAPABILITY: ComputeCapability = ComputeCapability { major: 1, minor: 0 };

/// Three-part library version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub build: i32,
}

impl Version {
    pub const fn new(major: i32, minor: i32, build: i32) -> Self {
        Self { major, minor, build }
    }

    /// Decode a CUDA-style integer version (`1000 * major + 10 * minor`).
    pub const fn from_cuda(v: i32) -> Self {
        Self { major: v / 1000, minor: (v % 100) / 10, build: 0 }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// CUDA SM version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ComputeCapability {
    pub major: i32,
    pub minor: i32,
}

impl ComputeCapability {
    pub const fn new(major: i32, minor: i32) -> Self {
        Self { major, minor }
    }

    /// True if this capability is at least `min`.
    pub fn meets(&self, min: ComputeCapability) -> bool {
        *self >= min
    }
}

impl fmt::Display for ComputeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Report for the accelerator a [`crate::Processor`] runs on.
///
/// `driver` and `runtime` are only present for CUDA devices; the host
/// backend reports its CPU instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Backend name ("npp", "cpu").
    pub backend: &'static str,
    /// Version of the library providing the Canny primitive.
    pub library: Version,
    pub driver: Option<Version>,
    pub runtime: Option<Version>,
    /// Device ordinal.
    pub device: u32,
    pub device_name: String,
    pub capability: Option<ComputeCapability>,
    /// Processor count (SMs for CUDA, cores for host).
    pub processors: u32,
    /// Memory in bytes, if known.
    pub memory: Option<u64>,
}

impl DeviceInfo {
    /// True unless a CUDA device reports less than `min`.
    pub fn meets(&self, min: ComputeCapability) -> bool {
        self.capability.is_none_or(|cc| cc.meets(min))
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.backend {
            "npp" => writeln!(f, "NPP Library Version {}", self.library)?,
            _ => writeln!(f, "imageproc Library Version {}", self.library)?,
        }
        if let Some(driver) = self.driver {
            writeln!(f, "  CUDA Driver  Version: {}.{}", driver.major, driver.minor)?;
        }
        if let Some(runtime) = self.runtime {
            writeln!(f, "  CUDA Runtime Version: {}.{}", runtime.major, runtime.minor)?;
        }
        write!(f, "  Device {}: {}", self.device, self.device_name)?;
        if let Some(cc) = self.capability {
            write!(f, " (compute capability {})", cc)?;
        }
        write!(f, ", {} processors", self.processors)?;
        if let Some(mem) = self.memory {
            write!(f, ", {} MB", mem / (1024 * 1024))?;
        }
        Ok(())
    }
}
