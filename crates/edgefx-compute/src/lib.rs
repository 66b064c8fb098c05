//! Accelerator backends for edgefx.
//!
//! Moves 8-bit grayscale images between host and accelerator memory and
//! runs a vendor Canny primitive on them.
//!
//! # Architecture
//!
//! ```text
//! Processor (unified API)
//!     └── AnyAccelerator (CPU or NPP)
//!             └── Accelerator trait
//!                     ├── CpuAccelerator (imageproc on host memory)
//!                     └── NppAccelerator (NPP + CUDA runtime, loaded at run time)
//! ```
//!
//! Device images and scratch buffers are owned values that free their
//! memory in `Drop`, so every allocation is released exactly once whether
//! the filter succeeds, fails, or unwinds.
//!
//! # Example
//!
//! ```ignore
//! use edgefx_compute::{Backend, CannyConfig, FilterKind, Processor};
//!
//! let proc = Processor::new(Backend::Auto)?;
//! println!("{}", proc.probe()?);
//! let edges = proc.apply(&FilterKind::Canny.with_config(CannyConfig::default()), &host)?;
//! ```

pub mod backend;
pub mod filter;
pub mod probe;
pub mod processor;

pub use backend::{
    Accelerator, AnyAccelerator, Backend, BackendInfo, DeviceImage, ScratchBuffer,
    create_accelerator, describe_backends, detect_backends, select_best_backend,
};
pub use backend::{CpuAccelerator, CpuImage, CpuScratch};
#[cfg(feature = "npp")]
pub use backend::{NppAccelerator, NppImage, NppScratch};
pub use filter::{
    BorderMode, CannyConfig, CannyFilter, DifferentialKernel, Filter, FilterKind, FilterSpec,
    GradientNorm, MaskSize,
};
pub use probe::{ComputeCapability, DeviceInfo, MIN_COMPUTE_CAPABILITY, Version};
pub use processor::Processor;

use thiserror::Error;

/// Accelerator operation errors
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("No suitable device found: {0}")]
    NoDevice(String),

    #[error("Invalid device ordinal {requested}: {count} device(s) present")]
    InvalidDevice { requested: u32, count: u32 },

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Failed to load native library: {0}")]
    LibraryLoad(String),

    #[error("CUDA call {call} failed with error {code}")]
    Cuda { call: &'static str, code: i32 },

    #[error("NPP call {call} failed with status {status}")]
    Npp { call: &'static str, status: i32 },

    #[error("Failed to allocate {width}x{height} device image")]
    AllocationFailed { width: u32, height: u32 },

    #[error("Failed to allocate {0} byte scratch buffer")]
    ScratchAllocation(usize),

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Image too large: {width}x{height} exceeds backend limit {limit}")]
    ImageTooLarge { width: u32, height: u32, limit: u32 },

    #[error("Unsupported filter parameters: {0}")]
    UnsupportedParameters(String),

    #[error(transparent)]
    Image(#[from] edgefx_core::Error),
}

pub type ComputeResult<T> = Result<T, ComputeError>;
