//! Dynamic loading of the CUDA runtime and NPP libraries.
//!
//! Uses `libloading` to load `cudart`, `nppc`, `nppisu` and `nppif` at run
//! time, so builds never link against CUDA. The runtime is loaded once per
//! process and shared.

use std::ffi::{CStr, c_char, c_int, c_void};
use std::sync::{Arc, OnceLock};

use libloading::{Library, Symbol};
use tracing::{debug, info};

use crate::probe::Version;
use crate::{ComputeError, ComputeResult};

pub type CudaError = c_int;
pub type NppStatus = c_int;

pub const CUDA_SUCCESS: CudaError = 0;
pub const NPP_SUCCESS: NppStatus = 0;

pub const CUDA_MEMCPY_HOST_TO_DEVICE: c_int = 1;
pub const CUDA_MEMCPY_DEVICE_TO_HOST: c_int = 2;

// cudaDeviceAttr
pub const ATTR_MULTIPROCESSOR_COUNT: c_int = 16;
pub const ATTR_COMPUTE_CAPABILITY_MAJOR: c_int = 75;
pub const ATTR_COMPUTE_CAPABILITY_MINOR: c_int = 76;

// NppiDifferentialKernel
pub const NPP_FILTER_SOBEL: c_int = 0;
pub const NPP_FILTER_SCHARR: c_int = 1;

// NppiMaskSize
pub const NPP_MASK_SIZE_3_X_3: c_int = 200;
pub const NPP_MASK_SIZE_5_X_5: c_int = 201;

// NppiNorm
pub const NPPI_NORM_L1: c_int = 1;
pub const NPPI_NORM_L2: c_int = 2;

// NppiBorderType
pub const NPP_BORDER_REPLICATE: c_int = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NppLibraryVersion {
    pub major: c_int,
    pub minor: c_int,
    pub build: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NppiSize {
    pub width: c_int,
    pub height: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NppiPoint {
    pub x: c_int,
    pub y: c_int,
}

type FnNppGetLibVersion = unsafe extern "C" fn() -> *const NppLibraryVersion;

type FnCudaDriverGetVersion = unsafe extern "C" fn(version: *mut c_int) -> CudaError;
type FnCudaRuntimeGetVersion = unsafe extern "C" fn(version: *mut c_int) -> CudaError;
type FnCudaGetDeviceCount = unsafe extern "C" fn(count: *mut c_int) -> CudaError;
type FnCudaDeviceGetAttribute =
    unsafe extern "C" fn(value: *mut c_int, attr: c_int, device: c_int) -> CudaError;
type FnCudaSetDevice = unsafe extern "C" fn(device: c_int) -> CudaError;
type FnCudaDeviceSynchronize = unsafe extern "C" fn() -> CudaError;
type FnCudaMemGetInfo = unsafe extern "C" fn(free: *mut usize, total: *mut usize) -> CudaError;
type FnCudaMalloc = unsafe extern "C" fn(ptr: *mut *mut c_void, size: usize) -> CudaError;
type FnCudaFree = unsafe extern "C" fn(ptr: *mut c_void) -> CudaError;
type FnCudaMemcpy2D = unsafe extern "C" fn(
    dst: *mut c_void,
    dpitch: usize,
    src: *const c_void,
    spitch: usize,
    width: usize,
    height: usize,
    kind: c_int,
) -> CudaError;
type FnCudaGetErrorString = unsafe extern "C" fn(error: CudaError) -> *const c_char;

type FnNppiMalloc8uC1 = unsafe extern "C" fn(width: c_int, height: c_int, step: *mut c_int) -> *mut u8;
type FnNppiFree = unsafe extern "C" fn(ptr: *mut c_void);

type FnNppiFilterCannyBorderGetBufferSize =
    unsafe extern "C" fn(roi: NppiSize, size: *mut c_int) -> NppStatus;
type FnNppiFilterCannyBorder8uC1R = unsafe extern "C" fn(
    src: *const u8,
    src_step: c_int,
    src_size: NppiSize,
    src_offset: NppiPoint,
    dst: *mut u8,
    dst_step: c_int,
    roi: NppiSize,
    kernel: c_int,
    mask: c_int,
    low: i16,
    high: i16,
    norm: c_int,
    border: c_int,
    buffer: *mut u8,
) -> NppStatus;

/// Loaded CUDA runtime and NPP entry points.
pub struct NppRuntime {
    _cudart: Library,
    _nppc: Library,
    _nppisu: Library,
    _nppif: Library,

    npp_get_lib_version: FnNppGetLibVersion,

    cuda_driver_get_version: FnCudaDriverGetVersion,
    cuda_runtime_get_version: FnCudaRuntimeGetVersion,
    cuda_get_device_count: FnCudaGetDeviceCount,
    cuda_device_get_attribute: FnCudaDeviceGetAttribute,
    cuda_set_device: FnCudaSetDevice,
    cuda_device_synchronize: FnCudaDeviceSynchronize,
    cuda_mem_get_info: FnCudaMemGetInfo,
    cuda_malloc: FnCudaMalloc,
    cuda_free: FnCudaFree,
    cuda_memcpy_2d: FnCudaMemcpy2D,
    cuda_get_error_string: Option<FnCudaGetErrorString>,

    nppi_malloc_8u_c1: FnNppiMalloc8uC1,
    nppi_free: FnNppiFree,

    nppi_filter_canny_border_get_buffer_size: FnNppiFilterCannyBorderGetBufferSize,
    nppi_filter_canny_border_8u_c1r: FnNppiFilterCannyBorder8uC1R,
}

// Function pointers are process-global; the libraries stay loaded with self.
unsafe impl Send for NppRuntime {}
unsafe impl Sync for NppRuntime {}

static RUNTIME: OnceLock<Result<Arc<NppRuntime>, String>> = OnceLock::new();

impl NppRuntime {
    /// Shared runtime, loading the libraries on first use.
    pub fn get() -> ComputeResult<Arc<Self>> {
        RUNTIME
            .get_or_init(Self::load)
            .clone()
            .map_err(ComputeError::LibraryLoad)
    }

    fn load() -> Result<Arc<Self>, String> {
        let cudart = Self::load_library("CUDA runtime", CUDART_NAMES)?;
        let nppc = Self::load_library("NPP core", NPPC_NAMES)?;
        let nppisu = Self::load_library("NPP support", NPPISU_NAMES)?;
        let nppif = Self::load_library("NPP filtering", NPPIF_NAMES)?;

        unsafe {
            let rt = Self {
                npp_get_lib_version: Self::load_fn(&nppc, "nppGetLibVersion")?,

                cuda_driver_get_version: Self::load_fn(&cudart, "cudaDriverGetVersion")?,
                cuda_runtime_get_version: Self::load_fn(&cudart, "cudaRuntimeGetVersion")?,
                cuda_get_device_count: Self::load_fn(&cudart, "cudaGetDeviceCount")?,
                cuda_device_get_attribute: Self::load_fn(&cudart, "cudaDeviceGetAttribute")?,
                cuda_set_device: Self::load_fn(&cudart, "cudaSetDevice")?,
                cuda_device_synchronize: Self::load_fn(&cudart, "cudaDeviceSynchronize")?,
                cuda_mem_get_info: Self::load_fn(&cudart, "cudaMemGetInfo")?,
                cuda_malloc: Self::load_fn(&cudart, "cudaMalloc")?,
                cuda_free: Self::load_fn(&cudart, "cudaFree")?,
                cuda_memcpy_2d: Self::load_fn(&cudart, "cudaMemcpy2D")?,
                cuda_get_error_string: Self::load_fn_opt(&cudart, "cudaGetErrorString"),

                nppi_malloc_8u_c1: Self::load_fn(&nppisu, "nppiMalloc_8u_C1")?,
                nppi_free: Self::load_fn(&nppisu, "nppiFree")?,

                nppi_filter_canny_border_get_buffer_size: Self::load_fn(
                    &nppif,
                    "nppiFilterCannyBorderGetBufferSize",
                )?,
                nppi_filter_canny_border_8u_c1r: Self::load_fn(&nppif, "nppiFilterCannyBorder_8u_C1R")?,

                _cudart: cudart,
                _nppc: nppc,
                _nppisu: nppisu,
                _nppif: nppif,
            };

            info!("NPP runtime loaded successfully");
            Ok(Arc::new(rt))
        }
    }

    fn load_library(what: &str, lib_names: &[&str]) -> Result<Library, String> {
        let mut last_err = format!("no candidate library names for {} on this platform", what);
        for name in lib_names {
            match unsafe { Library::new(name) } {
                Ok(lib) => {
                    info!("loaded {} from: {}", what, name);
                    return Ok(lib);
                }
                Err(e) => {
                    last_err = format!("{}: {}", name, e);
                    debug!("failed to load {}: {}", name, e);
                }
            }
        }

        Err(format!("failed to load {} library: {}", what, last_err))
    }

    unsafe fn load_fn<F: Copy>(lib: &Library, name: &str) -> Result<F, String> {
        let sym: Symbol<F> = unsafe { lib.get(name.as_bytes()) }
            .map_err(|e| format!("failed to load {}: {}", name, e))?;
        Ok(*sym)
    }

    unsafe fn load_fn_opt<F: Copy>(lib: &Library, name: &str) -> Option<F> {
        unsafe { lib.get(name.as_bytes()) }.ok().map(|s: Symbol<F>| *s)
    }

    // ── Errors ────────────────────────────────────────────────────

    fn cuda_check(&self, call: &'static str, code: CudaError) -> ComputeResult<()> {
        if code == CUDA_SUCCESS {
            return Ok(());
        }
        if let Some(msg) = self.error_string(code) {
            debug!("{} failed: {}", call, msg);
        }
        Err(ComputeError::Cuda { call, code })
    }

    fn npp_check(call: &'static str, status: NppStatus) -> ComputeResult<()> {
        // Positive values are warnings
        if status >= NPP_SUCCESS {
            if status > NPP_SUCCESS {
                debug!("{} returned warning {}", call, status);
            }
            Ok(())
        } else {
            Err(ComputeError::Npp { call, status })
        }
    }

    fn error_string(&self, code: CudaError) -> Option<String> {
        let f = self.cuda_get_error_string?;
        let ptr = unsafe { f(code) };
        if ptr.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    // ── Versions and devices ──────────────────────────────────────

    pub fn lib_version(&self) -> Version {
        let ptr = unsafe { (self.npp_get_lib_version)() };
        if ptr.is_null() {
            return Version::default();
        }
        let v = unsafe { *ptr };
        Version::new(v.major, v.minor, v.build)
    }

    pub fn driver_version(&self) -> ComputeResult<i32> {
        let mut version: c_int = 0;
        let res = unsafe { (self.cuda_driver_get_version)(&mut version) };
        self.cuda_check("cudaDriverGetVersion", res)?;
        Ok(version)
    }

    pub fn runtime_version(&self) -> ComputeResult<i32> {
        let mut version: c_int = 0;
        let res = unsafe { (self.cuda_runtime_get_version)(&mut version) };
        self.cuda_check("cudaRuntimeGetVersion", res)?;
        Ok(version)
    }

    pub fn device_count(&self) -> ComputeResult<i32> {
        let mut count: c_int = 0;
        let res = unsafe { (self.cuda_get_device_count)(&mut count) };
        self.cuda_check("cudaGetDeviceCount", res)?;
        Ok(count)
    }

    pub fn device_attribute(&self, attr: c_int, device: i32) -> ComputeResult<i32> {
        let mut value: c_int = 0;
        let res = unsafe { (self.cuda_device_get_attribute)(&mut value, attr, device) };
        self.cuda_check("cudaDeviceGetAttribute", res)?;
        Ok(value)
    }

    pub fn set_device(&self, device: i32) -> ComputeResult<()> {
        let res = unsafe { (self.cuda_set_device)(device) };
        self.cuda_check("cudaSetDevice", res)
    }

    pub fn synchronize(&self) -> ComputeResult<()> {
        let res = unsafe { (self.cuda_device_synchronize)() };
        self.cuda_check("cudaDeviceSynchronize", res)
    }

    /// (free, total) bytes on the current device.
    pub fn mem_info(&self) -> ComputeResult<(usize, usize)> {
        let (mut free, mut total) = (0usize, 0usize);
        let res = unsafe { (self.cuda_mem_get_info)(&mut free, &mut total) };
        self.cuda_check("cudaMemGetInfo", res)?;
        Ok((free, total))
    }

    // ── Memory ────────────────────────────────────────────────────

    /// Pitched 8-bit image allocation; `None` if the allocator failed.
    pub fn malloc_image(&self, width: i32, height: i32) -> Option<(*mut u8, usize)> {
        let mut step: c_int = 0;
        let ptr = unsafe { (self.nppi_malloc_8u_c1)(width, height, &mut step) };
        if ptr.is_null() || step <= 0 {
            return None;
        }
        Some((ptr, step as usize))
    }

    /// Release memory from [`Self::malloc_image`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `malloc_image` and not have been freed.
    pub unsafe fn free_image(&self, ptr: *mut u8) {
        unsafe { (self.nppi_free)(ptr.cast()) }
    }

    pub fn malloc(&self, len: usize) -> ComputeResult<*mut c_void> {
        let mut ptr: *mut c_void = std::ptr::null_mut();
        let res = unsafe { (self.cuda_malloc)(&mut ptr, len) };
        self.cuda_check("cudaMalloc", res)?;
        if ptr.is_null() {
            return Err(ComputeError::ScratchAllocation(len));
        }
        Ok(ptr)
    }

    /// Release memory from [`Self::malloc`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `malloc` and not have been freed.
    pub unsafe fn free(&self, ptr: *mut c_void) -> ComputeResult<()> {
        let res = unsafe { (self.cuda_free)(ptr) };
        self.cuda_check("cudaFree", res)
    }

    /// Pitched 2D copy of `width` bytes by `height` rows.
    ///
    /// # Safety
    ///
    /// Both regions must be valid for the given pitch and extent in the
    /// memory space `kind` names.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn memcpy_2d(
        &self,
        dst: *mut c_void,
        dpitch: usize,
        src: *const c_void,
        spitch: usize,
        width: usize,
        height: usize,
        kind: c_int,
    ) -> ComputeResult<()> {
        let res = unsafe { (self.cuda_memcpy_2d)(dst, dpitch, src, spitch, width, height, kind) };
        self.cuda_check("cudaMemcpy2D", res)
    }

    // ── Canny ─────────────────────────────────────────────────────

    pub fn canny_buffer_size(&self, roi: NppiSize) -> ComputeResult<usize> {
        let mut size: c_int = 0;
        let status = unsafe { (self.nppi_filter_canny_border_get_buffer_size)(roi, &mut size) };
        Self::npp_check("nppiFilterCannyBorderGetBufferSize", status)?;
        Ok(size.max(0) as usize)
    }

    /// # Safety
    ///
    /// `src` must point at the region origin inside a device image of
    /// `src_size` with row step `src_step`; `dst` must hold `roi` with row
    /// step `dst_step`; `buffer` must hold the size reported by
    /// [`Self::canny_buffer_size`] for `roi`.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn filter_canny_border(
        &self,
        src: *const u8,
        src_step: i32,
        src_size: NppiSize,
        src_offset: NppiPoint,
        dst: *mut u8,
        dst_step: i32,
        roi: NppiSize,
        kernel: c_int,
        mask: c_int,
        low: i16,
        high: i16,
        norm: c_int,
        border: c_int,
        buffer: *mut u8,
    ) -> ComputeResult<()> {
        let status = unsafe {
            (self.nppi_filter_canny_border_8u_c1r)(
                src, src_step, src_size, src_offset, dst, dst_step, roi, kernel, mask, low, high,
                norm, border, buffer,
            )
        };
        Self::npp_check("nppiFilterCannyBorder_8u_C1R", status)
    }
}

#[cfg(target_os = "linux")]
const CUDART_NAMES: &[&str] = &["libcudart.so", "libcudart.so.12", "libcudart.so.11.0"];
#[cfg(target_os = "linux")]
const NPPC_NAMES: &[&str] = &["libnppc.so", "libnppc.so.12", "libnppc.so.11"];
#[cfg(target_os = "linux")]
const NPPISU_NAMES: &[&str] = &["libnppisu.so", "libnppisu.so.12", "libnppisu.so.11"];
#[cfg(target_os = "linux")]
const NPPIF_NAMES: &[&str] = &["libnppif.so", "libnppif.so.12", "libnppif.so.11"];

#[cfg(target_os = "windows")]
const CUDART_NAMES: &[&str] = &["cudart64_12.dll", "cudart64_110.dll"];
#[cfg(target_os = "windows")]
const NPPC_NAMES: &[&str] = &["nppc64_12.dll", "nppc64_11.dll"];
#[cfg(target_os = "windows")]
const NPPISU_NAMES: &[&str] = &["nppisu64_12.dll", "nppisu64_11.dll"];
#[cfg(target_os = "windows")]
const NPPIF_NAMES: &[&str] = &["nppif64_12.dll", "nppif64_11.dll"];

// No CUDA toolkit ships for other targets
#[cfg(not(any(target_os = "linux", target_os = "windows")))]
const CUDART_NAMES: &[&str] = &[];
#[cfg(not(any(target_os = "linux", target_os = "windows")))]
const NPPC_NAMES: &[&str] = &[];
#[cfg(not(any(target_os = "linux", target_os = "windows")))]
const NPPISU_NAMES: &[&str] = &[];
#[cfg(not(any(target_os = "linux", target_os = "windows")))]
const NPPIF_NAMES: &[&str] = &[];
