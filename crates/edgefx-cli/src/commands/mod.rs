//! CLI command implementations

pub mod filter;
pub mod probe;

use anyhow::{Context, Result};
use edgefx_compute::{Backend, ComputeError, DeviceInfo, MIN_COMPUTE_CAPABILITY, Processor};
use edgefx_io::HostImage;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Load image from path
pub fn load_image(path: &Path) -> Result<HostImage> {
    edgefx_io::read(path)
        .with_context(|| format!("Failed to load: {}", path.display()))
}

/// Save image to path
pub fn save_image(path: &Path, image: &HostImage) -> Result<()> {
    edgefx_io::write(path, image)
        .with_context(|| format!("Failed to save: {}", path.display()))
}

/// Destination for a single input: `<output>/<input name>` when `output` is
/// an existing directory, `output` itself otherwise.
pub fn resolve_output(input: &Path, output: &Path) -> Result<PathBuf> {
    if output.is_dir() {
        let name = input
            .file_name()
            .with_context(|| format!("Input has no file name: {}", input.display()))?;
        Ok(output.join(name))
    } else {
        Ok(output.to_path_buf())
    }
}

/// Message for a backend error that ends the run successfully.
fn no_device_message(err: &ComputeError) -> Option<String> {
    match err {
        ComputeError::NoDevice(msg) => Some(format!("No suitable device found: {}", msg)),
        _ => None,
    }
}

/// Message for a device too old to run the filter, `None` if it is usable.
fn unsupported_device_message(report: &DeviceInfo) -> Option<String> {
    (!report.meets(MIN_COMPUTE_CAPABILITY)).then(|| {
        format!(
            "Device {} does not meet the minimum compute capability {}",
            report.device, MIN_COMPUTE_CAPABILITY
        )
    })
}

/// Opens the backend and prints its report.
///
/// Returns `None` when no device can run the filter; callers end the
/// process successfully in that case.
pub fn open_processor(backend: Backend, device: Option<u32>) -> Result<Option<Processor>> {
    let processor = match Processor::with_device(backend, device) {
        Ok(p) => p,
        Err(e) => match no_device_message(&e) {
            Some(msg) => {
                println!("{}", msg);
                return Ok(None);
            }
            None => return Err(e).context("Failed to initialize backend"),
        },
    };

    if backend == Backend::Auto && processor.backend() == Backend::Cpu {
        warn!("NPP not available, falling back to the host backend");
    }

    let report = processor.probe().context("Failed to query device")?;
    println!("{}", report);

    if let Some(msg) = unsupported_device_message(&report) {
        println!("{}", msg);
        return Ok(None);
    }

    info!(backend = processor.backend_name(), device = report.device, "device ready");
    Ok(Some(processor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgefx_compute::{ComputeCapability, Version};

    #[test]
    fn test_resolve_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = Path::new("images/lena.pgm");

        assert_eq!(resolve_output(input, dir.path()).unwrap(), dir.path().join("lena.pgm"));

        let file = dir.path().join("edges.png");
        assert_eq!(resolve_output(input, &file).unwrap(), file);
    }

    fn npp_report(capability: ComputeCapability) -> DeviceInfo {
        DeviceInfo {
            backend: "npp",
            library: Version::new(12, 3, 0),
            driver: Some(Version::new(12, 4, 0)),
            runtime: Some(Version::new(12, 4, 0)),
            device: 0,
            device_name: "Test GPU".into(),
            capability: Some(capability),
            processors: 2,
            memory: Some(1 << 30),
        }
    }

    #[test]
    fn test_old_device_ends_run() {
        let msg = unsupported_device_message(&npp_report(ComputeCapability::new(0, 9))).unwrap();
        assert!(msg.contains("Device 0"));
        assert!(msg.contains("minimum compute capability 1.0"));

        assert!(unsupported_device_message(&npp_report(ComputeCapability::new(8, 6))).is_none());
    }

    #[test]
    fn test_host_device_is_usable() {
        let report = DeviceInfo {
            backend: "cpu",
            library: Version::new(0, 25, 0),
            driver: None,
            runtime: None,
            device: 0,
            device_name: "host".into(),
            capability: None,
            processors: 4,
            memory: None,
        };
        assert!(unsupported_device_message(&report).is_none());
    }

    #[test]
    fn test_no_device_ends_run() {
        let msg = no_device_message(&ComputeError::NoDevice("no CUDA devices".into())).unwrap();
        assert_eq!(msg, "No suitable device found: no CUDA devices");

        assert!(no_device_message(&ComputeError::LibraryLoad("libnppc.so".into())).is_none());
    }
}
