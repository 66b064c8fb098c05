//! Host backend behaviour through the public filter API.

use edgefx_compute::{
    Accelerator, Backend, CannyConfig, CannyFilter, ComputeError, CpuAccelerator, DeviceImage,
    DifferentialKernel, Filter, FilterKind, MaskSize, Processor, describe_backends,
};
use edgefx_core::{HostImage, Rect};

/// Dark background with a bright square in the middle.
fn square(width: u32, height: u32) -> HostImage {
    let data = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                let inside = x >= width / 4 && x < 3 * width / 4 && y >= height / 4 && y < 3 * height / 4;
                if inside { 220 } else { 20 }
            })
        })
        .collect();
    HostImage::from_vec(width, height, data).unwrap()
}

#[test]
fn cpu_backend_always_listed() {
    assert!(Backend::Cpu.is_available());
    assert!(describe_backends().contains("CPU"));
}

#[test]
fn round_trip_preserves_pixels_with_padding() {
    let accel = CpuAccelerator::new();
    let data: Vec<u8> = (0..5 * 3 * 2).map(|i| i as u8).collect();
    // 5 wide, pitch 10: the padding bytes must not leak into the result
    let host = HostImage::from_vec_with_pitch(5, 3, 10, data).unwrap();

    let image = accel.upload(&host).unwrap();
    let back = accel.download(&image).unwrap();
    assert_eq!(back.pitch(), 5);
    assert!(back.same_pixels(&host));
}

#[test]
fn canny_output_is_binary_and_finds_square() {
    let accel = CpuAccelerator::new();
    let host = square(64, 48);
    let src = accel.upload(&host).unwrap();

    let dst = CannyFilter::default().apply(&accel, &src).unwrap();
    assert_eq!(dst.dimensions(), (64, 48));

    let out = accel.download(&dst).unwrap();
    let pixels = out.to_packed();
    assert!(pixels.iter().all(|&p| p == 0 || p == 255));
    assert!(pixels.iter().any(|&p| p == 255));
    // Far corner is flat
    assert_eq!(out.pixel(1, 1), Some(0));
}

#[test]
fn constant_image_has_no_edges() {
    let proc = Processor::new(Backend::Cpu).unwrap();
    let host = HostImage::from_vec(32, 32, vec![128; 32 * 32]).unwrap();
    let out = proc.apply(&FilterKind::Canny.with_config(CannyConfig::default()), &host).unwrap();
    assert!(out.to_packed().iter().all(|&p| p == 0));
}

#[test]
fn roi_sets_output_size() {
    let accel = CpuAccelerator::new();
    let src = accel.upload(&square(40, 30)).unwrap();
    let filter = CannyFilter::default().with_roi(Rect::new(5, 4, 20, 10));

    let dst = filter.apply(&accel, &src).unwrap();
    assert_eq!(dst.dimensions(), (20, 10));
}

#[test]
fn allocations_released_after_success() {
    let accel = CpuAccelerator::new();
    {
        let src = accel.upload(&square(32, 32)).unwrap();
        let dst = CannyFilter::default().apply(&accel, &src).unwrap();
        // Scratch is gone, src and dst remain
        assert_eq!(accel.live_allocations(), 2);
        drop(dst);
    }
    assert_eq!(accel.live_allocations(), 0);
}

#[test]
fn allocations_released_after_errors() {
    let accel = CpuAccelerator::new();
    let src = accel.upload(&square(16, 16)).unwrap();

    let out_of_bounds = CannyFilter::default().with_roi(Rect::new(10, 10, 10, 10));
    assert!(matches!(out_of_bounds.apply(&accel, &src), Err(ComputeError::Image(_))));

    let config = CannyConfig { kernel: DifferentialKernel::Scharr, mask: MaskSize::Mask5x5, ..CannyConfig::default() };
    let unsupported = CannyFilter::new(config);
    assert!(matches!(unsupported.apply(&accel, &src), Err(ComputeError::UnsupportedParameters(_))));

    let inverted = CannyFilter::new(CannyConfig::with_thresholds(200, 100));
    assert!(matches!(inverted.apply(&accel, &src), Err(ComputeError::UnsupportedParameters(_))));

    drop(src);
    assert_eq!(accel.live_allocations(), 0);
}

#[test]
fn higher_thresholds_find_fewer_edges() {
    let proc = Processor::new(Backend::Cpu).unwrap();
    let data = (0..64u32 * 64).map(|i| ((i % 64) * 4) as u8).collect();
    let host = HostImage::from_vec(64, 64, data).unwrap();

    let count = |low, high| {
        let spec = FilterKind::Canny.with_config(CannyConfig::with_thresholds(low, high));
        proc.apply(&spec, &host).unwrap().to_packed().iter().filter(|&&p| p == 255).count()
    };
    assert!(count(10, 20) >= count(i16::MAX - 1, i16::MAX));
    assert_eq!(count(i16::MAX - 1, i16::MAX), 0);
}
