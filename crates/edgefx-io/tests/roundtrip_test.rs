//! Save/load identity and failure modes through the format-dispatching API.

use edgefx_io::{Format, HostImage, IoError, read, write};

fn checkerboard(width: u32, height: u32) -> HostImage {
    let data = (0..height)
        .flat_map(|y| (0..width).map(move |x| if (x / 4 + y / 4) % 2 == 0 { 30 } else { 220 }))
        .collect();
    HostImage::from_vec(width, height, data).unwrap()
}

#[test]
fn lossless_formats_preserve_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let image = checkerboard(37, 21);

    for name in ["a.png", "a.pgm", "a.tif"] {
        let path = dir.path().join(name);
        write(&path, &image).unwrap_or_else(|e| panic!("write {}: {}", name, e));
        let loaded = read(&path).unwrap_or_else(|e| panic!("read {}: {}", name, e));

        assert_eq!(loaded.width(), 37, "{}", name);
        assert_eq!(loaded.height(), 21, "{}", name);
        assert_eq!(loaded.to_packed(), image.to_packed(), "{}", name);
    }
}

#[test]
fn detection_prefers_magic_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mislabelled.png");
    edgefx_io::pnm::write(&path, &checkerboard(8, 8)).unwrap();

    assert_eq!(Format::detect(&path).unwrap(), Format::Pgm);
    assert_eq!(read(&path).unwrap().size(), checkerboard(8, 8).size());
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read(dir.path().join("nope.png")).unwrap_err();
    assert!(matches!(err, IoError::Io(_)));
}

#[test]
fn garbage_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.bin");
    std::fs::write(&path, b"definitely not an image").unwrap();
    assert!(matches!(read(&path), Err(IoError::UnsupportedFormat(_))));

    let path = dir.path().join("broken.png");
    std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]).unwrap();
    assert!(matches!(read(&path), Err(IoError::DecodeError(_))));
}

#[test]
fn unwritable_destination_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_such_dir").join("out.png");
    let err = write(&path, &checkerboard(4, 4)).unwrap_err();
    assert!(matches!(err, IoError::Io(_)));
}

#[test]
fn unknown_output_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = write(dir.path().join("out.exr"), &checkerboard(4, 4)).unwrap_err();
    assert!(matches!(err, IoError::UnsupportedFormat(_)));
}
