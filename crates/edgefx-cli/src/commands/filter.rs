//! Filter command: single file or directory batch

use crate::Cli;
use anyhow::{Context, Result, bail};
use edgefx_compute::{CannyConfig, CannyFilter, FilterKind, FilterSpec, Processor};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, trace, warn};

pub fn run(cli: &Cli) -> Result<ExitCode> {
    // Positionals are required unless --probe, which never reaches here
    let (Some(input), Some(filter), Some(output)) = (&cli.input, &cli.filter, &cli.output) else {
        bail!("Input, filter type and output are required");
    };
    trace!(input = %input.display(), filter = %filter, output = %output.display(), "filter::run");

    let Ok(kind) = filter.parse::<FilterKind>() else {
        println!("Filter type isn't supported!");
        return Ok(ExitCode::FAILURE);
    };

    let Some(processor) = super::open_processor(cli.backend.into(), cli.device)? else {
        return Ok(ExitCode::SUCCESS);
    };

    if input.is_dir() && !cli.batch {
        warn!(input = %input.display(), "input is a directory; pass --batch to process its images");
        return Ok(ExitCode::SUCCESS);
    }

    let spec = build_spec(kind, cli);

    if input.is_dir() {
        run_batch(&processor, &spec, input, output)?;
    } else {
        let output = super::resolve_output(input, output)?;
        process_file(&processor, &spec, input, &output)?;
    }

    Ok(ExitCode::SUCCESS)
}

fn build_spec(kind: FilterKind, cli: &Cli) -> FilterSpec {
    match kind.with_config(CannyConfig::with_thresholds(cli.low, cli.high)) {
        FilterSpec::Canny(f) => match cli.roi {
            Some(roi) => FilterSpec::Canny(f.with_roi(roi)),
            None => FilterSpec::Canny(f),
        },
    }
}

/// Supported images directly inside `dir`, in name order.
fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && edgefx_io::is_supported_path(p))
        .collect();
    files.sort();
    Ok(files)
}

fn run_batch(processor: &Processor, spec: &FilterSpec, input_dir: &Path, output_dir: &Path) -> Result<()> {
    if output_dir.exists() && !output_dir.is_dir() {
        bail!("Batch output must be a directory: {}", output_dir.display());
    }

    let files = collect_inputs(input_dir)?;
    if files.is_empty() {
        warn!(dir = %input_dir.display(), "no supported images found");
        return Ok(());
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create: {}", output_dir.display()))?;

    info!(files = files.len(), dir = %input_dir.display(), "Starting batch processing");

    // Sequential; the first failure aborts the batch
    for input in &files {
        let name = input
            .file_name()
            .with_context(|| format!("Input has no file name: {}", input.display()))?;
        process_file(processor, spec, input, &output_dir.join(name))?;
    }

    info!(files = files.len(), "Batch processing complete");
    Ok(())
}

fn process_file(processor: &Processor, spec: &FilterSpec, input: &Path, output: &Path) -> Result<()> {
    println!("Processing of {} started.", input.display());

    let image = super::load_image(input)?;
    debug!(size = %image.size(), pitch = image.pitch(), "loaded");

    let result = processor
        .apply(spec, &image)
        .with_context(|| format!("{} filter failed on {}", spec.kind(), input.display()))?;

    super::save_image(output, &result)?;
    println!("Processing of {} ended. Result saved to: {}", input.display(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pgm", "a.png", "notes.txt", "c.tif"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let files = collect_inputs(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, ["a.png", "b.pgm", "c.tif"]);
    }

    #[test]
    fn test_build_spec_carries_options() {
        use clap::Parser;
        let cli = Cli::try_parse_from([
            "edgefx", "a.pgm", "canny", "b.pgm", "--low", "10", "--high", "20", "--roi", "1,1,4,4",
        ])
        .unwrap();
        let FilterSpec::Canny(CannyFilter { config, roi }) = build_spec(FilterKind::Canny, &cli);
        assert_eq!((config.low_threshold, config.high_threshold), (10, 20));
        assert_eq!(roi, Some(edgefx_core::Rect::new(1, 1, 4, 4)));
    }
}
