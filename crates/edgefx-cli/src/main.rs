//! edgefx - Canny edge detection on NPP or the host
//!
//! Loads an 8-bit grayscale image, runs the Canny primitive on the selected
//! accelerator and writes the edge map.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use edgefx_compute::{Backend, CannyConfig};
use edgefx_core::Rect;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "edgefx")]
#[command(author, version, about = "Canny edge detection on NPP or the host")]
#[command(long_about = "
Runs the Canny edge detector on 8-bit grayscale images (PNG, PGM, JPEG, TIFF).
Uses NVIDIA NPP when the CUDA runtime and a device are present, otherwise the
host backend.

Examples:
  edgefx lena.pgm canny lena_edges.png        # Explicit output file
  edgefx lena.pgm canny out/                  # Writes out/lena.pgm
  edgefx images/ canny edges/ --batch         # Every image in a directory
  edgefx in.png canny out.png --low 40 --high 120 --backend cpu
  edgefx --probe                              # Library and device report
")]
struct Cli {
    /// Input image, or directory with --batch
    #[arg(required_unless_present = "probe")]
    input: Option<PathBuf>,

    /// Filter type (canny)
    #[arg(required_unless_present = "probe")]
    filter: Option<String>,

    /// Output image or directory
    #[arg(required_unless_present = "probe")]
    output: Option<PathBuf>,

    /// Accelerator backend
    #[arg(short, long, value_enum, default_value = "auto")]
    backend: BackendArg,

    /// CUDA device ordinal (default: most capable)
    #[arg(short, long)]
    device: Option<u32>,

    /// Canny low threshold
    #[arg(long, default_value_t = CannyConfig::DEFAULT_LOW_THRESHOLD, allow_negative_numbers = true)]
    low: i16,

    /// Canny high threshold
    #[arg(long, default_value_t = CannyConfig::DEFAULT_HIGH_THRESHOLD, allow_negative_numbers = true)]
    high: i16,

    /// Region to process as X,Y,W,H (default: whole image)
    #[arg(long, value_parser = parse_roi)]
    roi: Option<Rect>,

    /// Process every supported image in the input directory
    #[arg(long)]
    batch: bool,

    /// Print the library and device report, then exit
    #[arg(long)]
    probe: bool,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Also write log output to this file
    #[arg(long)]
    log: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Cpu,
    Npp,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Cpu => Backend::Cpu,
            BackendArg::Npp => Backend::Npp,
        }
    }
}

fn parse_roi(s: &str) -> std::result::Result<Rect, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("invalid ROI '{}': {}", s, e))?;
    match parts[..] {
        [x, y, w, h] => Ok(Rect::new(x, y, w, h)),
        _ => Err(format!("ROI must be X,Y,W,H (got '{}')", s)),
    }
}

/// Installs the stderr subscriber, plus a file writer for `--log`.
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(verbose: u8, log: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Log path has no file name: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to install logger")?;

    Ok(guard)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let program = std::env::args().next().unwrap_or_else(|| "edgefx".to_string());
    println!("{} Starting...\n", program);

    if cli.probe {
        commands::probe::run(&cli)
    } else {
        commands::filter::run(&cli)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Usage errors exit 1; --help and --version exit 0
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    let _guard = match init_logging(cli.verbose, cli.log.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Program error! The following exception occurred:");
            eprintln!("{:#}", e);
            eprintln!("Aborting.");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roi() {
        assert_eq!(parse_roi("1,2,30,40").unwrap(), Rect::new(1, 2, 30, 40));
        assert_eq!(parse_roi(" 0, 0, 5, 5").unwrap(), Rect::new(0, 0, 5, 5));
        assert!(parse_roi("1,2,3").is_err());
        assert!(parse_roi("a,b,c,d").is_err());
    }

    #[test]
    fn test_cli_requires_positionals() {
        assert!(Cli::try_parse_from(["edgefx", "in.pgm"]).is_err());
        assert!(Cli::try_parse_from(["edgefx", "in.pgm", "canny", "out.pgm"]).is_ok());
        assert!(Cli::try_parse_from(["edgefx", "--probe"]).is_ok());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["edgefx", "a.pgm", "canny", "b.pgm", "-vv"]).unwrap();
        assert_eq!(cli.low, 72);
        assert_eq!(cli.high, 256);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.backend, BackendArg::Auto));
        assert!(!cli.batch);
    }
}
