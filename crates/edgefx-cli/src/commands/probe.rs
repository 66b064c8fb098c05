//! Probe command: backend list and device report

use crate::Cli;
use anyhow::Result;
use edgefx_compute::describe_backends;
use std::process::ExitCode;
use tracing::trace;

pub fn run(cli: &Cli) -> Result<ExitCode> {
    trace!(device = ?cli.device, "probe::run");

    print!("{}", describe_backends());
    println!();

    // Report is printed by open_processor; nothing else to do
    let _ = super::open_processor(cli.backend.into(), cli.device)?;
    Ok(ExitCode::SUCCESS)
}
