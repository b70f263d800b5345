//! # armci — ARM emulator cross-build
//!
//! Mounts the emulator rootfs, runs the containerized cross-build, and
//! guarantees the mounts are torn down and git HEAD is checked on every
//! exit path, including Ctrl-C.

mod args;
mod output;

use std::process::ExitCode;

use anyhow::Context;
use armci_core::command::SystemRunner;
use armci_runtime::engine::Engine;
use armci_runtime::guard::InterruptFlag;
use clap::Parser;
use clap::error::ErrorKind;

use crate::args::{Cli, Plan};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            output::report_parse_error(&err);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::report(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let interrupt = InterruptFlag::install().context("failed to install Ctrl-C handler")?;

    let settings = match cli.into_plan()? {
        Plan::Unsupported { arch, code_name } => {
            tracing::info!(%arch, %code_name, "configuration is not supported yet, nothing to build");
            return Ok(());
        }
        Plan::Build(settings) => settings,
    };

    tracing::info!(
        arch = %settings.arch,
        code_name = %settings.code_name,
        configuration = %settings.configuration,
        emulator = %settings.emulator_path.display(),
        mount_path = %settings.mount_path.display(),
        "starting ARM emulator cross build"
    );

    let runner = SystemRunner::new();
    let report = Engine::new(&runner, interrupt).run(&settings)?;
    tracing::info!(head = %report.head, layers = report.mounts.len(), "cross build complete");
    Ok(())
}
