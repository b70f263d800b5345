//! Error and usage reporting for the terminal.

use armci_common::error::ArmCiError;
use clap::CommandFactory;

use crate::args::Cli;

/// Prints a flag parsing error followed by the usage text.
#[allow(clippy::print_stderr)]
pub fn report_parse_error(err: &clap::Error) {
    let _ = err.print();
    print_usage();
}

/// Prints a fatal error, adding usage text for validation errors.
#[allow(clippy::print_stderr)]
pub fn report(err: &anyhow::Error) {
    eprintln!("ERROR: {err:#}");
    if err
        .downcast_ref::<ArmCiError>()
        .is_some_and(ArmCiError::shows_usage)
    {
        print_usage();
    }
}

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!();
    eprintln!("{}", Cli::command().render_help());
}
