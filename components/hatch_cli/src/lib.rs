//! HatchVM command-line library
//!
//! Provides the argument parser and the [`Runner`] behind the `hatch-vm`
//! binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod runner;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use runner::{disassemble, disassemble_file, Runner};

/// Run one parsed command line and return what it prints
pub fn run(cli: &Cli) -> CliResult<String> {
    let mut runner = Runner::from_cli(cli)?;
    runner.execute(cli)
}
