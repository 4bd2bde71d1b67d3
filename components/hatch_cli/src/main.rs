//! HatchVM CLI
//!
//! Entry point for the bytecode runner. Parses CLI arguments, sets up
//! logging and delegates to [`hatch_cli::run`].

use clap::Parser as ClapParser;
use hatch_cli::Cli;

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .init();

    if cli.files.is_empty() && cli.classes.is_empty() && cli.calls.is_empty() {
        println!("HatchVM v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage:");
        println!("  hatch-vm <FILE>...                  Run bytecode containers");
        println!("  hatch-vm --disassemble <FILE>...    Print their disassembly");
        println!("  hatch-vm --dir <DIR> --class <NAME> Load a class from a directory");
        println!();
        println!("Run 'hatch-vm --help' for more options.");
        return;
    }

    match hatch_cli::run(&cli) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
