//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

/// Run or inspect compiled HatchVM bytecode
#[derive(Debug, Parser)]
#[command(name = "hatch-vm", version, about)]
pub struct Cli {
    /// Bytecode containers to run, in order
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Directory holding `Objects.hcm` and `<HASH>.ibc` files
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Load a class from the directory (repeatable)
    #[arg(short, long = "class", value_name = "NAME")]
    pub classes: Vec<String>,

    /// Call a global function after loading (repeatable)
    #[arg(long = "call", value_name = "NAME")]
    pub calls: Vec<String>,

    /// Print the disassembly of each file instead of running it
    #[arg(long)]
    pub disassemble: bool,

    /// JSON runtime configuration
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Collect at exit and print collector statistics
    #[arg(long)]
    pub gc_stats: bool,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Log filter for the verbosity flag
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
