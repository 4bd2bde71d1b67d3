//! Error types for the CLI

use std::path::PathBuf;

use bytecode_system::ContainerError;
use script_registry::RegistryError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Registry failure: configuration, source directory or script error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A container could not be decoded for disassembly
    #[error("{}: {source}", path.display())]
    Container {
        /// File being decoded
        path: PathBuf,
        /// Decode failure
        #[source]
        source: ContainerError,
    },

    /// File I/O error
    #[error("Could not read file '{}': {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A class could not be loaded
    #[error("Could not load class {0}")]
    ClassNotLoaded(String),

    /// A global function is missing or failed
    #[error("Could not call function {0}")]
    CallFailed(String),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
