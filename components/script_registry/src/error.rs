//! Registry error types.

use std::path::PathBuf;

use bytecode_system::ContainerError;
use core_types::VmError;
use thiserror::Error;

/// Errors raised while loading or running scripts through the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A bytecode container or class map failed to parse
    #[error("Malformed bytecode: {0}")]
    Container(#[from] ContainerError),

    /// A script raised an error
    #[error(transparent)]
    Vm(#[from] VmError),

    /// A directory source could not read a file
    #[error("Could not read {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A configuration document failed to parse
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// No global class has this name
    #[error("No class! Can't find: {0}")]
    UnknownClass(String),
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error ended a call chain fatally
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Vm(error) => error.is_fatal(),
            Self::Container(_) => true,
            _ => false,
        }
    }
}

/// Result alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;
