//! Script runtime error types.
//!
//! Errors are plain values reported to the host; they are never turned into
//! language-level exception objects.

use thiserror::Error;

use crate::StackFrame;

/// The kind of runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A requested script or class file does not exist
    LoadAbsent,
    /// Bad arity, out-of-range index, wrong value kind, missing name
    Runtime,
    /// Stack or frame overflow, corrupt bytecode, aborted by the debugger
    Fatal,
}

/// A runtime error with message and call trace.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, VmError};
///
/// let error = VmError::runtime("Cannot divide integer by zero.");
/// assert_eq!(error.kind, ErrorKind::Runtime);
/// assert!(!error.is_fatal());
/// assert_eq!(error.to_string(), "Cannot divide integer by zero.");
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct VmError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Call stack at the time of the error, outermost frame first
    pub stack: Vec<StackFrame>,
}

/// Result alias for runtime operations
pub type VmResult<T> = Result<T, VmError>;

impl VmError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: Vec::new(),
        }
    }

    /// Recoverable runtime error
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    /// Fatal error terminating the current call chain
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    /// Missing script or class file
    pub fn load_absent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LoadAbsent, message)
    }

    /// Attach a call trace
    pub fn with_stack(mut self, stack: Vec<StackFrame>) -> Self {
        self.stack = stack;
        self
    }

    /// Whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::Fatal
    }
}
