//! Call trace frames for error reporting.

use std::fmt;

/// Represents a single frame in a script call trace.
///
/// # Examples
///
/// ```
/// use core_types::StackFrame;
///
/// let frame = StackFrame::new("method Player::Update", "Player", Some(25));
/// assert_eq!(frame.to_string(), "called method Player::Update of Player on Line 25");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Display name of the function
    pub function_name: String,
    /// Source filename the function was compiled from
    pub source_filename: String,
    /// Line of the active call site, when a line table exists
    pub line: Option<u32>,
}

impl StackFrame {
    /// Create a frame
    pub fn new(
        function_name: impl Into<String>,
        source_filename: impl Into<String>,
        line: Option<u32>,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            source_filename: source_filename.into(),
            line,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "called {} of {}", self.function_name, self.source_filename)?;
        match self.line {
            Some(line) if line > 0 => write!(f, " on Line {}", line),
            _ => Ok(()),
        }
    }
}
