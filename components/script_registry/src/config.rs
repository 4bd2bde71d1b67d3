//! Runtime configuration.
//!
//! Configuration is plain data with serde defaults, so a JSON document only
//! needs the keys it changes:
//!
//! ```
//! use script_registry::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_json_str(r#"{ "debug": true }"#).unwrap();
//! assert!(config.debug);
//! assert_eq!(config.thread_count(), 1);
//! ```

use std::path::Path;

use memory_manager::{DEFAULT_GC_GROWTH, DEFAULT_GC_THRESHOLD};
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Size of the interpreter thread pool
pub const MAX_THREADS: usize = 8;

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interpreter threads to create (clamped to `1..=8`)
    pub thread_count: usize,
    /// Accounted heap size that triggers the first collection
    pub initial_gc_threshold: usize,
    /// Headroom added to the live size after each collection
    pub gc_growth: usize,
    /// Honour breakpoints
    pub debug: bool,
    /// Collect opportunistically after each top-level call
    pub auto_gc: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thread_count: 1,
            initial_gc_threshold: DEFAULT_GC_THRESHOLD,
            gc_growth: DEFAULT_GC_GROWTH,
            debug: false,
            auto_gc: true,
        }
    }
}

impl RuntimeConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of interpreter threads
    pub fn with_thread_count(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    /// Set the first collection threshold
    pub fn with_gc_threshold(mut self, bytes: usize) -> Self {
        self.initial_gc_threshold = bytes;
        self
    }

    /// Set the post-collection headroom
    pub fn with_gc_growth(mut self, bytes: usize) -> Self {
        self.gc_growth = bytes;
        self
    }

    /// Enable or disable breakpoints
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable or disable opportunistic collection
    pub fn with_auto_gc(mut self, auto_gc: bool) -> Self {
        self.auto_gc = auto_gc;
        self
    }

    /// Thread count clamped to the pool size
    pub fn thread_count(&self) -> usize {
        self.thread_count.clamp(1, MAX_THREADS)
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> RegistryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
        Self::from_json_str(&json)
    }
}
