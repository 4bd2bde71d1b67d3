//! Orchestration for one CLI invocation
//!
//! The [`Runner`] owns a script registry and turns the command line into
//! loads, calls and disassembly. Output is returned as text so the binary
//! and the tests print the same thing.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use bytecode_system::{BytecodeContainer, Disassembler};
use core_types::{filename_hash, hash_name};
use script_registry::{MemorySource, RuntimeConfig, ScriptRegistry};

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Runs bytecode through a [`ScriptRegistry`]
#[derive(Debug)]
pub struct Runner {
    registry: ScriptRegistry,
    disassemble: bool,
    gc_stats: bool,
}

impl Runner {
    /// Create a runner with no bytecode directory
    ///
    /// # Example
    /// ```
    /// use hatch_cli::Runner;
    /// use script_registry::RuntimeConfig;
    ///
    /// let runner = Runner::new(RuntimeConfig::default());
    /// ```
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_registry(ScriptRegistry::new(config, MemorySource::new()))
    }

    /// Create a runner reading classes from `dir`
    pub fn with_directory(config: RuntimeConfig, dir: &Path) -> CliResult<Self> {
        Ok(Self::with_registry(ScriptRegistry::with_directory(
            config, dir,
        )?))
    }

    fn with_registry(registry: ScriptRegistry) -> Self {
        Self {
            registry,
            disassemble: false,
            gc_stats: false,
        }
    }

    /// Build a runner from parsed arguments
    pub fn from_cli(cli: &Cli) -> CliResult<Self> {
        let config = match &cli.config {
            Some(path) => RuntimeConfig::from_path(path)?,
            None => RuntimeConfig::default(),
        };
        let runner = match &cli.dir {
            Some(dir) => Self::with_directory(config, dir)?,
            None => Self::new(config),
        };
        Ok(runner
            .with_disassemble(cli.disassemble)
            .with_gc_stats(cli.gc_stats))
    }

    /// Disassemble files instead of running them
    pub fn with_disassemble(mut self, enabled: bool) -> Self {
        self.disassemble = enabled;
        self
    }

    /// Collect at the end and report statistics
    pub fn with_gc_stats(mut self, enabled: bool) -> Self {
        self.gc_stats = enabled;
        self
    }

    /// The registry scripts run in
    pub fn registry(&self) -> &ScriptRegistry {
        &self.registry
    }

    /// Do everything the command line asks, returning the text to print
    pub fn execute(&mut self, cli: &Cli) -> CliResult<String> {
        let mut out = String::new();
        for path in &cli.files {
            if self.disassemble {
                out.push_str(&disassemble_file(path)?);
            } else {
                self.run_file(path)?;
            }
        }
        if self.disassemble {
            return Ok(out);
        }

        for class in &cli.classes {
            self.load_class(class)?;
        }
        for function in &cli.calls {
            self.call(function)?;
        }
        if self.gc_stats {
            out.push_str(&self.gc_summary());
        }
        Ok(out)
    }

    /// Run a container file; its filename hash ignores the extension
    pub fn run_file(&mut self, path: &Path) -> CliResult<()> {
        let bytes = read(path)?;
        let hash = filename_hash(&path.to_string_lossy());
        log::debug!("Running {} ({:08X})", path.display(), hash);
        self.registry.run_bytecode(&bytes, hash)?;
        Ok(())
    }

    /// Load a class from the bytecode directory
    pub fn load_class(&mut self, name: &str) -> CliResult<()> {
        if !self.registry.load_object_class(name) {
            return Err(CliError::ClassNotLoaded(name.to_string()));
        }
        Ok(())
    }

    /// Call a global function with no arguments
    pub fn call(&mut self, name: &str) -> CliResult<()> {
        if !self.registry.call_function(name) {
            return Err(CliError::CallFailed(name.to_string()));
        }
        Ok(())
    }

    /// Force a collection and describe the collector's state
    pub fn gc_summary(&self) -> String {
        let report = self.registry.force_garbage_collection();
        let stats = self.registry.gc_stats();
        let mut out = String::new();
        match report {
            Some(report) => {
                let _ = writeln!(
                    out,
                    "Freed {} objects ({} bytes), {} survived",
                    report.freed, report.freed_bytes, report.survivors
                );
            }
            None => out.push_str("Collection skipped\n"),
        }
        let _ = writeln!(
            out,
            "Collections: {}, total freed: {}, live bytes: {}",
            stats.collections,
            stats.total_freed,
            self.registry.garbage_size()
        );
        out
    }
}

fn read(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| CliError::Io {
        path: PathBuf::from(path),
        source,
    })
}

/// Disassemble every function of a container file
pub fn disassemble_file(path: &Path) -> CliResult<String> {
    let bytes = read(path)?;
    let container = BytecodeContainer::read(&bytes).map_err(|source| CliError::Container {
        path: PathBuf::from(path),
        source,
    })?;
    Ok(disassemble(&container))
}

/// Disassemble every function of a container
pub fn disassemble(container: &BytecodeContainer) -> String {
    let tokens: HashMap<u32, String> = container
        .tokens
        .iter()
        .map(|t| (hash_name(t), t.clone()))
        .collect();
    let disassembler = Disassembler::new().with_tokens(&tokens);

    let mut out = String::new();
    for (index, function) in container.functions.iter().enumerate() {
        let name = match tokens.get(&function.name_hash) {
            Some(token) => token.as_str(),
            None if index == 0 => "main",
            None => "<anonymous-fn>",
        };
        out.push_str(&disassembler.chunk(&function.chunk, name));
    }
    out
}
