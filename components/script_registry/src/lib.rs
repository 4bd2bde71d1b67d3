//! Script registry for HatchVM
//!
//! This crate provides:
//! - [`ScriptRegistry`]: one runtime, its thread pool and the locking around them
//! - Idempotent script loading and multi-file class loading ([`loader`])
//! - Bytecode sources in memory or on disk ([`source`])
//! - [`RuntimeConfig`], loadable from JSON
//!
//! # Example
//!
//! ```
//! use bytecode_system::{BytecodeContainer, Chunk, FunctionProto, OpCode};
//! use core_types::Value;
//! use script_registry::{MemorySource, RuntimeConfig, ScriptRegistry};
//!
//! let mut chunk = Chunk::new();
//! chunk.emit_integer(3);
//! chunk.emit_named(OpCode::DefineGlobal, "Lives");
//! chunk.emit_op(OpCode::Null);
//! chunk.emit_op(OpCode::Return);
//! let bytes = BytecodeContainer::new(vec![FunctionProto::new(0, 0, chunk)]).to_bytes();
//!
//! let mut source = MemorySource::new();
//! let hash = source.insert_named("Global.hsl", bytes);
//!
//! let registry = ScriptRegistry::new(RuntimeConfig::default(), source);
//! assert!(registry.load_script(hash));
//! assert_eq!(registry.lock().runtime.global("Lives"), Some(Value::Integer(3)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod loader;
pub mod registry;
pub mod source;

pub use config::{RuntimeConfig, MAX_THREADS};
pub use error::{RegistryError, RegistryResult};
pub use loader::{ClassBinder, ClassLoader};
pub use registry::{RegistryState, ScriptRegistry};
pub use source::{BytecodeSource, DirectorySource, MemorySource, CLASS_MAP_FILENAME};
