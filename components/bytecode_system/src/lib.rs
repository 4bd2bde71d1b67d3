//! Bytecode system for the script VM
//!
//! This crate defines the instruction set and the binary formats produced by
//! the external script compiler and consumed by the runtime.
//!
//! # Features
//!
//! - Stable single-byte opcode numbering
//! - Chunk assembler with line tables and jump patching
//! - `HTVM` container reader/writer
//! - `HMAP` class map reader/writer
//! - Disassembler
//!
//! # Example
//!
//! ```
//! use bytecode_system::{BytecodeContainer, Chunk, FunctionProto, OpCode};
//!
//! let mut chunk = Chunk::new();
//! chunk.emit_constant(42);
//! chunk.emit_op(OpCode::Print);
//! chunk.emit_op(OpCode::Null);
//! chunk.emit_op(OpCode::Return);
//!
//! let main = FunctionProto::new(0, core_types::hash_name("main"), chunk);
//! let bytes = BytecodeContainer::new(vec![main]).to_bytes();
//! let restored = BytecodeContainer::read(&bytes).unwrap();
//! assert_eq!(restored.functions.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod class_map;
pub mod constant;
pub mod container;
pub mod disasm;
pub mod opcode;

// Re-export main types at crate root
pub use chunk::Chunk;
pub use class_map::{ClassEntry, ClassMap};
pub use constant::Constant;
pub use container::{BytecodeContainer, ContainerError, FunctionProto, LATEST_VERSION, MAGIC};
pub use disasm::{instruction_size, Disassembler};
pub use opcode::OpCode;
