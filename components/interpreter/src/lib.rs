//! Bytecode interpreter for HatchVM scripts
//!
//! This crate provides:
//! - The [`Runtime`] context: heap, globals, constants, tokens and modules
//! - Binding of decoded containers into modules ([`loader`])
//! - Class and method resolution with field shadowing ([`class`])
//! - Interpreter threads with protected entry points ([`VmThread`])
//! - Entities whose fields alias native storage ([`entity`])
//! - Breakpoints and a debugger hook ([`debug`])
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Chunk, OpCode};
//! use core_types::Value;
//! use interpreter::{Runtime, VmThread};
//! use memory_manager::{Obj, ObjFunction};
//!
//! let mut chunk = Chunk::new();
//! chunk.emit_integer(40);
//! chunk.emit_op(OpCode::Increment);
//! chunk.emit_op(OpCode::Increment);
//! chunk.emit_op(OpCode::Return);
//!
//! let mut runtime = Runtime::new();
//! let function = runtime
//!     .heap
//!     .alloc(Obj::Function(ObjFunction::new(0, 0, chunk.code)));
//!
//! let mut thread = VmThread::new(0);
//! let result = thread.run_function(&mut runtime, function, &[]).unwrap();
//! assert_eq!(result, Value::Integer(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod call_frame;
pub mod class;
pub mod debug;
pub mod dispatch;
pub mod entity;
pub mod loader;
pub mod native;
pub mod runtime;
pub mod thread;

// Re-export main types at crate root
pub use call_frame::CallFrame;
pub use class::{class_has_method, class_of, define_method, extend_class, get_class_method, resolve_parent};
pub use debug::{DebugAction, DebugSession, Debugger};
pub use dispatch::{binary_operation, unary_operation};
pub use entity::{
    clone_entity, get_callable, install_entity_base, invoke_with_default, run_event, spawn_entity,
    unlink_entity, FieldLinker, NativeEntity,
};
pub use loader::{entry_function, load_module, read_module};
pub use runtime::{ImportHook, Runtime};
pub use thread::{ThreadState, VmThread, FRAMES_MAX, STACK_SIZE_MAX};
