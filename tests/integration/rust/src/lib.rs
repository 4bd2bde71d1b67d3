//! Integration test suite for HatchVM
//!
//! This crate provides cross-component tests that verify the runtime's
//! components work together, plus the small fixtures they share.

use bytecode_system::{BytecodeContainer, Chunk, FunctionProto, OpCode};
use core_types::{hash_name, ObjHandle, Value};
use interpreter::Runtime;

/// Re-export components for test convenience
pub mod components {
    pub use bytecode_system;
    pub use core_types;
    pub use hatch_cli;
    pub use interpreter;
    pub use memory_manager;
    pub use script_registry;
}

/// Entry function wrapping `chunk`
pub fn entry(chunk: Chunk) -> FunctionProto {
    FunctionProto::new(0, 0, chunk)
}

/// Serialize functions with a token table
pub fn container(functions: Vec<FunctionProto>, tokens: &[&str]) -> Vec<u8> {
    BytecodeContainer::new(functions)
        .with_tokens(tokens.iter().copied())
        .to_bytes()
}

/// A script that increments the global `Runs`
pub fn counter_script() -> Vec<u8> {
    let mut chunk = Chunk::new();
    chunk.emit_named(OpCode::GetGlobal, "Runs");
    chunk.emit_op(OpCode::Increment);
    chunk.emit_named(OpCode::SetGlobal, "Runs");
    chunk.emit_op(OpCode::Return);
    container(vec![entry(chunk)], &["Runs"])
}

/// Classes `C0` to `C{depth-1}`, each inheriting from the one before.
///
/// Parents are declared by hash only and resolve on first lookup. The
/// handles are returned base first.
pub fn class_chain(runtime: &mut Runtime, depth: usize) -> Vec<ObjHandle> {
    let mut classes = Vec::with_capacity(depth);
    for level in 0..depth {
        let name = format!("C{}", level);
        let class = runtime.new_class(&name);
        if level > 0 {
            if let Some(c) = runtime.heap.class_mut(class) {
                c.parent_hash = Some(hash_name(&format!("C{}", level - 1)));
            }
        }
        runtime.set_global(&name, Value::Object(class));
        classes.push(class);
    }
    classes
}
