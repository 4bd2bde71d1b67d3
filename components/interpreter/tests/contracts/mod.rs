//! Contract tests for interpreter API
//!
//! These tests verify the public API the registry and hosts build on.

use std::sync::Arc;

use bytecode_system::{BytecodeContainer, Chunk, FunctionProto, OpCode};
use core_types::{hash_name, NativeInteger, Value, VmResult};
use interpreter::{
    entry_function, get_class_method, install_entity_base, read_module, spawn_entity,
    FieldLinker, NativeEntity, Runtime, ThreadState, VmThread, STACK_SIZE_MAX,
};
use memory_manager::{Heap, HostObject};

/// Runtime::new() starts with empty tables and one active thread
#[test]
fn test_runtime_new_contract() {
    let rt = Runtime::new();
    assert!(rt.globals.is_empty());
    assert!(rt.constants.is_empty());
    assert!(rt.modules.is_empty());
    assert_eq!(rt.active_threads, 1);
    assert!(rt.import_hook().is_none());
}

/// VmThread::new() is idle with an empty stack
#[test]
fn test_thread_new_contract() {
    let thread = VmThread::new(3);
    assert_eq!(thread.id(), 3);
    assert_eq!(thread.state(), ThreadState::Idle);
    assert_eq!(thread.stack_size(), 0);
    assert_eq!(thread.frame_count(), 0);
    assert_eq!(STACK_SIZE_MAX, 64 * 256);
}

/// read_module() binds a serialized container without executing it
#[test]
fn test_read_module_contract() {
    let mut chunk = Chunk::new();
    chunk.emit_integer(1);
    chunk.emit_named(OpCode::DefineGlobal, "Loaded");
    chunk.emit_op(OpCode::Null);
    chunk.emit_op(OpCode::Return);
    let bytes = BytecodeContainer::new(vec![FunctionProto::new(0, 0, chunk)]).to_bytes();

    let mut rt = Runtime::new();
    let module = read_module(&mut rt, &bytes, 0xCAFE).unwrap();
    assert!(rt.global("Loaded").is_none());
    assert_eq!(rt.modules, vec![module]);

    let entry = entry_function(&rt, module).unwrap();
    assert_eq!(rt.source_filename(entry), "0000CAFE");
    VmThread::new(0).run_function(&mut rt, entry, &[]).unwrap();
    assert_eq!(rt.global("Loaded"), Some(Value::Integer(1)));
}

/// read_module() reports malformed input instead of panicking
#[test]
fn test_read_module_rejects_garbage() {
    let mut rt = Runtime::new();
    assert!(read_module(&mut rt, b"NOPE", 1).is_err());
    assert!(rt.modules.is_empty());
}

/// Native binding populates class methods without bytecode
#[test]
fn test_native_binding_contract() {
    fn jump(_: &mut Heap, _: &[Value]) -> VmResult<Value> {
        Ok(Value::Integer(1))
    }

    let mut rt = Runtime::new();
    let class = rt.new_native_class("Sprite");
    rt.define_native(class, "Jump", jump);
    rt.global_const_integer(Some(class), "Layers", 4);

    assert!(rt.is_standard_library_class("Sprite"));
    assert!(get_class_method(&mut rt, class, hash_name("Jump")).is_some());
    assert_eq!(
        get_class_method(&mut rt, class, hash_name("Layers")),
        Some(Value::Integer(4))
    );
}

struct Ring {
    rings: NativeInteger,
}

impl HostObject for Ring {}

impl NativeEntity for Ring {
    fn link_fields(&self, linker: &mut FieldLinker<'_>) {
        linker.link_integer("Rings", self.rings.accessor());
    }
}

/// Entities of plain classes fall through to the entity base class
#[test]
fn test_entity_base_fallthrough_contract() {
    fn base_update(_: &mut Heap, _: &[Value]) -> VmResult<Value> {
        Ok(Value::Null)
    }

    let mut rt = Runtime::new();
    let base = install_entity_base(&mut rt, "Entity");
    rt.define_native(base, "Update", base_update);
    let class = rt.new_class("Monitor");
    assert!(get_class_method(&mut rt, class, hash_name("Update")).is_none());

    let mut thread = VmThread::new(0);
    let native = Arc::new(Ring {
        rings: NativeInteger::new(10),
    });
    spawn_entity(&mut rt, &mut thread, class, native).unwrap();
    assert!(get_class_method(&mut rt, class, hash_name("Update")).is_some());
}
