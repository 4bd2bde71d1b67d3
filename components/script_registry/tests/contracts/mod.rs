//! Contract tests for the script registry API
//!
//! These tests pin the behaviour hosts rely on: boolean loads, directory
//! layout and configuration files.

use bytecode_system::{BytecodeContainer, Chunk, ClassMap, FunctionProto, OpCode};
use core_types::{filename_hash, hash_name, Value};
use script_registry::{
    MemorySource, RegistryError, RuntimeConfig, ScriptRegistry, CLASS_MAP_FILENAME,
};

fn defines(name: &str, value: i32) -> Vec<u8> {
    let mut chunk = Chunk::new();
    chunk.emit_integer(value);
    chunk.emit_named(OpCode::DefineGlobal, name);
    chunk.emit_op(OpCode::Null);
    chunk.emit_op(OpCode::Return);
    BytecodeContainer::new(vec![FunctionProto::new(0, 0, chunk)]).to_bytes()
}

fn class_container(name: &str) -> BytecodeContainer {
    let mut chunk = Chunk::new();
    chunk.emit_class(name, false);
    chunk.emit_named(OpCode::DefineGlobal, name);
    chunk.emit_op(OpCode::Null);
    chunk.emit_op(OpCode::Return);
    BytecodeContainer::new(vec![FunctionProto::new(0, 0, chunk)])
        .with_source_filename(format!("Objects/{}.hsl", name))
}

fn defines_class(name: &str) -> Vec<u8> {
    class_container(name).with_tokens([name]).to_bytes()
}

/// ScriptRegistry::new() creates the configured thread pool and no scripts
#[test]
fn test_registry_new_contract() {
    let config = RuntimeConfig::new().with_thread_count(2);
    let registry = ScriptRegistry::new(config.clone(), MemorySource::new());
    assert_eq!(registry.config(), &config);

    let state = registry.lock();
    assert_eq!(state.threads.len(), 2);
    assert!(state.runtime.globals.is_empty());
    assert!(state.runtime.modules.is_empty());
}

/// Loads report absence as false instead of an error
#[test]
fn test_loads_are_boolean_contract() {
    let registry = ScriptRegistry::new(RuntimeConfig::default(), MemorySource::new());
    assert!(!registry.load_script(0x1234));
    assert!(!registry.load_script_named("Missing.hsl"));
    assert!(!registry.load_object_class("Missing"));
    assert!(!registry.call_function("Missing"));
}

/// A directory source reads `Objects.hcm` and `<HASH>.ibc` files
#[test]
fn test_directory_layout_contract() {
    let dir = tempfile::tempdir().unwrap();
    let ring_file = filename_hash("Objects/Ring");
    let global_file = filename_hash("Scripts/Global");

    let mut map = ClassMap::new();
    map.insert(hash_name("Ring"), ring_file);
    std::fs::write(dir.path().join(CLASS_MAP_FILENAME), map.to_bytes()).unwrap();
    std::fs::write(
        dir.path().join(format!("{:08X}.ibc", ring_file)),
        defines_class("Ring"),
    )
    .unwrap();
    std::fs::write(
        dir.path().join(format!("{:08X}.ibc", global_file)),
        defines("Lives", 3),
    )
    .unwrap();

    let registry = ScriptRegistry::with_directory(RuntimeConfig::default(), dir.path()).unwrap();
    assert!(registry.load_object_class("Ring"));
    assert!(registry.load_script_named("Scripts/Global.hsl"));

    let state = registry.lock();
    let ring = state.runtime.class_by_name("Ring").unwrap();
    assert_eq!(state.runtime.class_name(ring), "Ring");
    assert_eq!(state.runtime.global("Lives"), Some(Value::Integer(3)));
}

/// Without a token table a class is named by its hash in hex
#[test]
fn test_untokenized_class_name_contract() {
    let registry = ScriptRegistry::new(RuntimeConfig::default(), MemorySource::new());
    registry
        .run_bytecode(&class_container("Ring").to_bytes(), 0x42)
        .unwrap();

    let state = registry.lock();
    let ring = state.runtime.class_by_name("Ring").unwrap();
    assert_eq!(
        state.runtime.class_name(ring),
        format!("{:8X}", hash_name("Ring"))
    );
}

/// A missing directory is an empty source, not an error
#[test]
fn test_missing_directory_contract() {
    let dir = tempfile::tempdir().unwrap();
    let registry =
        ScriptRegistry::with_directory(RuntimeConfig::default(), dir.path().join("nope")).unwrap();
    assert!(!registry.load_object_class("Ring"));
}

/// Allocate `count` unreachable strings and return the accounted size
fn litter(registry: &ScriptRegistry, count: usize) -> usize {
    registry.with_runtime(|rt| {
        for i in 0..count {
            rt.heap.new_string(&format!("garbage {}", i));
        }
        rt.heap.garbage_size()
    })
}

/// Registry operations collect on exit once the threshold is crossed
#[test]
fn test_safe_point_collection_contract() {
    let config = RuntimeConfig::new()
        .with_gc_threshold(64)
        .with_gc_growth(4096);
    let registry = ScriptRegistry::new(config, MemorySource::new());
    assert!(litter(&registry, 32) > 64);

    registry.run_bytecode(&defines("Lives", 3), 1).unwrap();
    let stats = registry.gc_stats();
    assert_eq!(stats.collections, 1);
    assert!(stats.last_freed >= 32);
    {
        let state = registry.lock();
        let heap = &state.runtime.heap;
        assert_eq!(heap.next_gc(), heap.garbage_size() + 4096);
        assert_eq!(state.runtime.global("Lives"), Some(Value::Integer(3)));
    }

    // Below the grown threshold nothing runs
    assert!(registry.request_garbage_collection().is_none());
    assert_eq!(registry.gc_stats().collections, 1);

    litter(&registry, 512);
    let report = registry.request_garbage_collection().unwrap();
    assert!(report.freed >= 512);
    assert_eq!(registry.gc_stats().collections, 2);
}

/// With auto_gc off only explicit requests collect
#[test]
fn test_auto_gc_disabled_contract() {
    let config = RuntimeConfig::new()
        .with_gc_threshold(64)
        .with_auto_gc(false);
    let registry = ScriptRegistry::new(config, MemorySource::new());
    let littered = litter(&registry, 32);

    registry.run_bytecode(&defines("Lives", 3), 1).unwrap();
    assert!(!registry.load_script_named("Missing.hsl"));
    assert_eq!(registry.gc_stats().collections, 0);
    assert!(registry.garbage_size() > littered);

    let report = registry.request_garbage_collection().unwrap();
    assert!(report.freed >= 32);
    assert_eq!(registry.gc_stats().collections, 1);
}

/// Threshold collection is refused while several threads are active
#[test]
fn test_no_collection_with_thread_pool_contract() {
    let config = RuntimeConfig::new()
        .with_gc_threshold(64)
        .with_thread_count(2);
    let registry = ScriptRegistry::new(config, MemorySource::new());
    litter(&registry, 32);

    registry.run_bytecode(&defines("Lives", 3), 1).unwrap();
    assert!(registry.request_garbage_collection().is_none());
    assert_eq!(registry.gc_stats().collections, 0);
}

/// Configuration files are JSON with every key optional
#[test]
fn test_config_file_contract() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hatch.json");
    std::fs::write(&path, r#"{ "gc_growth": 4096, "debug": true }"#).unwrap();

    let config = RuntimeConfig::from_path(&path).unwrap();
    assert_eq!(config.gc_growth, 4096);
    assert!(config.debug);
    assert_eq!(config.thread_count, 1);

    let err = RuntimeConfig::from_path(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, RegistryError::Io { .. }));
}
