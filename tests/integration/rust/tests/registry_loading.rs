//! Registry loading behaviour
//!
//! Loading a script is idempotent: the entry function runs on the first
//! load only, and later loads of the same file hash succeed without effect.

use core_types::{filename_hash, Value};
use integration_tests::counter_script;
use script_registry::{MemorySource, RuntimeConfig, ScriptRegistry};

fn registry(files: &[u32]) -> ScriptRegistry {
    let mut source = MemorySource::new();
    for &file in files {
        source.insert(file, counter_script());
    }
    let registry = ScriptRegistry::new(RuntimeConfig::default(), source);
    registry.with_runtime(|rt| rt.set_global("Runs", Value::Integer(0)));
    registry
}

fn runs(registry: &ScriptRegistry) -> Option<Value> {
    registry.lock().runtime.global("Runs")
}

#[test]
fn test_load_script_executes_exactly_once() {
    let registry = registry(&[0x100]);
    for _ in 0..5 {
        assert!(registry.load_script(0x100));
    }
    assert_eq!(runs(&registry), Some(Value::Integer(1)));
    assert_eq!(registry.lock().runtime.modules.len(), 1);
}

#[test]
fn test_distinct_files_each_run_once() {
    let registry = registry(&[0x100, 0x200, 0x300]);
    for file in [0x100, 0x200, 0x100, 0x300, 0x200] {
        assert!(registry.load_script(file));
    }
    assert_eq!(runs(&registry), Some(Value::Integer(3)));
}

#[test]
fn test_named_and_hashed_loads_share_the_cache() {
    let hash = filename_hash("Scripts/Title");
    let registry = registry(&[hash]);
    assert!(registry.load_script_named("Scripts/Title.hsl"));
    assert!(registry.load_script(hash));
    assert!(registry.load_script_named("Scripts/Title.ibc"));
    assert_eq!(runs(&registry), Some(Value::Integer(1)));
}

#[test]
fn test_dispose_allows_a_fresh_load() {
    let registry = registry(&[0x100]);
    assert!(registry.load_script(0x100));
    registry.dispose();
    assert_eq!(runs(&registry), None);

    registry.with_runtime(|rt| rt.set_global("Runs", Value::Integer(10)));
    assert!(registry.load_script(0x100));
    assert_eq!(runs(&registry), Some(Value::Integer(11)));
}
