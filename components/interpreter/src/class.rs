//! Class and method resolution.
//!
//! Lookups walk the inheritance chain nearest class first. At every level a
//! class field shadows a method of the same hash. A declared parent is
//! resolved from globals the first time a lookup needs it and cached from
//! then on.

use core_types::{ObjHandle, Value};

use crate::runtime::Runtime;

const MAX_CHAIN: usize = 256;

/// Resolve and cache a class's declared parent.
///
/// Returns the parent, resolved now or earlier. A declared parent that is
/// not (yet) a global class stays pending.
pub fn resolve_parent(runtime: &mut Runtime, class: ObjHandle) -> Option<ObjHandle> {
    let c = runtime.heap.class(class)?;
    if let Some(parent) = c.parent {
        return Some(parent);
    }
    let parent = runtime.class_by_hash(c.parent_hash?)?;
    if let Some(c) = runtime.heap.class_mut(class) {
        c.parent = Some(parent);
    }
    Some(parent)
}

/// Find `hash` on a class or its ancestors.
///
/// At each level a field shadows a method. When the declared chain is
/// exhausted and any class on it is entity-bound, the entity base class is
/// searched last.
pub fn get_class_method(runtime: &mut Runtime, class: ObjHandle, hash: u32) -> Option<Value> {
    let mut current = Some(class);
    let mut entity_bound = false;
    let mut depth = 0;

    while let Some(klass) = current {
        if depth == MAX_CHAIN {
            log::warn!("Inheritance chain of {} is too deep", runtime.class_name(class));
            return None;
        }
        depth += 1;

        let c = runtime.heap.class(klass)?;
        if let Some(field) = c.fields.get(&hash) {
            return Some(field.clone());
        }
        if let Some(method) = c.methods.get(&hash) {
            return Some(method.clone());
        }
        entity_bound |= c.entity_bound;
        current = resolve_parent(runtime, klass);
    }

    if entity_bound {
        let base = runtime.heap.class(runtime.entity_base?)?;
        if let Some(v) = base.fields.get(&hash).or_else(|| base.methods.get(&hash)) {
            return Some(v.clone());
        }
    }
    None
}

/// Whether `hash` resolves on a class
pub fn class_has_method(runtime: &mut Runtime, class: ObjHandle, hash: u32) -> bool {
    get_class_method(runtime, class, hash).is_some()
}

/// Bind a function as a method.
///
/// A method named after its class becomes the initializer. The function
/// records the class name for stack traces.
pub fn define_method(runtime: &mut Runtime, class: ObjHandle, function: ObjHandle, hash: u32) {
    let Some(c) = runtime.heap.class_mut(class) else {
        return;
    };
    c.methods.insert(hash, Value::Object(function));
    if hash == c.hash {
        c.initializer = Some(Value::Object(function));
    }
    let name = c.name;
    if let Some(f) = runtime.heap.function_mut(function) {
        f.class_name = name;
    }
}

/// Move every method of `extension` into `original`
pub fn extend_class(runtime: &mut Runtime, extension: ObjHandle, original: ObjHandle) {
    if extension == original {
        return;
    }
    let methods = match runtime.heap.class_mut(extension) {
        Some(c) => std::mem::take(&mut c.methods),
        None => return,
    };
    if let Some(dst) = runtime.heap.class_mut(original) {
        dst.methods.extend(methods);
    }
}

/// Class of an instance, or the class itself
pub fn class_of(runtime: &Runtime, value: &Value) -> Option<ObjHandle> {
    let handle = value.as_object()?;
    if runtime.heap.class(handle).is_some() {
        return Some(handle);
    }
    runtime.heap.instance(handle).map(|i| i.class)
}
