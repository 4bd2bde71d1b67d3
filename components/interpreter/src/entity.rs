//! Entities: instances bound to live native objects.
//!
//! A native type exposes some of its own numeric members to scripts by
//! implementing [`NativeEntity`]. When an entity is spawned those members are
//! linked into the instance's fields exactly once; script reads and writes
//! then go straight to the native storage.

use std::sync::Arc;

use core_types::{DecimalLink, IntegerLink, ObjHandle, Value, VmError, VmResult};
use memory_manager::{ClassKind, HostObject, NativeFn, Obj, ObjInstance};

use crate::class::get_class_method;
use crate::runtime::Runtime;
use crate::thread::VmThread;

/// A native object that can back an entity
pub trait NativeEntity: HostObject {
    /// Link this object's fields into a freshly created instance
    fn link_fields(&self, linker: &mut FieldLinker<'_>);
}

/// Inserts linked fields into one instance
pub struct FieldLinker<'a> {
    runtime: &'a mut Runtime,
    instance: ObjHandle,
}

impl<'a> FieldLinker<'a> {
    fn new(runtime: &'a mut Runtime, instance: ObjHandle) -> Self {
        Self { runtime, instance }
    }

    fn link(&mut self, name: &str, value: Value) {
        let hash = self.runtime.add_token(name);
        if let Some(instance) = self.runtime.heap.instance_mut(self.instance) {
            instance.fields.insert(hash, value);
        }
    }

    /// Alias a native integer member as field `name`
    pub fn link_integer(&mut self, name: &str, field: IntegerLink) {
        self.link(name, Value::LinkedInteger(field));
    }

    /// Alias a native decimal member as field `name`
    pub fn link_decimal(&mut self, name: &str, field: DecimalLink) {
        self.link(name, Value::LinkedDecimal(field));
    }
}

fn new_entity<E: NativeEntity>(runtime: &mut Runtime, class: ObjHandle, native: Arc<E>) -> ObjHandle {
    let host: Arc<dyn HostObject> = native.clone();
    let mut instance = ObjInstance::new(class);
    instance.entity = Some(host);
    let handle = runtime.heap.alloc(Obj::Instance(instance));

    if let Some(c) = runtime.heap.class_mut(class) {
        if c.kind != ClassKind::Extended {
            c.entity_bound = true;
        }
    }

    native.link_fields(&mut FieldLinker::new(runtime, handle));
    handle
}

/// Create an entity of `class` bound to `native` and run its initializer
pub fn spawn_entity<E: NativeEntity>(
    runtime: &mut Runtime,
    thread: &mut VmThread,
    class: ObjHandle,
    native: Arc<E>,
) -> VmResult<ObjHandle> {
    if runtime.heap.class(class).is_none() {
        return Err(VmError::runtime("Cannot instantiate non-class."));
    }
    let entity = new_entity(runtime, class, native);
    log::debug!("Spawned entity of class {}", runtime.class_name(class));
    thread.call_initializer(runtime, entity)?;
    Ok(entity)
}

/// Copy an entity onto a new native object.
///
/// Script fields are copied. Linked fields are never copied: the clone's
/// own native object links its members afresh.
pub fn clone_entity<E: NativeEntity>(
    runtime: &mut Runtime,
    source: ObjHandle,
    native: Arc<E>,
) -> VmResult<ObjHandle> {
    let (class, fields) = match runtime.heap.instance(source) {
        Some(instance) => (
            instance.class,
            instance
                .fields
                .iter()
                .filter(|(_, v)| !v.is_linked())
                .map(|(&k, v)| (k, v.clone()))
                .collect::<Vec<_>>(),
        ),
        None => return Err(VmError::runtime("Cannot clone non-instance.")),
    };

    let clone = new_entity(runtime, class, native);
    if let Some(instance) = runtime.heap.instance_mut(clone) {
        for (hash, value) in fields {
            instance.fields.entry(hash).or_insert(value);
        }
    }
    Ok(clone)
}

/// Detach an entity from its native object.
///
/// Linked fields keep the last value they aliased as plain numbers. The
/// instance itself stays alive until nothing references it.
pub fn unlink_entity(runtime: &mut Runtime, entity: ObjHandle) {
    if let Some(instance) = runtime.heap.instance_mut(entity) {
        for value in instance.fields.values_mut() {
            if value.is_linked() {
                *value = value.delink();
            }
        }
        instance.entity = None;
    }
}

/// The callable `hash` resolves to on an instance: a field, else a method
pub fn get_callable(runtime: &mut Runtime, instance: ObjHandle, hash: u32) -> Option<Value> {
    let i = runtime.heap.instance(instance)?;
    if let Some(field) = i.fields.get(&hash) {
        return Some(field.delink());
    }
    let class = i.class;
    get_class_method(runtime, class, hash).map(|v| v.delink())
}

/// Run event `hash` on an instance.
///
/// Returns `Ok(false)` when the instance has no such event.
pub fn run_event(
    runtime: &mut Runtime,
    thread: &mut VmThread,
    instance: ObjHandle,
    hash: u32,
    args: &[Value],
) -> VmResult<bool> {
    let Some(callable) = get_callable(runtime, instance, hash) else {
        return Ok(false);
    };
    thread.invoke_for_object(runtime, callable, Value::Object(instance), args)?;
    Ok(true)
}

/// Run event `hash`, calling `default` directly when the event is not
/// overridden by script.
///
/// The native receives the instance followed by `args`.
pub fn invoke_with_default(
    runtime: &mut Runtime,
    thread: &mut VmThread,
    instance: ObjHandle,
    hash: u32,
    default: NativeFn,
    args: &[Value],
) -> VmResult<Value> {
    let callable = get_callable(runtime, instance, hash);
    let is_default = callable
        .as_ref()
        .and_then(Value::as_object)
        .and_then(|h| runtime.heap.native(h))
        .is_some_and(|n| n.is(default));

    match callable {
        Some(callable) if !is_default => {
            thread.invoke_for_object(runtime, callable, Value::Object(instance), args)
        }
        _ => {
            let mut native_args = Vec::with_capacity(args.len() + 1);
            native_args.push(Value::Object(instance));
            native_args.extend_from_slice(args);
            default(&mut runtime.heap, &native_args)
        }
    }
}

/// Create the native base class entity-bound classes fall through to
pub fn install_entity_base(runtime: &mut Runtime, name: &str) -> ObjHandle {
    let base = runtime.new_native_class(name);
    runtime.entity_base = Some(base);
    base
}
