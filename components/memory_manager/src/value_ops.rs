//! Value operations that look inside heap objects.

use std::fmt::Write;

use core_types::{ObjHandle, Value};

use crate::heap::Heap;
use crate::object::Obj;

const MAX_PRINT_DEPTH: usize = 32;

/// Loose equality used by `==` and switch tables.
///
/// Integers and decimals compare numerically, strings by contents, bound
/// methods by method and receiver. Everything else falls back to
/// [`Value::equals`].
pub fn sorta_equal(heap: &Heap, a: &Value, b: &Value) -> bool {
    if a.is_number() && b.is_number() && (a.is_decimal() || b.is_decimal()) {
        return a.cast_as_decimal() == b.cast_as_decimal();
    }

    if let (Some(x), Some(y)) = (a.as_object(), b.as_object()) {
        match (heap.get(x), heap.get(y)) {
            (Some(Obj::String(s)), Some(Obj::String(t))) => return s.chars == t.chars,
            (Some(Obj::BoundMethod(m)), Some(Obj::BoundMethod(n))) => {
                return m.method == n.method && m.receiver.equals(&n.receiver)
            }
            _ => {}
        }
    }

    a.equals(b)
}

/// String form of a value; a string value is returned as is
pub fn cast_as_string(heap: &mut Heap, value: &Value) -> ObjHandle {
    if let Some(h) = value.as_object() {
        if heap.string(h).is_some() {
            return h;
        }
    }
    let text = format_value(heap, value);
    heap.new_string(&text)
}

/// Allocate the concatenation of two values' string forms
pub fn concatenate(heap: &mut Heap, a: &Value, b: &Value) -> ObjHandle {
    let mut text = format_value(heap, a);
    write_value(heap, &mut text, b, false);
    heap.new_string(&text)
}

/// `typeof` string of a value
pub fn type_of(heap: &Heap, value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Integer(_) | Value::LinkedInteger(_) => "integer",
        Value::Decimal(_) | Value::LinkedDecimal(_) => "decimal",
        Value::Object(h) => match heap.get(*h) {
            Some(Obj::Function(_) | Obj::BoundMethod(_)) => "event",
            Some(Obj::Class(_)) => "class",
            Some(Obj::Instance(_)) => "instance",
            Some(Obj::Native(_)) => "native",
            Some(Obj::String(_)) => "string",
            Some(Obj::Upvalue(_)) => "upvalue",
            Some(Obj::Array(_)) => "array",
            Some(Obj::Map(_)) => "map",
            Some(Obj::Module(_)) => "module",
            None => "unknown",
        },
    }
}

/// Type name for error messages: object kinds are named, other values use
/// [`Value::type_name`]
pub fn type_name(heap: &Heap, value: &Value) -> &'static str {
    match heap.kind_of(value) {
        Some(kind) => kind.type_name(),
        None => value.type_name(),
    }
}

/// Printed form of a value, strings bare
pub fn format_value(heap: &Heap, value: &Value) -> String {
    let mut out = String::new();
    write_value(heap, &mut out, value, false);
    out
}

/// Append the printed form of a value; `nested` quotes strings
pub fn write_value(heap: &Heap, out: &mut String, value: &Value, nested: bool) {
    write_depth(heap, out, value, nested, 0);
}

fn name_or_hash(heap: &Heap, name: Option<ObjHandle>, hash: u32) -> String {
    match name.and_then(|n| heap.string(n)) {
        Some(name) => name.to_string(),
        None => format!("$[{:08X}]", hash),
    }
}

fn function_name(heap: &Heap, function: ObjHandle) -> String {
    match heap.function(function) {
        Some(f) => match f.name.and_then(|n| heap.string(n)) {
            Some(name) => name.to_string(),
            None => "<anonymous-fn>".to_string(),
        },
        None => "<anonymous-fn>".to_string(),
    }
}

fn write_depth(heap: &Heap, out: &mut String, value: &Value, nested: bool, depth: usize) {
    let Value::Object(handle) = value else {
        let _ = write!(out, "{}", value);
        return;
    };
    let Some(obj) = heap.get(*handle) else {
        out.push_str("<freed object>");
        return;
    };

    match obj {
        Obj::String(s) if nested => {
            let _ = write!(out, "\"{}\"", s.chars);
        }
        Obj::String(s) => out.push_str(&s.chars),
        Obj::Function(_) => {
            let _ = write!(out, "<fn {}>", function_name(heap, *handle));
        }
        Obj::BoundMethod(b) => {
            let _ = write!(out, "<bound method {}>", function_name(heap, b.method));
        }
        Obj::Class(c) => {
            let _ = write!(out, "<class {}>", name_or_hash(heap, c.name, c.hash));
        }
        Obj::Instance(i) => {
            let name = match heap.class(i.class) {
                Some(c) => name_or_hash(heap, c.name, c.hash),
                None => "?".to_string(),
            };
            let _ = write!(out, "<class {}> instance", name);
        }
        Obj::Module(m) => {
            let file = m.source_filename.and_then(|f| heap.string(f)).unwrap_or("?");
            let _ = write!(out, "<module {}>", file);
        }
        Obj::Native(_) => out.push_str("<native fn>"),
        Obj::Upvalue(_) => out.push_str("<upvalue>"),
        Obj::Array(_) | Obj::Map(_) if depth >= MAX_PRINT_DEPTH => out.push_str("..."),
        Obj::Array(a) => {
            out.push('[');
            for (i, element) in a.values.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_depth(heap, out, element, true, depth + 1);
            }
            out.push(']');
        }
        Obj::Map(m) => {
            let mut keys: Vec<(&u32, &String)> = m.keys.iter().collect();
            keys.sort_by(|a, b| a.1.cmp(b.1));
            out.push('{');
            for (i, (hash, key)) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "\"{}\": ", key);
                match m.values.get(hash) {
                    Some(v) => write_depth(heap, out, v, true, depth + 1),
                    None => out.push_str("null"),
                }
            }
            out.push('}');
        }
    }
}
