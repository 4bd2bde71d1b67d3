//! Argument helpers for native functions.
//!
//! Natives receive their arguments as a plain slice (with the receiver first
//! when invoked as a method). These helpers check counts and kinds and
//! produce the same messages scripted calls do.

use core_types::{ObjHandle, Value, VmError, VmResult};
use memory_manager::{type_name, Heap};

/// Require exactly `count` arguments
pub fn check_arg_count(args: &[Value], count: usize) -> VmResult<()> {
    if args.len() != count {
        return Err(VmError::runtime(format!(
            "Expected {} arguments to function call, got {}.",
            count,
            args.len()
        )));
    }
    Ok(())
}

/// Require at least `min` and at most `max` arguments
pub fn check_arg_range(args: &[Value], min: usize, max: usize) -> VmResult<()> {
    if args.len() < min || args.len() > max {
        return Err(VmError::runtime(format!(
            "Expected between {} and {} arguments to function call, got {}.",
            min,
            max,
            args.len()
        )));
    }
    Ok(())
}

fn argument(args: &[Value], index: usize) -> VmResult<&Value> {
    args.get(index).ok_or_else(|| {
        VmError::runtime(format!(
            "Argument {} is missing ({} given).",
            index + 1,
            args.len()
        ))
    })
}

fn wrong_type(heap: &Heap, index: usize, expected: &str, actual: &Value) -> VmError {
    VmError::runtime(format!(
        "Expected argument {} to be of type {} instead of {}.",
        index + 1,
        expected,
        type_name(heap, actual)
    ))
}

/// Integer argument; decimals are not accepted
pub fn arg_integer(heap: &Heap, args: &[Value], index: usize) -> VmResult<i32> {
    let value = argument(args, index)?;
    value
        .as_integer()
        .ok_or_else(|| wrong_type(heap, index, "Integer", value))
}

/// Numeric argument widened to a decimal
pub fn arg_decimal(heap: &Heap, args: &[Value], index: usize) -> VmResult<f32> {
    let value = argument(args, index)?;
    value
        .cast_as_decimal()
        .ok_or_else(|| wrong_type(heap, index, "Decimal", value))
}

/// String argument
pub fn arg_string<'h>(heap: &'h Heap, args: &[Value], index: usize) -> VmResult<&'h str> {
    let value = argument(args, index)?;
    heap.str_of(value)
        .ok_or_else(|| wrong_type(heap, index, "String", value))
}

/// Instance argument
pub fn arg_instance(heap: &Heap, args: &[Value], index: usize) -> VmResult<ObjHandle> {
    let value = argument(args, index)?;
    value
        .as_object()
        .filter(|&h| heap.instance(h).is_some())
        .ok_or_else(|| wrong_type(heap, index, "Instance", value))
}
