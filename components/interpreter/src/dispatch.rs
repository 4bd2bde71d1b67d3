//! Dispatch loop for bytecode execution
//!
//! Handles individual opcode execution. Every instruction either completes
//! or fails with a [`VmError`] that unwinds to the nearest protected entry
//! point on the thread; nothing is left half-applied on the operand stack
//! that the entry point does not restore.

use bytecode_system::OpCode;
use core_types::{ObjHandle, Value, VmError, VmResult};
use memory_manager::{
    concatenate, format_value, sorta_equal, type_name, type_of, ClassKind, Heap, NativeFn, Obj,
    ObjArray, ObjBoundMethod, ObjClass, ObjInstance, ObjKind, ObjMap,
};

use crate::call_frame::CallFrame;
use crate::class::{class_has_method, class_of, define_method, extend_class, get_class_method, resolve_parent};
use crate::debug::{DebugAction, DebugSession};
use crate::runtime::Runtime;
use crate::thread::{ThreadState, VmThread, FRAMES_MAX};

/// Operands of a binary numeric instruction after promotion
#[derive(Debug, Clone, Copy)]
enum Operands {
    Integer(i32, i32),
    Decimal(f32, f32),
}

fn operation_name(op: OpCode) -> &'static str {
    match op {
        OpCode::Add => "plus",
        OpCode::Subtract => "minus",
        OpCode::Multiply => "multiply",
        OpCode::Divide => "division",
        OpCode::Modulo => "modulo",
        OpCode::Negate => "negate",
        OpCode::Increment => "increment",
        OpCode::Decrement => "decrement",
        OpCode::BitshiftLeft => "bitwise left",
        OpCode::BitshiftRight => "bitwise right",
        OpCode::BwNot => "bitwise not",
        OpCode::BwAnd => "bitwise and",
        OpCode::BwOr => "bitwise or",
        OpCode::BwXor => "xor",
        OpCode::LgAnd => "logical and",
        OpCode::LgOr => "logical or",
        OpCode::Less => "less than",
        OpCode::Greater => "greater than",
        OpCode::LessEqual => "less than or equal",
        OpCode::GreaterEqual => "greater than or equal",
        _ => "unknown",
    }
}

fn check_number(heap: &Heap, op: OpCode, value: &Value) -> VmResult<()> {
    if value.is_number() {
        return Ok(());
    }
    Err(VmError::runtime(format!(
        "Cannot perform {} operation on non-number value of type {}.",
        operation_name(op),
        type_name(heap, value)
    )))
}

/// If either side is a decimal, both become one
fn operands(heap: &Heap, op: OpCode, a: &Value, b: &Value) -> VmResult<Operands> {
    check_number(heap, op, a)?;
    check_number(heap, op, b)?;
    if a.is_decimal() || b.is_decimal() {
        Ok(Operands::Decimal(
            a.cast_as_decimal().unwrap_or_default(),
            b.cast_as_decimal().unwrap_or_default(),
        ))
    } else {
        Ok(Operands::Integer(
            a.as_integer().unwrap_or_default(),
            b.as_integer().unwrap_or_default(),
        ))
    }
}

fn truth(condition: bool) -> Value {
    Value::Integer(condition as i32)
}

/// Evaluate a binary numeric instruction
pub fn binary_operation(heap: &Heap, op: OpCode, a: &Value, b: &Value) -> VmResult<Value> {
    let value = match (op, operands(heap, op, a, b)?) {
        (OpCode::Add, Operands::Integer(x, y)) => Value::Integer(x.wrapping_add(y)),
        (OpCode::Add, Operands::Decimal(x, y)) => Value::Decimal(x + y),
        (OpCode::Subtract, Operands::Integer(x, y)) => Value::Integer(x.wrapping_sub(y)),
        (OpCode::Subtract, Operands::Decimal(x, y)) => Value::Decimal(x - y),
        (OpCode::Multiply, Operands::Integer(x, y)) => Value::Integer(x.wrapping_mul(y)),
        (OpCode::Multiply, Operands::Decimal(x, y)) => Value::Decimal(x * y),
        (OpCode::Divide, Operands::Integer(_, 0)) | (OpCode::Modulo, Operands::Integer(_, 0)) => {
            return Err(VmError::runtime("Cannot divide integer by zero."))
        }
        (OpCode::Divide, Operands::Decimal(_, y)) if y == 0.0 => {
            return Err(VmError::runtime("Cannot divide decimal by zero."))
        }
        (OpCode::Divide, Operands::Integer(x, y)) => Value::Integer(x.wrapping_div(y)),
        (OpCode::Divide, Operands::Decimal(x, y)) => Value::Decimal(x / y),
        (OpCode::Modulo, Operands::Integer(x, y)) => Value::Integer(x.wrapping_rem(y)),
        (OpCode::Modulo, Operands::Decimal(x, y)) => Value::Decimal(x % y),
        (OpCode::BitshiftLeft, Operands::Integer(x, y)) => Value::Integer(x.wrapping_shl(y as u32)),
        (OpCode::BitshiftLeft, Operands::Decimal(x, y)) => {
            Value::Decimal((x as i32).wrapping_shl(y as i32 as u32) as f32)
        }
        (OpCode::BitshiftRight, Operands::Integer(x, y)) => Value::Integer(x.wrapping_shr(y as u32)),
        (OpCode::BitshiftRight, Operands::Decimal(x, y)) => {
            Value::Decimal((x as i32).wrapping_shr(y as i32 as u32) as f32)
        }
        (OpCode::BwAnd, Operands::Integer(x, y)) => Value::Integer(x & y),
        (OpCode::BwAnd, Operands::Decimal(x, y)) => Value::Decimal(((x as i32) & (y as i32)) as f32),
        (OpCode::BwOr, Operands::Integer(x, y)) => Value::Integer(x | y),
        (OpCode::BwOr, Operands::Decimal(x, y)) => Value::Decimal(((x as i32) | (y as i32)) as f32),
        (OpCode::BwXor, Operands::Integer(x, y)) => Value::Integer(x ^ y),
        (OpCode::BwXor, Operands::Decimal(x, y)) => Value::Decimal(((x as i32) ^ (y as i32)) as f32),
        (OpCode::LgAnd, Operands::Integer(x, y)) => truth(x != 0 && y != 0),
        (OpCode::LgOr, Operands::Integer(x, y)) => truth(x != 0 || y != 0),
        (OpCode::LgAnd | OpCode::LgOr, Operands::Decimal(..)) => Value::Integer(0),
        (OpCode::Less, Operands::Integer(x, y)) => truth(x < y),
        (OpCode::Less, Operands::Decimal(x, y)) => truth(x < y),
        (OpCode::Greater, Operands::Integer(x, y)) => truth(x > y),
        (OpCode::Greater, Operands::Decimal(x, y)) => truth(x > y),
        (OpCode::LessEqual, Operands::Integer(x, y)) => truth(x <= y),
        (OpCode::LessEqual, Operands::Decimal(x, y)) => truth(x <= y),
        (OpCode::GreaterEqual, Operands::Integer(x, y)) => truth(x >= y),
        (OpCode::GreaterEqual, Operands::Decimal(x, y)) => truth(x >= y),
        (op, _) => {
            return Err(VmError::fatal(format!("{} is not a binary operation.", op.name())))
        }
    };
    Ok(value)
}

/// Evaluate a unary numeric instruction; the operand's kind is preserved
pub fn unary_operation(heap: &Heap, op: OpCode, a: &Value) -> VmResult<Value> {
    if op == OpCode::LgNot {
        return Ok(match a {
            Value::Null => Value::Integer(1),
            Value::Object(_) => Value::Integer(0),
            Value::Decimal(_) | Value::LinkedDecimal(_) => {
                Value::Decimal((a.as_decimal() == Some(0.0)) as i32 as f32)
            }
            Value::Integer(_) | Value::LinkedInteger(_) => truth(a.as_integer() == Some(0)),
        });
    }

    check_number(heap, op, a)?;
    let value = match (op, a.as_integer(), a.as_decimal()) {
        (OpCode::Negate, Some(n), _) => Value::Integer(n.wrapping_neg()),
        (OpCode::Negate, _, Some(d)) => Value::Decimal(-d),
        (OpCode::Increment, Some(n), _) => Value::Integer(n.wrapping_add(1)),
        (OpCode::Increment, _, Some(d)) => Value::Decimal(d + 1.0),
        (OpCode::Decrement, Some(n), _) => Value::Integer(n.wrapping_sub(1)),
        (OpCode::Decrement, _, Some(d)) => Value::Decimal(d - 1.0),
        (OpCode::BwNot, Some(n), _) => Value::Integer(!n),
        (OpCode::BwNot, _, Some(d)) => Value::Decimal(!(d as i32) as f32),
        (op, _, _) => {
            return Err(VmError::fatal(format!("{} is not a unary operation.", op.name())))
        }
    };
    Ok(value)
}

fn cast_error(expected: &str, actual: &str) -> VmError {
    VmError::runtime(format!(
        "Expected value to be of type {} instead of {}.",
        expected, actual
    ))
}

/// Write `value` through a linked slot.
///
/// Returns `false` when `slot` is not linked and the caller stores the value
/// itself.
fn write_through(slot: &Value, value: &Value, value_type: &str) -> VmResult<bool> {
    match slot {
        Value::LinkedInteger(link) => {
            let n = value
                .cast_as_integer()
                .ok_or_else(|| cast_error("Integer", value_type))?;
            link.set(n);
            Ok(true)
        }
        Value::LinkedDecimal(link) => {
            let d = value
                .cast_as_decimal()
                .ok_or_else(|| cast_error("Decimal", value_type))?;
            link.set(d);
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn as_class(runtime: &Runtime, value: &Value) -> Option<ObjHandle> {
    value.as_object().filter(|&h| runtime.heap.class(h).is_some())
}

impl VmThread {
    fn frame(&self) -> VmResult<&CallFrame> {
        self.frames
            .last()
            .ok_or_else(|| VmError::fatal("No active call frame."))
    }

    fn frame_mut(&mut self) -> VmResult<&mut CallFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| VmError::fatal("No active call frame."))
    }

    fn read_u8(&mut self) -> VmResult<u8> {
        self.frame_mut()?.read_u8()
    }

    fn read_u16(&mut self) -> VmResult<u16> {
        self.frame_mut()?.read_u16()
    }

    fn read_i16(&mut self) -> VmResult<i16> {
        self.frame_mut()?.read_i16()
    }

    fn read_u32(&mut self) -> VmResult<u32> {
        self.frame_mut()?.read_u32()
    }

    fn constant_at(&self, runtime: &Runtime, index: usize) -> VmResult<Value> {
        let function = self.frame()?.function;
        runtime
            .heap
            .function(function)
            .and_then(|f| f.constants.get(index))
            .cloned()
            .ok_or_else(|| VmError::fatal(format!("Constant index {} is out of range.", index)))
    }

    fn read_constant(&mut self, runtime: &Runtime) -> VmResult<Value> {
        let index = self.read_u32()? as usize;
        self.constant_at(runtime, index)
    }

    fn local_index(&self, slot: u8) -> VmResult<usize> {
        let index = self.frame()?.slots + slot as usize;
        if index >= self.stack.len() {
            return Err(VmError::fatal(format!("Local slot {} is out of range.", slot)));
        }
        Ok(index)
    }

    fn module_locals(&self, runtime: &Runtime) -> VmResult<ObjHandle> {
        self.frame()?
            .module
            .filter(|&m| runtime.heap.module(m).is_some())
            .ok_or_else(|| VmError::fatal("Function has no module for module locals."))
    }

    /// Run until the frame that was current on entry returns
    pub(crate) fn execute(&mut self, runtime: &mut Runtime) -> VmResult<()> {
        while self.frames.len() > self.return_frame {
            self.check_breakpoint(runtime)?;
            self.step(runtime)?;
        }
        Ok(())
    }

    fn check_breakpoint(&mut self, runtime: &mut Runtime) -> VmResult<()> {
        let Some(frame) = self.frames.last() else {
            return Ok(());
        };
        let (function, offset) = (frame.function, frame.ip);
        if !self.debug.should_break(function, offset) {
            return Ok(());
        }
        let Some(mut debugger) = self.debug.debugger.take() else {
            return Ok(());
        };

        self.debug.stepping = false;
        self.state = ThreadState::Suspended;
        log::debug!(
            "Thread {} suspended in {} at offset {}",
            self.id(),
            runtime.function_name(function),
            offset
        );
        let action = {
            let mut session = DebugSession::new(runtime, self, function, offset);
            debugger.on_break(&mut session)
        };
        self.debug.debugger = Some(debugger);
        self.state = ThreadState::Running;

        match action {
            DebugAction::Continue => Ok(()),
            DebugAction::Step => {
                self.debug.stepping = true;
                Ok(())
            }
            DebugAction::Abort => Err(VmError::fatal("Execution aborted by the debugger.")),
        }
    }

    /// Fetch, decode and execute one instruction
    fn step(&mut self, runtime: &mut Runtime) -> VmResult<()> {
        let frame = self.frame_mut()?;
        frame.ip_last = frame.ip;
        let byte = frame.read_u8()?;
        let op = OpCode::from_byte(byte)
            .ok_or_else(|| VmError::fatal(format!("Unknown opcode {:#04X}.", byte)))?;
        log::trace!("[{}] {:04} {}", self.id(), self.frame()?.ip_last, op.name());

        match op {
            // Globals
            OpCode::GetGlobal => {
                let hash = self.read_u32()?;
                let value = runtime
                    .globals
                    .get(&hash)
                    .or_else(|| runtime.constants.get(&hash))
                    .map(Value::delink);
                match value {
                    Some(value) => self.push(value),
                    None => Err(VmError::runtime(format!(
                        "Variable {} does not exist.",
                        runtime.variable_name(hash)
                    ))),
                }
            }
            OpCode::SetGlobal => {
                let hash = self.read_u32()?;
                let value = self.peek(0)?;
                let Some(slot) = runtime.globals.get(&hash) else {
                    let message = if runtime.constants.contains_key(&hash) {
                        format!("Cannot redefine constant {}!", runtime.variable_name(hash))
                    } else {
                        format!("Global variable {} does not exist.", runtime.variable_name(hash))
                    };
                    return Err(VmError::runtime(message));
                };
                if !write_through(slot, &value, type_name(&runtime.heap, &value))? {
                    runtime.globals.insert(hash, value.delink());
                }
                Ok(())
            }
            OpCode::DefineGlobal => {
                let hash = self.read_u32()?;
                let value = self.peek(0)?;
                self.define_global(runtime, hash, value)?;
                self.pop().map(|_| ())
            }
            OpCode::DefineConstant => {
                let hash = self.read_u32()?;
                let value = self.pop()?;
                runtime.constants.insert(hash, value.delink());
                Ok(())
            }

            // Locals
            OpCode::GetLocal => {
                let slot = self.read_u8()?;
                let index = self.local_index(slot)?;
                let value = self.stack[index].clone();
                self.push(value)
            }
            OpCode::SetLocal => {
                let slot = self.read_u8()?;
                let index = self.local_index(slot)?;
                self.stack[index] = self.peek(0)?;
                Ok(())
            }
            OpCode::DefineModuleLocal => {
                let value = self.pop()?;
                let module = self.module_locals(runtime)?;
                if let Some(m) = runtime.heap.module_mut(module) {
                    m.locals.push(value.delink());
                }
                Ok(())
            }
            OpCode::GetModuleLocal => {
                let slot = self.read_u16()? as usize;
                let module = self.module_locals(runtime)?;
                let value = runtime
                    .heap
                    .module(module)
                    .and_then(|m| m.locals.get(slot))
                    .cloned()
                    .ok_or_else(|| VmError::fatal(format!("Module local {} is out of range.", slot)))?;
                self.push(value)
            }
            OpCode::SetModuleLocal => {
                let slot = self.read_u16()? as usize;
                let value = self.peek(0)?.delink();
                let module = self.module_locals(runtime)?;
                let local = runtime
                    .heap
                    .module_mut(module)
                    .and_then(|m| m.locals.get_mut(slot))
                    .ok_or_else(|| VmError::fatal(format!("Module local {} is out of range.", slot)))?;
                *local = value;
                Ok(())
            }

            // Properties and elements
            OpCode::GetProperty => {
                let hash = self.read_u32()?;
                let object = self.peek(0)?;
                let value = self.get_property(runtime, &object, hash)?;
                self.set_peek(0, value)
            }
            OpCode::SetProperty => {
                let hash = self.read_u32()?;
                let value = self.peek(0)?;
                let object = self.peek(1)?;
                self.set_property(runtime, &object, hash, &value)?;
                self.pop()?;
                self.set_peek(0, value)
            }
            OpCode::HasProperty => {
                let hash = self.read_u32()?;
                let object = self.pop()?;
                let lookup = match object.as_object().and_then(|h| runtime.heap.get(h).map(|o| (h, o))) {
                    Some((_, Obj::Instance(instance))) if instance.fields.contains_key(&hash) => Ok(true),
                    Some((_, Obj::Instance(instance))) => Err(Some(instance.class)),
                    Some((h, Obj::Class(_))) => Err(Some(h)),
                    _ => Err(None),
                };
                let found = match lookup {
                    Ok(found) => found,
                    Err(Some(class)) => class_has_method(runtime, class, hash),
                    Err(None) => false,
                };
                self.push(truth(found))
            }
            OpCode::GetElement => {
                let at = self.pop()?;
                let object = self.pop()?;
                let value = self.get_element(runtime, &object, &at)?;
                self.push(value)
            }
            OpCode::SetElement => {
                let value = self.peek(0)?;
                let at = self.peek(1)?;
                let object = self.peek(2)?;
                self.set_element(runtime, &object, &at, value.delink())?;
                self.pop()?;
                self.pop()?;
                self.set_peek(0, value)
            }

            // Allocations
            OpCode::NewArray => {
                let count = self.read_u32()? as usize;
                let start = self
                    .stack
                    .len()
                    .checked_sub(count)
                    .ok_or_else(|| VmError::fatal("Stack underflow!"))?;
                let values = self.stack.drain(start..).map(|v| v.delink()).collect();
                let array = runtime.heap.alloc(Obj::Array(ObjArray { values }));
                self.push(Value::Object(array))
            }
            OpCode::NewMap => {
                let count = self.read_u32()? as usize;
                let start = self
                    .stack
                    .len()
                    .checked_sub(count * 2)
                    .ok_or_else(|| VmError::fatal("Stack underflow!"))?;
                let mut map = ObjMap::default();
                for pair in self.stack[start..].chunks_exact(2) {
                    let key = runtime.heap.str_of(&pair[0]).ok_or_else(|| {
                        VmError::runtime(format!(
                            "Cannot use a {} as a map key.",
                            type_name(&runtime.heap, &pair[0])
                        ))
                    })?;
                    map.put(key, pair[1].delink());
                }
                self.stack.truncate(start);
                let map = runtime.heap.alloc(Obj::Map(map));
                self.push(Value::Object(map))
            }

            // Stack constants
            OpCode::Null => self.push(Value::Null),
            OpCode::True => self.push(Value::Integer(1)),
            OpCode::False => self.push(Value::Integer(0)),
            OpCode::Constant => {
                let value = self.read_constant(runtime)?;
                self.push(value)
            }
            OpCode::Integer => {
                let n = self.frame_mut()?.read_i32()?;
                self.push(Value::Integer(n))
            }
            OpCode::Decimal => {
                let d = self.frame_mut()?.read_f32()?;
                self.push(Value::Decimal(d))
            }

            // Stack manipulation
            OpCode::Pop => self.pop().map(|_| ()),
            OpCode::PopN => {
                let count = self.read_u8()?;
                for _ in 0..count {
                    self.pop()?;
                }
                Ok(())
            }
            OpCode::Copy => {
                let count = self.read_u8()? as usize;
                if count == 0 {
                    return Ok(());
                }
                for _ in 0..count {
                    let value = self.peek(count - 1)?;
                    self.push(value)?;
                }
                Ok(())
            }
            OpCode::SaveValue => {
                self.register = self.pop()?;
                Ok(())
            }
            OpCode::LoadValue => {
                let value = self.register.clone();
                self.push(value)
            }
            OpCode::Print => {
                let value = self.peek(0)?;
                log::info!("{}", format_value(&runtime.heap, &value));
                self.pop().map(|_| ())
            }
            OpCode::PrintStack => {
                log::info!("{}", self.format_stack(runtime));
                Ok(())
            }

            // Control flow
            OpCode::Jump => {
                let offset = self.read_i16()?;
                self.frame_mut()?.jump(offset as isize)
            }
            OpCode::JumpBack => {
                let offset = self.read_i16()?;
                self.frame_mut()?.jump(-(offset as isize))
            }
            OpCode::JumpIfFalse => {
                let offset = self.read_i16()?;
                if self.peek(0)?.is_falsey() {
                    self.frame_mut()?.jump(offset as isize)?;
                }
                Ok(())
            }
            OpCode::SwitchTable => self.switch_table(runtime),
            OpCode::Failsafe => {
                let offset = self.read_u16()? as usize;
                self.frame_mut()?.failsafe = Some(offset);
                Ok(())
            }
            OpCode::Return => {
                let result = self.pop()?;
                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| VmError::fatal("No active call frame."))?;
                self.stack.truncate(frame.slots);
                self.push(result)
            }

            // Arithmetic
            OpCode::Add => {
                let b = self.peek(0)?;
                let a = self.peek(1)?;
                let heap = &mut runtime.heap;
                let value = if heap.is_kind(&a, ObjKind::String) || heap.is_kind(&b, ObjKind::String) {
                    Value::Object(concatenate(heap, &a, &b))
                } else {
                    binary_operation(heap, op, &a, &b)?
                };
                self.pop()?;
                self.set_peek(0, value)
            }
            OpCode::Subtract
            | OpCode::Multiply
            | OpCode::Divide
            | OpCode::Modulo
            | OpCode::BitshiftLeft
            | OpCode::BitshiftRight
            | OpCode::BwAnd
            | OpCode::BwOr
            | OpCode::BwXor
            | OpCode::LgAnd
            | OpCode::LgOr
            | OpCode::Less
            | OpCode::Greater
            | OpCode::LessEqual
            | OpCode::GreaterEqual => {
                let b = self.pop()?;
                let a = self.pop()?;
                let value = binary_operation(&runtime.heap, op, &a, &b)?;
                self.push(value)
            }
            OpCode::Negate | OpCode::Increment | OpCode::Decrement | OpCode::BwNot | OpCode::LgNot => {
                let a = self.pop()?;
                let value = unary_operation(&runtime.heap, op, &a)?;
                self.push(value)
            }
            OpCode::Equal | OpCode::EqualNot => {
                let b = self.pop()?;
                let a = self.pop()?;
                let equal = sorta_equal(&runtime.heap, &a, &b);
                self.push(truth(equal == (op == OpCode::Equal)))
            }
            OpCode::TypeOf => {
                let value = self.pop()?;
                let name = type_of(&runtime.heap, &value);
                let name = runtime.heap.string_value(name);
                self.push(name)
            }

            // Classes and calls
            OpCode::Class => {
                let hash = self.read_u32()?;
                let kind = self.read_u8()?;
                let name = match runtime.token(hash) {
                    Some(token) => token.to_string(),
                    None => format!("{:8X}", hash),
                };
                let name = runtime.heap.new_string(&name);
                let mut class = ObjClass::new(hash);
                class.name = Some(name);
                class.kind = match kind {
                    1 => ClassKind::Extended,
                    _ => ClassKind::Normal,
                };
                let class = runtime.heap.alloc(Obj::Class(class));
                self.push(Value::Object(class))
            }
            OpCode::Inherit => {
                let hash = self.read_u32()?;
                let class = self.peek(0)?;
                match class.as_object().and_then(|h| runtime.heap.class_mut(h)) {
                    Some(c) => {
                        c.parent_hash = Some(hash);
                        c.parent = None;
                        Ok(())
                    }
                    None => Err(VmError::runtime("Only classes can inherit.")),
                }
            }
            OpCode::Method => {
                let index = self.read_u8()? as usize;
                let hash = self.read_u32()?;
                let function = self
                    .frame()?
                    .module
                    .and_then(|m| runtime.heap.module(m))
                    .and_then(|m| m.functions.get(index).copied())
                    .ok_or_else(|| VmError::fatal(format!("Method index {} is out of range.", index)))?;
                let class = as_class(runtime, &self.peek(0)?)
                    .ok_or_else(|| VmError::runtime("Cannot define a method on a non-class."))?;
                define_method(runtime, class, function, hash);
                self.pop().map(|_| ())
            }
            OpCode::GetSuperclass => {
                let value = self.pop()?;
                let parent = class_of(runtime, &value).and_then(|c| resolve_parent(runtime, c));
                match parent {
                    Some(parent) => self.push(Value::Object(parent)),
                    None => Err(VmError::runtime("Class does not have a parent.")),
                }
            }
            OpCode::Call => {
                let argc = self.read_u8()? as usize;
                self.call_value(runtime, argc)
            }
            OpCode::Invoke => {
                let argc = self.read_u8()? as usize;
                let hash = self.read_u32()?;
                let is_super = self.read_u8()? != 0;
                self.invoke(runtime, hash, argc, is_super)
            }
            OpCode::New => {
                let argc = self.read_u8()? as usize;
                self.instantiate(runtime, argc)
            }
            OpCode::Import => {
                let name = self.read_constant(runtime)?;
                self.import(runtime, &name)
            }

            OpCode::Error | OpCode::Super => Err(VmError::fatal(format!(
                "Invalid opcode {}.",
                op.name()
            ))),
            OpCode::With
            | OpCode::Event
            | OpCode::EnumNext
            | OpCode::AddEnum
            | OpCode::NewEnum
            | OpCode::UseNamespace
            | OpCode::ImportModule
            | OpCode::Switch => Err(VmError::fatal(format!(
                "Unsupported opcode {}.",
                op.name()
            ))),
        }
    }

    fn define_global(&mut self, runtime: &mut Runtime, hash: u32, value: Value) -> VmResult<()> {
        let incoming = as_class(runtime, &value);

        if let Some(existing) = runtime.globals.get(&hash).cloned() {
            match (incoming, as_class(runtime, &existing)) {
                (Some(extension), Some(original)) => extend_class(runtime, extension, original),
                _ => {
                    runtime.globals.insert(hash, value.delink());
                }
            }
            return Ok(());
        }

        if let Some(existing) = runtime.constants.get(&hash).cloned() {
            return match (incoming, as_class(runtime, &existing)) {
                (Some(extension), Some(original)) => {
                    extend_class(runtime, extension, original);
                    Ok(())
                }
                _ => Err(VmError::runtime(format!(
                    "Cannot redefine constant {}!",
                    runtime.variable_name(hash)
                ))),
            };
        }

        runtime.globals.insert(hash, value.delink());
        Ok(())
    }

    fn get_property(&mut self, runtime: &mut Runtime, object: &Value, hash: u32) -> VmResult<Value> {
        let handle = object.as_object();

        if let Some(instance) = handle.and_then(|h| runtime.heap.instance(h)) {
            if let Some(field) = instance.fields.get(&hash) {
                return Ok(field.delink());
            }
            let class = instance.class;
            let method = get_class_method(runtime, class, hash).ok_or_else(|| {
                VmError::runtime(format!(
                    "Could not find {} in instance!",
                    runtime.variable_name(hash)
                ))
            })?;
            return Ok(self.bind_method(runtime, object, method));
        }

        if let Some(class) = handle.filter(|&h| runtime.heap.class(h).is_some()) {
            return get_class_method(runtime, class, hash)
                .map(|v| v.delink())
                .ok_or_else(|| {
                    VmError::runtime(format!(
                        "Could not find {} in class!",
                        runtime.variable_name(hash)
                    ))
                });
        }

        Err(VmError::runtime("Only instances and classes have properties."))
    }

    /// Bind a scripted method to its receiver; other values are returned as is
    fn bind_method(&mut self, runtime: &mut Runtime, receiver: &Value, method: Value) -> Value {
        match method.as_object() {
            Some(function) if runtime.heap.function(function).is_some() => {
                let bound = runtime.heap.alloc(Obj::BoundMethod(ObjBoundMethod {
                    receiver: receiver.clone(),
                    method: function,
                }));
                Value::Object(bound)
            }
            _ => method.delink(),
        }
    }

    fn set_property(
        &mut self,
        runtime: &mut Runtime,
        object: &Value,
        hash: u32,
        value: &Value,
    ) -> VmResult<()> {
        let value_type = type_name(&runtime.heap, value);
        let fields = match object.as_object().and_then(|h| runtime.heap.get_mut(h)) {
            Some(Obj::Instance(instance)) => &mut instance.fields,
            Some(Obj::Class(class)) => &mut class.fields,
            _ => return Err(VmError::runtime("Only instances and classes have properties.")),
        };
        let linked = match fields.get(&hash) {
            Some(slot) => write_through(slot, value, value_type)?,
            None => false,
        };
        if !linked {
            fields.insert(hash, value.delink());
        }
        Ok(())
    }

    fn get_element(&mut self, runtime: &Runtime, object: &Value, at: &Value) -> VmResult<Value> {
        let heap = &runtime.heap;
        match object.as_object().and_then(|h| heap.get(h)) {
            Some(Obj::Array(array)) => {
                let index = at.as_integer().ok_or_else(|| {
                    VmError::runtime("Cannot get value from array using non-Integer value as an index.")
                })?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| array.values.get(i))
                    .cloned()
                    .ok_or_else(|| {
                        VmError::runtime(format!(
                            "Index {} is out of bounds of array of size {}.",
                            index,
                            array.values.len()
                        ))
                    })
            }
            Some(Obj::Map(map)) => {
                let key = heap.str_of(at).ok_or_else(|| {
                    VmError::runtime("Cannot get value from map using non-String value as an index.")
                })?;
                if key.is_empty() {
                    return Err(VmError::runtime("Cannot find value at empty key."));
                }
                Ok(map.get(key).cloned().unwrap_or(Value::Null))
            }
            Some(_) => Err(VmError::runtime(
                "Cannot get value from object that's non-Array or non-Map.",
            )),
            None => Err(VmError::runtime("Cannot get value from non-Array or non-Map.")),
        }
    }

    fn set_element(
        &mut self,
        runtime: &mut Runtime,
        object: &Value,
        at: &Value,
        value: Value,
    ) -> VmResult<()> {
        let key = runtime.heap.str_of(at).map(str::to_string);
        match object.as_object().and_then(|h| runtime.heap.get_mut(h)) {
            Some(Obj::Array(array)) => {
                let index = at.as_integer().ok_or_else(|| {
                    VmError::runtime("Cannot set value in array using non-Integer value as an index.")
                })?;
                let size = array.values.len();
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|i| array.values.get_mut(i))
                    .ok_or_else(|| {
                        VmError::runtime(format!(
                            "Index {} is out of bounds of array of size {}.",
                            index, size
                        ))
                    })?;
                *slot = value;
                Ok(())
            }
            Some(Obj::Map(map)) => {
                let key = key.ok_or_else(|| {
                    VmError::runtime("Cannot set value in map using non-String value as an index.")
                })?;
                if key.is_empty() {
                    return Err(VmError::runtime("Cannot find value at empty key."));
                }
                map.put(&key, value);
                Ok(())
            }
            Some(_) => Err(VmError::runtime(
                "Cannot set value in object that's non-Array or non-Map.",
            )),
            None => Err(VmError::runtime("Cannot set value in non-Array or non-Map.")),
        }
    }

    fn switch_table(&mut self, runtime: &Runtime) -> VmResult<()> {
        let count = self.read_u16()? as usize;
        let value = self.pop()?;
        let end = self.frame()?.ip + 3 * count + 3;

        let mut default = None;
        let mut target = None;
        for _ in 0..count {
            let index = self.read_u8()?;
            let offset = self.read_u16()? as usize;
            if index == 0xFF {
                default = Some(offset);
                continue;
            }
            let constant = self.constant_at(runtime, index as usize)?;
            if sorta_equal(&runtime.heap, &value, &constant) {
                target = Some(offset);
                break;
            }
        }

        if let Some(offset) = target.or(default) {
            let frame = self.frame_mut()?;
            let distance = (end + offset) as isize - frame.ip as isize;
            frame.jump(distance)?;
        }
        Ok(())
    }

    // Calls

    /// Call the value `argc` slots below the top with the arguments above it
    pub(crate) fn call_value(&mut self, runtime: &mut Runtime, argc: usize) -> VmResult<()> {
        let callee = self.peek(argc)?;
        self.call_callee(runtime, &callee, argc)
    }

    /// Call `callee` as if it sat in the slot below the arguments.
    ///
    /// A bound method replaces that slot with its receiver. A native
    /// receives only the arguments.
    fn call_callee(&mut self, runtime: &mut Runtime, callee: &Value, argc: usize) -> VmResult<()> {
        let Some(handle) = callee.as_object() else {
            return Err(VmError::runtime("Could not call value!"));
        };
        match runtime.heap.get(handle) {
            Some(Obj::BoundMethod(bound)) => {
                let (receiver, method) = (bound.receiver.clone(), bound.method);
                self.set_peek(argc, receiver)?;
                self.call(runtime, method, argc)
            }
            Some(Obj::Function(_)) => self.call(runtime, handle, argc),
            Some(Obj::Native(native)) => {
                let function = native.function;
                self.call_native(runtime, function, argc, argc + 1)
            }
            _ => Err(VmError::runtime("Could not call value!")),
        }
    }

    /// Call `callable` with the receiver in the slot below the arguments.
    ///
    /// A native receives the receiver followed by the arguments.
    pub(crate) fn call_for_object(
        &mut self,
        runtime: &mut Runtime,
        callable: Value,
        argc: usize,
    ) -> VmResult<()> {
        let Some(handle) = callable.as_object() else {
            return Err(VmError::runtime("Could not call value!"));
        };
        match runtime.heap.get(handle) {
            Some(Obj::Native(native)) => {
                let function = native.function;
                self.call_native(runtime, function, argc + 1, argc + 1)
            }
            _ => self.call_callee(runtime, &callable, argc),
        }
    }

    /// Run a native over the top `passed` values, then replace the top
    /// `consumed` values with its result
    fn call_native(
        &mut self,
        runtime: &mut Runtime,
        function: NativeFn,
        passed: usize,
        consumed: usize,
    ) -> VmResult<()> {
        let len = self.stack.len();
        let (Some(start), Some(base)) = (len.checked_sub(passed), len.checked_sub(consumed)) else {
            return Err(VmError::fatal("Stack underflow!"));
        };
        let result = function(&mut runtime.heap, &self.stack[start..])?;
        self.stack.truncate(base);
        self.push(result)
    }

    /// Push a frame for a scripted function
    fn call(&mut self, runtime: &mut Runtime, function: ObjHandle, argc: usize) -> VmResult<()> {
        let Some(f) = runtime.heap.function(function) else {
            return Err(VmError::runtime("Could not call value!"));
        };
        if i64::from(f.arity) != argc as i64 {
            return Err(VmError::runtime(format!(
                "Expected {} arguments to function call, got {}.",
                f.arity, argc
            )));
        }
        if self.frames.is_full() {
            return Err(VmError::fatal(format!(
                "Frame overflow. (Count {} / {})",
                self.frames.len(),
                FRAMES_MAX
            )));
        }
        let slots = self
            .stack
            .len()
            .checked_sub(argc + 1)
            .ok_or_else(|| VmError::fatal("Stack underflow!"))?;
        let frame = CallFrame::new(function, f.code.clone(), slots, f.module);
        self.frames.push(frame);
        Ok(())
    }

    fn invoke(&mut self, runtime: &mut Runtime, hash: u32, argc: usize, is_super: bool) -> VmResult<()> {
        let receiver = self.peek(argc)?;
        let Some(handle) = receiver.as_object() else {
            return Err(VmError::runtime("Only instances and classes have methods."));
        };

        if let Some(instance) = runtime.heap.instance(handle) {
            let class = instance.class;
            if !is_super {
                if let Some(field) = instance.fields.get(&hash).map(Value::delink) {
                    return self.call_callee(runtime, &field, argc);
                }
                return self.invoke_from_class(runtime, class, hash, argc);
            }
            let parent = resolve_parent(runtime, class).ok_or_else(|| {
                VmError::runtime("Instance's class does not have a parent to call method from.")
            })?;
            return self.invoke_from_class(runtime, parent, hash, argc);
        }

        if runtime.heap.class(handle).is_some() {
            let Some(method) = get_class_method(runtime, handle, hash) else {
                return Err(VmError::runtime(format!(
                    "Event {} does not exist in class {}.",
                    runtime.variable_name(hash),
                    runtime.class_name(handle)
                )));
            };
            return self.call_callee(runtime, &method.delink(), argc);
        }

        Err(VmError::runtime("Only instances and classes have methods."))
    }

    fn invoke_from_class(
        &mut self,
        runtime: &mut Runtime,
        class: ObjHandle,
        hash: u32,
        argc: usize,
    ) -> VmResult<()> {
        let method = get_class_method(runtime, class, hash).ok_or_else(|| {
            VmError::runtime(format!("Could not invoke {}!", runtime.variable_name(hash)))
        })?;
        self.call_for_object(runtime, method.delink(), argc)
    }

    fn instantiate(&mut self, runtime: &mut Runtime, argc: usize) -> VmResult<()> {
        let callee = self.peek(argc)?;
        let class = as_class(runtime, &callee)
            .ok_or_else(|| VmError::runtime("Cannot instantiate non-class."))?;

        let instance = runtime.heap.alloc(Obj::Instance(ObjInstance::new(class)));
        self.set_peek(argc, Value::Object(instance))?;

        match runtime.heap.class(class).and_then(|c| c.initializer.clone()) {
            Some(initializer) => self.call_for_object(runtime, initializer, argc),
            None if argc != 0 => Err(VmError::runtime(format!(
                "Expected no arguments to initializer, got {}.",
                argc
            ))),
            None => Ok(()),
        }
    }

    fn import(&mut self, runtime: &mut Runtime, name: &Value) -> VmResult<()> {
        let Some(name) = runtime.heap.str_of(name).map(str::to_string) else {
            return Err(VmError::runtime(format!(
                "Cannot import from a {}.",
                type_name(&runtime.heap, name)
            )));
        };
        let imported = match runtime.import_hook() {
            Some(hook) => hook.import_class(runtime, self, &name)?,
            None => false,
        };
        if !imported {
            return Err(VmError::runtime(format!("Could not import \"{}\"!", name)));
        }
        Ok(())
    }
}
