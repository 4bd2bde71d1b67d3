//! Unit tests for interpreter components

use std::sync::Arc;

use bytecode_system::{BytecodeContainer, Chunk, Constant, FunctionProto, OpCode};
use core_types::{hash_name, ErrorKind, NativeDecimal, ObjHandle, Value, VmResult};
use interpreter::{
    DebugAction, DebugSession, Debugger, ImportHook, Runtime, ThreadState, VmThread,
};
use memory_manager::{Heap, Obj, ObjNative};
use parking_lot::Mutex;

const TOKENS: &[&str] = &[
    "Lives", "Nope", "MaxLives", "Speed", "Counter", "Get", "Base", "Derived", "Name",
    "BaseName", "Box", "Size", "Twice", "Count", "Add", "Recurse", "Enemy", "Player", "A", "B",
];

fn load(rt: &mut Runtime, functions: Vec<FunctionProto>) -> Vec<ObjHandle> {
    let container = BytecodeContainer::new(functions).with_tokens(TOKENS.iter().copied());
    let module = interpreter::load_module(rt, &container, 0x10);
    rt.heap
        .module(module)
        .map(|m| m.functions.clone())
        .unwrap_or_default()
}

fn run(rt: &mut Runtime, functions: Vec<FunctionProto>) -> VmResult<Value> {
    let handles = load(rt, functions);
    VmThread::new(0).run_function(rt, handles[0], &[])
}

fn main_fn(chunk: Chunk) -> FunctionProto {
    FunctionProto::new(0, 0, chunk)
}

fn method(name: &str, chunk: Chunk) -> FunctionProto {
    FunctionProto::new(0, hash_name(name), chunk)
}

fn returns_integer(n: i32) -> Chunk {
    let mut chunk = Chunk::new();
    chunk.emit_integer(n);
    chunk.emit_op(OpCode::Return);
    chunk
}

/// `CLASS name; COPY 1; METHOD i m ...; DEFINE_GLOBAL name`
fn define_class(chunk: &mut Chunk, name: &str, parent: Option<&str>, methods: &[(u8, &str)]) {
    chunk.emit_class(name, false);
    if let Some(parent) = parent {
        chunk.emit_named(OpCode::Inherit, parent);
    }
    for &(index, method) in methods {
        chunk.emit_with_byte(OpCode::Copy, 1);
        chunk.emit_method(index, method);
    }
    chunk.emit_named(OpCode::DefineGlobal, name);
}

// ============================================================================
// Globals
// ============================================================================

#[test]
fn test_global_define_get_set() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    main.emit_integer(5);
    main.emit_named(OpCode::DefineGlobal, "Lives");
    main.emit_named(OpCode::GetGlobal, "Lives");
    main.emit_integer(2);
    main.emit_op(OpCode::Add);
    main.emit_named(OpCode::SetGlobal, "Lives");
    main.emit_op(OpCode::Pop);
    main.emit_named(OpCode::GetGlobal, "Lives");
    main.emit_op(OpCode::Return);

    assert_eq!(run(&mut rt, vec![main_fn(main)]).unwrap(), Value::Integer(7));
    assert_eq!(rt.global("Lives"), Some(Value::Integer(7)));
}

#[test]
fn test_missing_global_is_runtime_error() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    main.emit_named(OpCode::GetGlobal, "Nope");
    main.emit_op(OpCode::Return);

    let err = run(&mut rt, vec![main_fn(main)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.message, "Variable \"Nope\" does not exist.");
}

#[test]
fn test_set_global_on_constant_rejected() {
    let mut rt = Runtime::new();
    rt.global_const_integer(None, "MaxLives", 3);
    let mut main = Chunk::new();
    main.emit_integer(1);
    main.emit_named(OpCode::SetGlobal, "MaxLives");
    main.emit_op(OpCode::Return);

    let err = run(&mut rt, vec![main_fn(main)]).unwrap_err();
    assert_eq!(err.message, "Cannot redefine constant \"MaxLives\"!");
    assert_eq!(rt.constant("MaxLives"), Some(Value::Integer(3)));
}

#[test]
fn test_linked_global_writes_through() {
    let mut rt = Runtime::new();
    let speed = NativeDecimal::new(1.0);
    rt.global_link_decimal(None, "Speed", speed.accessor());

    let mut main = Chunk::new();
    main.emit_integer(4);
    main.emit_named(OpCode::SetGlobal, "Speed");
    main.emit_op(OpCode::Return);
    assert_eq!(run(&mut rt, vec![main_fn(main)]).unwrap(), Value::Integer(4));
    assert_eq!(speed.get(), 4.0);

    let mut main = Chunk::new();
    main.emit_constant("fast");
    main.emit_named(OpCode::SetGlobal, "Speed");
    main.emit_op(OpCode::Return);
    let err = run(&mut rt, vec![main_fn(main)]).unwrap_err();
    assert_eq!(
        err.message,
        "Expected value to be of type Decimal instead of String."
    );
    assert_eq!(speed.get(), 4.0);
}

// ============================================================================
// Classes
// ============================================================================

#[test]
fn test_class_method_invoke() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    define_class(&mut main, "Counter", None, &[(1, "Get")]);
    main.emit_named(OpCode::GetGlobal, "Counter");
    main.emit_with_byte(OpCode::New, 0);
    main.emit_invoke("Get", 0, false);
    main.emit_op(OpCode::Return);

    let result = run(
        &mut rt,
        vec![main_fn(main), method("Get", returns_integer(7))],
    );
    assert_eq!(result.unwrap(), Value::Integer(7));
    assert!(rt.class_by_name("Counter").is_some());
}

#[test]
fn test_inherited_and_super_invoke() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    define_class(&mut main, "Base", None, &[(1, "Name")]);
    define_class(&mut main, "Derived", Some("Base"), &[(2, "Name"), (3, "BaseName")]);
    main.emit_named(OpCode::GetGlobal, "Derived");
    main.emit_with_byte(OpCode::New, 0);
    main.emit_invoke("BaseName", 0, false);
    main.emit_op(OpCode::Return);

    let mut base_name = Chunk::new();
    base_name.emit_with_byte(OpCode::GetLocal, 0);
    base_name.emit_invoke("Name", 0, true);
    base_name.emit_op(OpCode::Return);

    let result = run(
        &mut rt,
        vec![
            main_fn(main),
            method("Name", returns_integer(1)),
            method("Name", returns_integer(2)),
            method("BaseName", base_name),
        ],
    );
    assert_eq!(result.unwrap(), Value::Integer(1));
}

#[test]
fn test_initializer_runs_on_new() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    define_class(&mut main, "Box", None, &[(1, "Box")]);
    main.emit_named(OpCode::GetGlobal, "Box");
    main.emit_with_byte(OpCode::New, 0);
    main.emit_named(OpCode::GetProperty, "Size");
    main.emit_op(OpCode::Return);

    let mut init = Chunk::new();
    init.emit_with_byte(OpCode::GetLocal, 0);
    init.emit_integer(3);
    init.emit_named(OpCode::SetProperty, "Size");
    init.emit_op(OpCode::Pop);
    init.emit_with_byte(OpCode::GetLocal, 0);
    init.emit_op(OpCode::Return);

    let result = run(&mut rt, vec![main_fn(main), method("Box", init)]);
    assert_eq!(result.unwrap(), Value::Integer(3));
}

#[test]
fn test_new_without_initializer_takes_no_arguments() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    define_class(&mut main, "Counter", None, &[]);
    main.emit_named(OpCode::GetGlobal, "Counter");
    main.emit_integer(1);
    main.emit_with_byte(OpCode::New, 1);
    main.emit_op(OpCode::Return);

    let err = run(&mut rt, vec![main_fn(main)]).unwrap_err();
    assert_eq!(err.message, "Expected no arguments to initializer, got 1.");
}

#[test]
fn test_instance_field_shadows_method() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    define_class(&mut main, "Counter", None, &[(1, "Get")]);
    main.emit_named(OpCode::GetGlobal, "Counter");
    main.emit_with_byte(OpCode::New, 0);
    main.emit_with_byte(OpCode::Copy, 1);
    main.emit_integer(9);
    main.emit_named(OpCode::SetProperty, "Get");
    main.emit_op(OpCode::Pop);
    main.emit_named(OpCode::GetProperty, "Get");
    main.emit_op(OpCode::Return);
    let result = run(&mut rt, vec![main_fn(main), method("Get", returns_integer(7))]);
    assert_eq!(result.unwrap(), Value::Integer(9));
}

#[test]
fn test_invoked_field_function_keeps_receiver_slot() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    define_class(&mut main, "Counter", None, &[(1, "Get")]);
    main.emit_named(OpCode::GetGlobal, "Counter");
    main.emit_with_byte(OpCode::New, 0);
    main.emit_with_byte(OpCode::Copy, 1);
    main.emit_named(OpCode::GetGlobal, "Self");
    main.emit_named(OpCode::SetProperty, "Get");
    main.emit_op(OpCode::Pop);
    main.emit_invoke("Get", 0, false);
    main.emit_op(OpCode::Return);

    // Returns whatever sits in its slot 0
    let mut own_slot = Chunk::new();
    own_slot.emit_with_byte(OpCode::GetLocal, 0);
    own_slot.emit_op(OpCode::Return);

    let handles = load(
        &mut rt,
        vec![
            main_fn(main),
            method("Get", returns_integer(7)),
            method("Self", own_slot),
        ],
    );
    rt.set_global("Self", Value::Object(handles[2]));
    let result = VmThread::new(0)
        .run_function(&mut rt, handles[0], &[])
        .unwrap();

    let instance = result.as_object().unwrap();
    assert!(rt.heap.instance(instance).is_some());
}

#[test]
fn test_class_extension_merges_methods() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    define_class(&mut main, "Player", None, &[(1, "A")]);
    main.emit_class("Player", true);
    main.emit_with_byte(OpCode::Copy, 1);
    main.emit_method(2, "B");
    main.emit_named(OpCode::DefineGlobal, "Player");
    main.emit_named(OpCode::GetGlobal, "Player");
    main.emit_with_byte(OpCode::New, 0);
    main.emit_invoke("B", 0, false);
    main.emit_op(OpCode::Return);

    let result = run(
        &mut rt,
        vec![
            main_fn(main),
            method("A", returns_integer(1)),
            method("B", returns_integer(2)),
        ],
    );
    assert_eq!(result.unwrap(), Value::Integer(2));

    let class = rt.class_by_name("Player").unwrap();
    let methods = &rt.heap.class(class).unwrap().methods;
    assert!(methods.contains_key(&hash_name("A")));
    assert!(methods.contains_key(&hash_name("B")));
}

// ============================================================================
// Calls
// ============================================================================

fn twice(heap: &mut Heap, args: &[Value]) -> VmResult<Value> {
    let n = interpreter::native::arg_integer(heap, args, 0)?;
    Ok(Value::Integer(n * 2))
}

fn count(_: &mut Heap, args: &[Value]) -> VmResult<Value> {
    Ok(Value::Integer(args.len() as i32))
}

#[test]
fn test_native_call() {
    let mut rt = Runtime::new();
    let native = rt.heap.alloc(Obj::Native(ObjNative { function: twice }));
    rt.set_global("Twice", Value::Object(native));

    let mut main = Chunk::new();
    main.emit_named(OpCode::GetGlobal, "Twice");
    main.emit_integer(21);
    main.emit_with_byte(OpCode::Call, 1);
    main.emit_op(OpCode::Return);

    assert_eq!(run(&mut rt, vec![main_fn(main)]).unwrap(), Value::Integer(42));
}

#[test]
fn test_native_method_receives_receiver() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    define_class(&mut main, "Counter", None, &[]);
    main.emit_op(OpCode::Null);
    main.emit_op(OpCode::Return);
    let handles = load(&mut rt, vec![main_fn(main)]);
    let mut thread = VmThread::new(0);
    thread.run_function(&mut rt, handles[0], &[]).unwrap();

    let class = rt.class_by_name("Counter").unwrap();
    rt.define_native(class, "Count", count);

    let mut main = Chunk::new();
    main.emit_named(OpCode::GetGlobal, "Counter");
    main.emit_with_byte(OpCode::New, 0);
    main.emit_integer(5);
    main.emit_invoke("Count", 1, false);
    main.emit_op(OpCode::Return);
    assert_eq!(run(&mut rt, vec![main_fn(main)]).unwrap(), Value::Integer(2));
}

#[test]
fn test_arity_mismatch() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    main.emit_named(OpCode::GetGlobal, "Add");
    main.emit_with_byte(OpCode::Call, 0);
    main.emit_op(OpCode::Return);
    let add = FunctionProto::new(1, hash_name("Add"), returns_integer(0));

    let handles = load(&mut rt, vec![main_fn(main), add]);
    rt.set_global("Add", Value::Object(handles[1]));
    let err = VmThread::new(0)
        .run_function(&mut rt, handles[0], &[])
        .unwrap_err();
    assert_eq!(err.message, "Expected 1 arguments to function call, got 0.");
}

#[test]
fn test_frame_overflow_is_fatal() {
    let mut rt = Runtime::new();
    let mut recurse = Chunk::new();
    recurse.emit_named(OpCode::GetGlobal, "Recurse");
    recurse.emit_with_byte(OpCode::Call, 0);
    recurse.emit_op(OpCode::Return);

    let handles = load(&mut rt, vec![main_fn(recurse)]);
    rt.set_global("Recurse", Value::Object(handles[0]));

    let mut thread = VmThread::new(0);
    let err = thread.run_function(&mut rt, handles[0], &[]).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.message.starts_with("Frame overflow."));
    assert_eq!(err.stack.len(), interpreter::FRAMES_MAX);
    assert_eq!(thread.stack_size(), 0);
    assert_eq!(thread.frame_count(), 0);
    assert_eq!(thread.state(), ThreadState::Errored);
}

// ============================================================================
// Values, containers and control flow
// ============================================================================

#[test]
fn test_array_and_map_elements() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    main.emit_integer(10);
    main.emit_integer(20);
    main.emit_op(OpCode::NewArray);
    main.emit_u32(2);
    main.emit_integer(1);
    main.emit_op(OpCode::GetElement);
    main.emit_op(OpCode::Return);
    assert_eq!(run(&mut rt, vec![main_fn(main)]).unwrap(), Value::Integer(20));

    let mut main = Chunk::new();
    main.emit_integer(10);
    main.emit_op(OpCode::NewArray);
    main.emit_u32(1);
    main.emit_integer(5);
    main.emit_op(OpCode::GetElement);
    main.emit_op(OpCode::Return);
    let err = run(&mut rt, vec![main_fn(main)]).unwrap_err();
    assert_eq!(err.message, "Index 5 is out of bounds of array of size 1.");

    let mut main = Chunk::new();
    main.emit_constant("hp");
    main.emit_integer(3);
    main.emit_op(OpCode::NewMap);
    main.emit_u32(1);
    main.emit_constant("hp");
    main.emit_op(OpCode::GetElement);
    main.emit_op(OpCode::Return);
    assert_eq!(run(&mut rt, vec![main_fn(main)]).unwrap(), Value::Integer(3));
}

#[test]
fn test_string_concatenation_and_typeof() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    main.emit_constant("Score: ");
    main.emit_integer(10);
    main.emit_op(OpCode::Add);
    main.emit_op(OpCode::Return);
    let result = run(&mut rt, vec![main_fn(main)]).unwrap();
    assert_eq!(rt.heap.str_of(&result), Some("Score: 10"));

    let mut main = Chunk::new();
    main.emit_decimal(1.5);
    main.emit_op(OpCode::TypeOf);
    main.emit_op(OpCode::Return);
    let result = run(&mut rt, vec![main_fn(main)]).unwrap();
    assert_eq!(rt.heap.str_of(&result), Some("decimal"));
}

#[test]
fn test_loop_counts_to_ten() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    main.emit_integer(0);
    let top = main.len();
    main.emit_with_byte(OpCode::GetLocal, 1);
    main.emit_integer(10);
    main.emit_op(OpCode::Less);
    let exit = main.emit_jump(OpCode::JumpIfFalse);
    main.emit_op(OpCode::Pop);
    main.emit_with_byte(OpCode::GetLocal, 1);
    main.emit_op(OpCode::Increment);
    main.emit_with_byte(OpCode::SetLocal, 1);
    main.emit_op(OpCode::Pop);
    main.emit_loop(top);
    main.patch_jump(exit);
    main.emit_op(OpCode::Pop);
    main.emit_with_byte(OpCode::GetLocal, 1);
    main.emit_op(OpCode::Return);

    assert_eq!(run(&mut rt, vec![main_fn(main)]).unwrap(), Value::Integer(10));
}

fn switch_on(value: i32) -> Chunk {
    let mut chunk = Chunk::new();
    let one = chunk.add_constant(1) as u8;
    let two = chunk.add_constant(2) as u8;
    chunk.emit_integer(value);
    chunk.emit_op(OpCode::SwitchTable);
    chunk.emit_u16(2);
    chunk.emit_byte(one);
    chunk.emit_u16(0);
    chunk.emit_byte(two);
    chunk.emit_u16(6);
    // no match and no default
    let none = chunk.emit_jump(OpCode::Jump);
    chunk.emit_integer(10);
    chunk.emit_op(OpCode::Return);
    chunk.emit_integer(20);
    chunk.emit_op(OpCode::Return);
    chunk.patch_jump(none);
    chunk.emit_integer(0);
    chunk.emit_op(OpCode::Return);
    chunk
}

#[test]
fn test_switch_table() {
    let mut rt = Runtime::new();
    assert_eq!(run(&mut rt, vec![main_fn(switch_on(1))]).unwrap(), Value::Integer(10));
    assert_eq!(run(&mut rt, vec![main_fn(switch_on(2))]).unwrap(), Value::Integer(20));
    assert_eq!(run(&mut rt, vec![main_fn(switch_on(3))]).unwrap(), Value::Integer(0));
}

#[test]
fn test_module_locals() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    main.emit_integer(5);
    main.emit_op(OpCode::DefineModuleLocal);
    main.emit_op(OpCode::GetModuleLocal);
    main.emit_u16(0);
    main.emit_integer(1);
    main.emit_op(OpCode::Add);
    main.emit_op(OpCode::SetModuleLocal);
    main.emit_u16(0);
    main.emit_op(OpCode::Pop);
    main.emit_op(OpCode::GetModuleLocal);
    main.emit_u16(0);
    main.emit_op(OpCode::Return);

    assert_eq!(run(&mut rt, vec![main_fn(main)]).unwrap(), Value::Integer(6));
}

#[test]
fn test_division_by_zero_is_recoverable() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    main.emit_decimal(1.0);
    main.emit_decimal(0.0);
    main.emit_op(OpCode::Divide);
    main.emit_op(OpCode::Return);

    let err = run(&mut rt, vec![main_fn(main)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.message, "Cannot divide decimal by zero.");
}

#[test]
fn test_scene_opcode_is_fatal() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    main.emit_op(OpCode::With);
    main.emit_op(OpCode::Return);

    let err = run(&mut rt, vec![main_fn(main)]).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.message, "Unsupported opcode OP_WITH.");
}

// ============================================================================
// Import
// ============================================================================

struct DefineOnImport;

impl ImportHook for DefineOnImport {
    fn import_class(&self, runtime: &mut Runtime, _: &mut VmThread, name: &str) -> VmResult<bool> {
        if name != "Enemy" {
            return Ok(false);
        }
        let class = runtime.new_class(name);
        runtime.set_global(name, Value::Object(class));
        Ok(true)
    }
}

fn import(name: &str) -> Chunk {
    let mut chunk = Chunk::new();
    let index = chunk.add_constant(name);
    chunk.emit_op(OpCode::Import);
    chunk.emit_u32(index);
    chunk.emit_op(OpCode::Null);
    chunk.emit_op(OpCode::Return);
    chunk
}

#[test]
fn test_import_through_hook() {
    let mut rt = Runtime::new();
    let err = run(&mut rt, vec![main_fn(import("Enemy"))]).unwrap_err();
    assert_eq!(err.message, "Could not import \"Enemy\"!");

    rt.set_import_hook(Arc::new(DefineOnImport));
    assert!(run(&mut rt, vec![main_fn(import("Enemy"))]).is_ok());
    assert!(rt.class_by_name("Enemy").is_some());
    assert!(run(&mut rt, vec![main_fn(import("Ghost"))]).is_err());
}

#[test]
fn test_import_requires_string() {
    let mut rt = Runtime::new();
    let mut main = Chunk::new();
    let index = main.add_constant(Constant::Integer(3));
    main.emit_op(OpCode::Import);
    main.emit_u32(index);
    main.emit_op(OpCode::Return);

    let err = run(&mut rt, vec![main_fn(main)]).unwrap_err();
    assert_eq!(err.message, "Cannot import from a Integer.");
}

// ============================================================================
// Debugger
// ============================================================================

#[derive(Default)]
struct Hits {
    offsets: Vec<usize>,
    locals: Vec<usize>,
    evaluated: Vec<Value>,
}

struct Recorder {
    hits: Arc<Mutex<Hits>>,
    actions: Vec<DebugAction>,
    evaluate: Option<ObjHandle>,
}

impl Debugger for Recorder {
    fn on_break(&mut self, session: &mut DebugSession<'_>) -> DebugAction {
        let evaluated = self.evaluate.and_then(|f| session.evaluate(f).ok());
        let mut hits = self.hits.lock();
        hits.offsets.push(session.offset());
        hits.locals.push(session.locals().len());
        hits.evaluated.extend(evaluated);
        if self.actions.is_empty() {
            DebugAction::Continue
        } else {
            self.actions.remove(0)
        }
    }
}

/// `INTEGER 1` at 0, `INTEGER 2` at 5, `ADD` at 10, `RETURN` at 11
fn one_plus_two() -> Chunk {
    let mut chunk = Chunk::new();
    chunk.emit_integer(1);
    chunk.emit_integer(2);
    chunk.emit_op(OpCode::Add);
    chunk.emit_op(OpCode::Return);
    chunk
}

fn debug_thread(
    rt: &mut Runtime,
    actions: Vec<DebugAction>,
    with_eval: bool,
) -> (VmThread, ObjHandle, Arc<Mutex<Hits>>) {
    let handles = load(rt, vec![main_fn(one_plus_two()), method("Get", returns_integer(99))]);
    let hits = Arc::new(Mutex::new(Hits::default()));
    let mut thread = VmThread::new(1);
    thread.set_debug(true);
    thread.set_debugger(Box::new(Recorder {
        hits: hits.clone(),
        actions,
        evaluate: with_eval.then_some(handles[1]),
    }));
    thread.add_breakpoint(handles[0], 10);
    (thread, handles[0], hits)
}

#[test]
fn test_breakpoint_suspends_and_continues() {
    let mut rt = Runtime::new();
    let (mut thread, main, hits) = debug_thread(&mut rt, vec![], true);

    let result = thread.run_function(&mut rt, main, &[]).unwrap();
    assert_eq!(result, Value::Integer(3));

    let hits = hits.lock();
    assert_eq!(hits.offsets, vec![10]);
    assert_eq!(hits.locals, vec![3]);
    assert_eq!(hits.evaluated, vec![Value::Integer(99)]);
}

#[test]
fn test_breakpoint_step() {
    let mut rt = Runtime::new();
    let (mut thread, main, hits) = debug_thread(&mut rt, vec![DebugAction::Step], false);

    thread.run_function(&mut rt, main, &[]).unwrap();
    assert_eq!(hits.lock().offsets, vec![10, 11]);
}

#[test]
fn test_breakpoint_abort() {
    let mut rt = Runtime::new();
    let (mut thread, main, hits) = debug_thread(&mut rt, vec![DebugAction::Abort], false);

    let err = thread.run_function(&mut rt, main, &[]).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.message, "Execution aborted by the debugger.");
    assert_eq!(hits.lock().offsets, vec![10]);
    assert_eq!(thread.stack_size(), 0);
}

#[test]
fn test_breakpoints_ignored_when_debug_disabled() {
    let mut rt = Runtime::new();
    let (mut thread, main, hits) = debug_thread(&mut rt, vec![], false);
    thread.set_debug(false);

    thread.run_function(&mut rt, main, &[]).unwrap();
    assert!(hits.lock().offsets.is_empty());
}
