//! Interpreter threads and their protected entry points.
//!
//! A [`VmThread`] owns a bounded operand stack and frame array. Every entry
//! point saves the stack height, frame count and return frame before it runs
//! and restores them afterwards, whatever the outcome, so a failing callee
//! never corrupts its caller.

use std::fmt;

use arrayvec::ArrayVec;
use core_types::{ObjHandle, StackFrame, Value, VmError, VmResult};

use crate::call_frame::CallFrame;
use crate::debug::{DebugState, Debugger};
use crate::runtime::Runtime;

/// Maximum call depth
pub const FRAMES_MAX: usize = 64;

/// Maximum operand stack size
pub const STACK_SIZE_MAX: usize = FRAMES_MAX * 256;

/// Execution state of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadState {
    /// Not running anything
    #[default]
    Idle,
    /// Executing bytecode
    Running,
    /// Last top-level call returned normally
    Returned,
    /// Last top-level call failed
    Errored,
    /// Stopped at a breakpoint
    Suspended,
}

/// An interpreter thread
pub struct VmThread {
    id: usize,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: ArrayVec<CallFrame, FRAMES_MAX>,
    pub(crate) return_frame: usize,
    pub(crate) register: Value,
    pub(crate) state: ThreadState,
    pub(crate) debug: DebugState,
}

impl fmt::Debug for VmThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmThread")
            .field("id", &self.id)
            .field("stack", &self.stack.len())
            .field("frames", &self.frames.len())
            .field("return_frame", &self.return_frame)
            .field("state", &self.state)
            .field("debug", &self.debug)
            .finish()
    }
}

impl VmThread {
    /// Create an idle thread
    pub fn new(id: usize) -> Self {
        Self {
            id,
            stack: Vec::with_capacity(256),
            frames: ArrayVec::new(),
            return_frame: 0,
            register: Value::Null,
            state: ThreadState::Idle,
            debug: DebugState::default(),
        }
    }

    /// Thread id, as shown in call traces
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current state
    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Number of values on the operand stack
    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    /// Number of active frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Drop every value, frame and the saved register
    pub fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.return_frame = 0;
        self.register = Value::Null;
        self.state = ThreadState::Idle;
        self.debug.stepping = false;
    }

    // Stack

    /// Push a value; overflowing the stack is fatal
    pub fn push(&mut self, value: Value) -> VmResult<()> {
        if self.stack.len() >= STACK_SIZE_MAX {
            return Err(VmError::fatal(format!(
                "Stack overflow! Count: {}",
                self.stack.len()
            )));
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop a value; popping an empty stack is fatal
    pub fn pop(&mut self) -> VmResult<Value> {
        self.stack
            .pop()
            .ok_or_else(|| VmError::fatal("Stack underflow!"))
    }

    /// Value `offset` slots below the top
    pub fn peek(&self, offset: usize) -> VmResult<Value> {
        self.stack
            .len()
            .checked_sub(offset + 1)
            .and_then(|i| self.stack.get(i))
            .cloned()
            .ok_or_else(|| VmError::fatal("Stack underflow!"))
    }

    pub(crate) fn set_peek(&mut self, offset: usize, value: Value) -> VmResult<()> {
        let index = self
            .stack
            .len()
            .checked_sub(offset + 1)
            .ok_or_else(|| VmError::fatal("Stack underflow!"))?;
        self.stack[index] = value;
        Ok(())
    }

    // Debugging

    /// Honour breakpoints on this thread
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug.enabled = enabled;
    }

    /// Install the debugger breakpoints hand control to
    pub fn set_debugger(&mut self, debugger: Box<dyn Debugger>) {
        self.debug.debugger = Some(debugger);
    }

    /// Remove the debugger
    pub fn take_debugger(&mut self) -> Option<Box<dyn Debugger>> {
        self.debug.debugger.take()
    }

    /// Flag the instruction at `offset` of `function`
    pub fn add_breakpoint(&mut self, function: ObjHandle, offset: usize) {
        self.debug.breakpoints.insert((function, offset));
    }

    /// Clear a breakpoint; returns whether it was set
    pub fn remove_breakpoint(&mut self, function: ObjHandle, offset: usize) -> bool {
        self.debug.breakpoints.remove(&(function, offset))
    }

    /// Whether the instruction at `offset` of `function` is flagged
    pub fn has_breakpoint(&self, function: ObjHandle, offset: usize) -> bool {
        self.debug.breakpoints.contains(&(function, offset))
    }

    // Entry points

    /// Run a function with arguments and return its result
    pub fn run_function(
        &mut self,
        runtime: &mut Runtime,
        function: ObjHandle,
        args: &[Value],
    ) -> VmResult<Value> {
        self.run_value(runtime, Value::Object(function), args)
    }

    /// Call any callable value with arguments and return its result
    pub fn run_value(
        &mut self,
        runtime: &mut Runtime,
        callee: Value,
        args: &[Value],
    ) -> VmResult<Value> {
        self.run_protected(runtime, |thread, runtime| {
            thread.push(callee)?;
            for arg in args {
                thread.push(arg.clone())?;
            }
            thread.call_value(runtime, args.len())?;
            thread.execute(runtime)
        })
    }

    /// Call `callable` with `receiver` in slot zero
    pub fn invoke_for_object(
        &mut self,
        runtime: &mut Runtime,
        callable: Value,
        receiver: Value,
        args: &[Value],
    ) -> VmResult<Value> {
        self.run_protected(runtime, |thread, runtime| {
            thread.push(receiver)?;
            for arg in args {
                thread.push(arg.clone())?;
            }
            thread.call_for_object(runtime, callable, args.len())?;
            thread.execute(runtime)
        })
    }

    /// Run the initializer of an instance's class, if it has one
    pub fn call_initializer(&mut self, runtime: &mut Runtime, instance: ObjHandle) -> VmResult<()> {
        let Some(class) = runtime.heap.instance(instance).map(|i| i.class) else {
            return Err(VmError::runtime("Cannot initialize non-instance."));
        };
        let Some(initializer) = runtime.heap.class(class).and_then(|c| c.initializer.clone()) else {
            return Ok(());
        };
        let arity = initializer
            .as_object()
            .and_then(|h| runtime.heap.function(h))
            .map(|f| f.arity);
        if arity.is_some_and(|a| a != 0) {
            return Err(VmError::runtime("Initializer must have no parameters."));
        }
        self.invoke_for_object(runtime, initializer, Value::Object(instance), &[])
            .map(|_| ())
    }

    /// Run `body` with the caller's stack, frames and return frame saved.
    ///
    /// On success the body leaves exactly one result on the stack. On error a
    /// call trace is attached (unless an inner boundary already did) and the
    /// report is logged.
    pub(crate) fn run_protected<F>(&mut self, runtime: &mut Runtime, body: F) -> VmResult<Value>
    where
        F: FnOnce(&mut Self, &mut Runtime) -> VmResult<()>,
    {
        let stack_top = self.stack.len();
        let frame_count = self.frames.len();
        let return_frame = self.return_frame;

        self.return_frame = frame_count;
        self.state = ThreadState::Running;

        let result = body(self, runtime).and_then(|()| self.pop());
        let result = result.map_err(|error| {
            if !error.stack.is_empty() {
                return error;
            }
            let stack = self.call_trace(runtime);
            log::error!("{}", self.report(runtime, &error.message));
            error.with_stack(stack)
        });

        self.stack.truncate(stack_top);
        self.frames.truncate(frame_count);
        self.return_frame = return_frame;
        self.state = match (&result, frame_count) {
            (_, n) if n > 0 => ThreadState::Running,
            (Ok(_), _) => ThreadState::Returned,
            (Err(_), _) => ThreadState::Errored,
        };
        result
    }

    // Diagnostics

    /// Active frames, outermost first.
    ///
    /// Each frame's line is that of the call site in the frame below it.
    pub fn call_trace(&self, runtime: &Runtime) -> Vec<StackFrame> {
        let mut trace = Vec::with_capacity(self.frames.len());
        for (i, frame) in self.frames.iter().enumerate() {
            let line = match i {
                0 => None,
                _ => {
                    let caller = &self.frames[i - 1];
                    runtime
                        .heap
                        .function(caller.function)
                        .and_then(|f| f.line_at(caller.ip_last))
                }
            };
            trace.push(StackFrame::new(
                runtime.function_name(frame.function),
                runtime.source_filename(frame.function),
                line,
            ));
        }
        trace
    }

    /// Full error report with the call trace of the current frames
    pub fn report(&self, runtime: &Runtime, message: &str) -> String {
        let mut out = String::new();
        match self.frames.last() {
            Some(frame) => {
                let line = runtime
                    .heap
                    .function(frame.function)
                    .and_then(|f| f.line_at(frame.ip_last));
                match line {
                    Some(line) => out.push_str(&format!(
                        "In {} of {}, line {}:\n\n    {}\n",
                        runtime.function_name(frame.function),
                        runtime.source_filename(frame.function),
                        line,
                        message
                    )),
                    None => out.push_str(&format!(
                        "On offset {}:\n    {}\n",
                        frame.ip_last, message
                    )),
                }
            }
            None => {
                out.push_str(message);
                out.push('\n');
                return out;
            }
        }

        out.push_str(&format!("\nCall Trace (Thread {}):\n", self.id));
        let trace = self.call_trace(runtime);
        let last = trace.len().saturating_sub(1);
        for (i, frame) in trace.iter().enumerate() {
            out.push_str("    ");
            out.push_str(&frame.to_string());
            if i < last {
                out.push_str(", then");
            }
            out.push('\n');
        }
        out
    }

    /// Printed operand stack, top first
    pub fn format_stack(&self, runtime: &Runtime) -> String {
        let mut out = String::from("Stack:\n");
        for (i, value) in self.stack.iter().rev().enumerate() {
            out.push_str(&format!(
                "{:4} '{}'\n",
                -(i as i64),
                memory_manager::format_value(&runtime.heap, value)
            ));
        }
        out
    }
}
