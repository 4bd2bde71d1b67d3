//! Breakpoints and the debugger hook.
//!
//! A thread carries a set of `(function, offset)` breakpoints. When debugging
//! is enabled and the next instruction is flagged, the thread suspends and
//! hands a [`DebugSession`] to the installed [`Debugger`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use core_types::{ObjHandle, StackFrame, Value, VmResult};

use crate::runtime::Runtime;
use crate::thread::VmThread;

/// What a suspended thread does next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugAction {
    /// Resume until the next breakpoint
    Continue,
    /// Resume and suspend again before the next instruction
    Step,
    /// Fail the running call chain with a fatal error
    Abort,
}

/// Receives control when a thread suspends
pub trait Debugger: Send {
    /// Inspect the suspended thread and decide how it resumes
    fn on_break(&mut self, session: &mut DebugSession<'_>) -> DebugAction;
}

/// Per-thread debugging state
#[derive(Default)]
pub(crate) struct DebugState {
    pub(crate) enabled: bool,
    pub(crate) stepping: bool,
    pub(crate) breakpoints: HashSet<(ObjHandle, usize)>,
    pub(crate) debugger: Option<Box<dyn Debugger>>,
}

impl fmt::Debug for DebugState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugState")
            .field("enabled", &self.enabled)
            .field("stepping", &self.stepping)
            .field("breakpoints", &self.breakpoints.len())
            .field("debugger", &self.debugger.is_some())
            .finish()
    }
}

impl DebugState {
    /// Whether the instruction at `offset` of `function` should suspend
    pub(crate) fn should_break(&self, function: ObjHandle, offset: usize) -> bool {
        self.enabled
            && self.debugger.is_some()
            && (self.stepping || self.breakpoints.contains(&(function, offset)))
    }
}

/// View of a suspended thread handed to a [`Debugger`]
pub struct DebugSession<'a> {
    runtime: &'a mut Runtime,
    thread: &'a mut VmThread,
    function: ObjHandle,
    offset: usize,
}

impl<'a> DebugSession<'a> {
    pub(crate) fn new(
        runtime: &'a mut Runtime,
        thread: &'a mut VmThread,
        function: ObjHandle,
        offset: usize,
    ) -> Self {
        Self {
            runtime,
            thread,
            function,
            offset,
        }
    }

    /// Function the thread is suspended in
    pub fn function(&self) -> ObjHandle {
        self.function
    }

    /// Offset of the instruction about to execute
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Id of the suspended thread
    pub fn thread_id(&self) -> usize {
        self.thread.id()
    }

    /// Source line of the suspended instruction
    pub fn line(&self) -> Option<u32> {
        self.runtime.heap.function(self.function)?.line_at(self.offset)
    }

    /// Active frames, outermost first
    pub fn frames(&self) -> Vec<StackFrame> {
        self.thread.call_trace(self.runtime)
    }

    /// Operand stack of the suspended frame, from its base slot
    pub fn locals(&self) -> &[Value] {
        let base = self.thread.frames.last().map_or(0, |f| f.slots);
        self.thread.stack.get(base..).unwrap_or(&[])
    }

    /// Globals by name, or by hex hash when no token is known
    pub fn globals(&self) -> HashMap<String, Value> {
        self.named(&self.runtime.globals)
    }

    /// Constants by name, or by hex hash when no token is known
    pub fn constants(&self) -> HashMap<String, Value> {
        self.named(&self.runtime.constants)
    }

    fn named(&self, table: &HashMap<u32, Value>) -> HashMap<String, Value> {
        table
            .iter()
            .map(|(&hash, value)| (self.runtime.token_or_hex(hash), value.clone()))
            .collect()
    }

    /// Printed form of a value
    pub fn format(&self, value: &Value) -> String {
        memory_manager::format_value(&self.runtime.heap, value)
    }

    /// Run an already compiled zero-argument function on the suspended
    /// thread. The suspended frame's stack is restored afterwards.
    pub fn evaluate(&mut self, function: ObjHandle) -> VmResult<Value> {
        self.thread.run_function(self.runtime, function, &[])
    }

    /// The runtime, for deeper inspection
    pub fn runtime(&mut self) -> &mut Runtime {
        self.runtime
    }
}
