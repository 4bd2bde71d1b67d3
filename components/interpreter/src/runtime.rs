//! The runtime context shared by every interpreter thread.
//!
//! A [`Runtime`] owns the heap and the process-wide tables: globals,
//! constants, debug tokens, loaded modules, the all-functions list and the
//! registered classes. Every operation takes it by reference, so several
//! independent runtimes can live side by side.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use core_types::{hash_name, DecimalLink, IntegerLink, ObjHandle, Value, VmResult};
use memory_manager::{CollectionReport, Heap, NativeFn, Obj, ObjClass, ObjNative, RootSet};

use crate::thread::VmThread;

/// Loads classes on behalf of `OP_IMPORT`.
///
/// Installed by the registry, which owns the bytecode sources.
pub trait ImportHook: Send + Sync {
    /// Load every file of `name`. Returns `Ok(false)` when the class is unknown.
    fn import_class(
        &self,
        runtime: &mut Runtime,
        thread: &mut VmThread,
        name: &str,
    ) -> VmResult<bool>;
}

/// Process-wide script state
pub struct Runtime {
    /// Object heap
    pub heap: Heap,
    /// Classes, top-level functions and values, by name hash
    pub globals: HashMap<u32, Value>,
    /// Read-only bindings, by name hash
    pub constants: HashMap<u32, Value>,
    /// Debug tokens, by name hash
    pub tokens: HashMap<u32, String>,
    /// Loaded modules in load order
    pub modules: Vec<ObjHandle>,
    /// Every function of every loaded module
    pub functions: Vec<ObjHandle>,
    /// Classes registered by the host
    pub classes: Vec<ObjHandle>,
    /// Native base class of entity-bound classes
    pub entity_base: Option<ObjHandle>,
    /// Additional values kept alive by the host
    pub extra_roots: Vec<Value>,
    /// Interpreter threads currently active
    pub active_threads: usize,
    import_hook: Option<Arc<dyn ImportHook>>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("objects", &self.heap.len())
            .field("globals", &self.globals.len())
            .field("constants", &self.constants.len())
            .field("tokens", &self.tokens.len())
            .field("modules", &self.modules.len())
            .field("functions", &self.functions.len())
            .field("active_threads", &self.active_threads)
            .finish()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime with an empty default heap
    pub fn new() -> Self {
        Self::with_heap(Heap::new())
    }

    /// Create a runtime around an existing heap
    pub fn with_heap(heap: Heap) -> Self {
        Self {
            heap,
            globals: HashMap::new(),
            constants: HashMap::new(),
            tokens: HashMap::new(),
            modules: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            entity_base: None,
            extra_roots: Vec::new(),
            active_threads: 1,
            import_hook: None,
        }
    }

    /// Install the hook `OP_IMPORT` loads classes through
    pub fn set_import_hook(&mut self, hook: Arc<dyn ImportHook>) {
        self.import_hook = Some(hook);
    }

    /// The installed import hook
    pub fn import_hook(&self) -> Option<Arc<dyn ImportHook>> {
        self.import_hook.clone()
    }

    // Names

    /// Register a token; the first registration of a hash wins
    pub fn add_token(&mut self, token: &str) -> u32 {
        let hash = hash_name(token);
        self.tokens
            .entry(hash)
            .or_insert_with(|| token.to_string());
        hash
    }

    /// Token registered for a hash
    pub fn token(&self, hash: u32) -> Option<&str> {
        self.tokens.get(&hash).map(String::as_str)
    }

    /// Token for a hash, or the hash in hex
    pub fn token_or_hex(&self, hash: u32) -> String {
        match self.token(hash) {
            Some(token) => token.to_string(),
            None => format!("{:X}", hash),
        }
    }

    /// Name for error messages: `"token"` or `$[HASH]`
    pub fn variable_name(&self, hash: u32) -> String {
        match self.token(hash) {
            Some(token) => format!("\"{}\"", token),
            None => format!("$[{:08X}]", hash),
        }
    }

    /// Name of a function as shown in stack traces
    pub fn function_name(&self, function: ObjHandle) -> String {
        let Some(f) = self.heap.function(function) else {
            return "<anonymous-fn>".to_string();
        };
        let name = match f.name.and_then(|n| self.heap.string(n)) {
            Some(name) => name.to_string(),
            None => self.token_or_hex(f.name_hash),
        };
        match name.as_str() {
            "main" => "top-level function".to_string(),
            "<anonymous-fn>" => name,
            _ => match f.class_name.and_then(|c| self.heap.string(c)) {
                Some(class) => format!("method {}::{}", class, name),
                None => format!("function {}", name),
            },
        }
    }

    /// Source filename a function was compiled from
    pub fn source_filename(&self, function: ObjHandle) -> String {
        self.heap
            .function(function)
            .and_then(|f| f.source_filename)
            .and_then(|s| self.heap.string(s))
            .unwrap_or("?")
            .to_string()
    }

    /// Name of a class, or its hash in hex
    pub fn class_name(&self, class: ObjHandle) -> String {
        match self.heap.class(class) {
            Some(c) => match c.name.and_then(|n| self.heap.string(n)) {
                Some(name) => name.to_string(),
                None => format!("{:08X}", c.hash),
            },
            None => "?".to_string(),
        }
    }

    // Globals

    /// Global by name
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(&hash_name(name)).cloned()
    }

    /// Define or replace a global
    pub fn set_global(&mut self, name: &str, value: Value) {
        let hash = self.add_token(name);
        self.globals.insert(hash, value);
    }

    /// Constant by name
    pub fn constant(&self, name: &str) -> Option<Value> {
        self.constants.get(&hash_name(name)).cloned()
    }

    /// Class registered in globals under `name`
    pub fn class_by_name(&self, name: &str) -> Option<ObjHandle> {
        self.class_by_hash(hash_name(name))
    }

    /// Class registered in globals under a hash
    pub fn class_by_hash(&self, hash: u32) -> Option<ObjHandle> {
        let handle = self.globals.get(&hash)?.as_object()?;
        self.heap.class(handle).map(|_| handle)
    }

    /// Whether `name` is a class bound as a constant by the host
    pub fn is_standard_library_class(&self, name: &str) -> bool {
        self.constants
            .get(&hash_name(name))
            .and_then(Value::as_object)
            .is_some_and(|h| self.heap.class(h).is_some())
    }

    // Native binding

    /// Allocate a named class without registering it anywhere
    pub fn new_class(&mut self, name: &str) -> ObjHandle {
        let hash = self.add_token(name);
        let name = self.heap.new_string(name);
        let mut class = ObjClass::new(hash);
        class.name = Some(name);
        self.heap.alloc(Obj::Class(class))
    }

    /// Allocate a class and bind it as a constant
    pub fn new_native_class(&mut self, name: &str) -> ObjHandle {
        let class = self.new_class(name);
        let hash = hash_name(name);
        self.constants.insert(hash, Value::Object(class));
        class
    }

    /// Add a native method to a class unless one of that name exists
    pub fn define_native(&mut self, class: ObjHandle, name: &str, function: NativeFn) {
        let hash = self.add_token(name);
        let exists = match self.heap.class(class) {
            Some(c) => c.methods.contains_key(&hash),
            None => return,
        };
        if exists {
            return;
        }
        let native = self.heap.alloc(Obj::Native(ObjNative { function }));
        if let Some(c) = self.heap.class_mut(class) {
            c.methods.insert(hash, Value::Object(native));
        }
    }

    fn bind(&mut self, class: Option<ObjHandle>, name: &str, value: Value, constant: bool) {
        let hash = self.add_token(name);
        match class {
            Some(class) => {
                if let Some(c) = self.heap.class_mut(class) {
                    c.methods.insert(hash, value);
                }
            }
            None if constant => {
                self.constants.insert(hash, value);
            }
            None => {
                self.globals.insert(hash, value);
            }
        }
    }

    /// Alias a native integer as a global, or as a class member
    pub fn global_link_integer(&mut self, class: Option<ObjHandle>, name: &str, field: IntegerLink) {
        self.bind(class, name, Value::LinkedInteger(field), false);
    }

    /// Alias a native decimal as a global, or as a class member
    pub fn global_link_decimal(&mut self, class: Option<ObjHandle>, name: &str, field: DecimalLink) {
        self.bind(class, name, Value::LinkedDecimal(field), false);
    }

    /// Bind an integer constant, or a class member
    pub fn global_const_integer(&mut self, class: Option<ObjHandle>, name: &str, value: i32) {
        self.bind(class, name, Value::Integer(value), true);
    }

    /// Bind a decimal constant, or a class member
    pub fn global_const_decimal(&mut self, class: Option<ObjHandle>, name: &str, value: f32) {
        self.bind(class, name, Value::Decimal(value), true);
    }

    // Collection

    /// Every root the collector must keep alive
    pub fn roots(&self, threads: &[VmThread]) -> RootSet {
        let mut roots = RootSet::new();
        for thread in threads {
            roots.values(&thread.stack);
            roots.objects(thread.frames.iter().map(|f| f.function));
            roots.value(&thread.register);
        }
        roots.values(self.globals.values());
        roots.values(self.constants.values());
        for &module in &self.modules {
            roots.object(module);
        }
        roots.objects(self.functions.iter().copied());
        roots.objects(self.classes.iter().copied());
        roots.objects(self.entity_base);
        roots.values(&self.extra_roots);
        roots
    }

    /// Collect if allocation has crossed the threshold
    pub fn request_garbage_collection(&mut self, threads: &[VmThread]) -> Option<CollectionReport> {
        if !self.heap.should_collect() {
            return None;
        }
        let before = self.heap.garbage_size();
        let report = self.force_garbage_collection(threads)?;
        log::debug!(
            "Freed garbage from {} to {} ({}), next GC at {}",
            before,
            self.heap.garbage_size(),
            report.freed_bytes,
            self.heap.next_gc()
        );
        Some(report)
    }

    /// Collect now; refused while more than one thread is active
    pub fn force_garbage_collection(&mut self, threads: &[VmThread]) -> Option<CollectionReport> {
        if self.active_threads > 1 {
            log::debug!(
                "Skipping collection with {} active threads",
                self.active_threads
            );
            return None;
        }
        let roots = self.roots(threads);
        Some(self.heap.collect(&roots))
    }

    /// Drop every script-created value and table.
    ///
    /// Non-class values are removed from globals and constants first and a
    /// collection runs with the threads reset; then every table is cleared
    /// and the remaining objects are reclaimed.
    pub fn dispose(&mut self, threads: &mut [VmThread]) {
        let heap = &self.heap;
        let keep = |v: &Value| {
            matches!(
                v.as_object().and_then(|h| heap.get(h)),
                Some(Obj::Class(_) | Obj::Function(_) | Obj::Native(_) | Obj::Module(_))
            )
        };
        self.globals.retain(|_, v| keep(v));
        self.constants.retain(|_, v| keep(v));
        self.classes.clear();

        for thread in threads.iter_mut() {
            thread.reset();
        }
        self.force_garbage_collection(threads);

        log::debug!("Freeing {} modules...", self.modules.len());
        self.modules.clear();
        self.functions.clear();
        self.globals.clear();
        self.constants.clear();
        self.tokens.clear();
        self.entity_base = None;
        self.extra_roots.clear();
        self.heap.collect(&RootSet::new());
    }
}
