//! The script registry.
//!
//! A [`ScriptRegistry`] owns one [`Runtime`], the interpreter thread pool and
//! the class loader. Shared state sits behind a single lock; with one thread
//! (the default) the lock is never contended, and `&mut self` access skips it
//! entirely.

use std::path::Path;
use std::sync::Arc;

use core_types::{filename_hash, hash_name, ObjHandle, Value, VmResult};
use interpreter::{Debugger, NativeEntity, Runtime, VmThread};
use memory_manager::{CollectionReport, GcStats, Heap, NativeFn, ObjKind};
use parking_lot::{Mutex, MutexGuard};

use crate::config::RuntimeConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::loader::{run_file, ClassBinder, ClassLoader};
use crate::source::{BytecodeSource, DirectorySource};

/// Runtime and threads guarded by the registry lock
#[derive(Debug)]
pub struct RegistryState {
    /// Heap and script tables
    pub runtime: Runtime,
    /// Interpreter thread pool; thread 0 runs loads and host calls
    pub threads: Vec<VmThread>,
}

impl RegistryState {
    fn main(&mut self) -> (&mut Runtime, &mut VmThread) {
        let Self { runtime, threads } = self;
        (runtime, &mut threads[0])
    }

    /// Thread by id
    pub fn thread_mut(&mut self, id: usize) -> Option<&mut VmThread> {
        self.threads.get_mut(id)
    }
}

/// Process-wide script state and the operations the host drives it with
pub struct ScriptRegistry {
    state: Mutex<RegistryState>,
    loader: Arc<ClassLoader>,
    config: RuntimeConfig,
}

impl std::fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScriptRegistry {
    /// Create a registry reading bytecode from `source`
    pub fn new(config: RuntimeConfig, source: impl BytecodeSource + 'static) -> Self {
        let loader = Arc::new(ClassLoader::new(Box::new(source)));

        let heap = Heap::with_threshold(config.initial_gc_threshold, config.gc_growth);
        let mut runtime = Runtime::with_heap(heap);
        runtime.active_threads = config.thread_count();
        runtime.set_import_hook(loader.clone());

        let threads = (0..config.thread_count())
            .map(|id| {
                let mut thread = VmThread::new(id);
                thread.set_debug(config.debug);
                thread
            })
            .collect();

        log::debug!(
            "Created script registry with {} thread(s)",
            config.thread_count()
        );
        Self {
            state: Mutex::new(RegistryState { runtime, threads }),
            loader,
            config,
        }
    }

    /// Create a registry over a bytecode directory
    pub fn with_directory(config: RuntimeConfig, root: impl AsRef<Path>) -> RegistryResult<Self> {
        let source = DirectorySource::open(root.as_ref())?;
        Ok(Self::new(config, source))
    }

    /// Active configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Take the registry lock
    pub fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock()
    }

    /// Exclusive access without locking
    pub fn state_mut(&mut self) -> &mut RegistryState {
        self.state.get_mut()
    }

    /// Run `f` against the runtime, for native binding
    pub fn with_runtime<R>(&self, f: impl FnOnce(&mut Runtime) -> R) -> R {
        f(&mut self.lock().runtime)
    }

    /// Install the native binding run once per loaded class
    pub fn set_class_binder(&self, binder: Arc<dyn ClassBinder>) {
        self.loader.set_binder(binder);
    }

    fn safe_point(&self, state: &mut RegistryState) {
        if self.config.auto_gc {
            let RegistryState { runtime, threads } = state;
            runtime.request_garbage_collection(threads);
        }
    }

    // Loading

    /// Whether the class map names a class
    pub fn class_exists(&self, name: &str) -> bool {
        self.loader.class_exists(name)
    }

    /// Whether a file has been loaded
    pub fn is_loaded(&self, file_hash: u32) -> bool {
        self.loader.is_loaded(file_hash)
    }

    /// Load and run a script once; later calls with the same hash do nothing
    pub fn load_script(&self, file_hash: u32) -> bool {
        let mut state = self.lock();
        let (runtime, thread) = state.main();
        let loaded = match self.loader.load_script(runtime, thread, file_hash) {
            Ok(loaded) => loaded,
            Err(error) => {
                log::error!("Failed to load script {:08X}: {}", file_hash, error);
                false
            }
        };
        self.safe_point(&mut state);
        loaded
    }

    /// [`load_script`](Self::load_script) by filename; the extension is ignored
    pub fn load_script_named(&self, filename: &str) -> bool {
        self.load_script(filename_hash(filename))
    }

    /// Load every file of a class and run its native binding once
    pub fn load_object_class(&self, name: &str) -> bool {
        let mut state = self.lock();
        let (runtime, thread) = state.main();
        let loaded = match self.loader.load_object_class(runtime, thread, name) {
            Ok(loaded) => loaded,
            Err(error) => {
                log::error!("Failed to load class {}: {}", name, error);
                false
            }
        };
        self.safe_point(&mut state);
        loaded
    }

    /// Load every file the class map names, then collect.
    ///
    /// Returns the number of files that loaded.
    pub fn load_classes(&self) -> usize {
        let mut state = self.lock();
        let mut count = 0;
        for file_hash in self.loader.mapped_files() {
            let (runtime, thread) = state.main();
            match self.loader.load_script(runtime, thread, file_hash) {
                Ok(true) => count += 1,
                Ok(false) => log::warn!("Class {:08X} does not exist!", file_hash),
                Err(error) => log::error!("Failed to load {:08X}: {}", file_hash, error),
            }
        }
        let RegistryState { runtime, threads } = &mut *state;
        runtime.force_garbage_collection(threads);
        count
    }

    /// Load a container and run its entry function on thread 0
    pub fn run_bytecode(&self, bytes: &[u8], file_hash: u32) -> RegistryResult<()> {
        let mut state = self.lock();
        let (runtime, thread) = state.main();
        let result = run_file(runtime, thread, bytes, file_hash);
        self.safe_point(&mut state);
        result
    }

    // Calls

    /// Call a global function with no arguments.
    ///
    /// Returns `false` when the global is missing, is not callable, or the
    /// call failed.
    pub fn call_function(&self, name: &str) -> bool {
        let mut state = self.lock();
        let (runtime, thread) = state.main();
        let Some(callee) = runtime.global(name) else {
            return false;
        };
        let callable = matches!(
            runtime.heap.kind_of(&callee),
            Some(ObjKind::Function | ObjKind::Native | ObjKind::BoundMethod)
        );
        if !callable {
            return false;
        }
        let ok = thread.run_value(runtime, callee, &[]).is_ok();
        self.safe_point(&mut state);
        ok
    }

    /// Spawn an entity of class `class_name` bound to `native`.
    ///
    /// The entity stays rooted until [`unlink_entity`](Self::unlink_entity).
    pub fn spawn_entity<E: NativeEntity>(
        &self,
        class_name: &str,
        native: Arc<E>,
    ) -> RegistryResult<ObjHandle> {
        let mut state = self.lock();
        let (runtime, thread) = state.main();
        let class = runtime
            .class_by_name(class_name)
            .ok_or_else(|| RegistryError::UnknownClass(class_name.to_string()))?;
        let entity = interpreter::spawn_entity(runtime, thread, class, native)?;
        runtime.extra_roots.push(Value::Object(entity));
        Ok(entity)
    }

    /// Copy an entity onto a new native object
    pub fn clone_entity<E: NativeEntity>(
        &self,
        source: ObjHandle,
        native: Arc<E>,
    ) -> RegistryResult<ObjHandle> {
        let mut state = self.lock();
        let runtime = &mut state.runtime;
        let clone = interpreter::clone_entity(runtime, source, native)?;
        runtime.extra_roots.push(Value::Object(clone));
        Ok(clone)
    }

    /// Detach an entity from its native object and stop rooting it
    pub fn unlink_entity(&self, entity: ObjHandle) {
        let mut state = self.lock();
        let runtime = &mut state.runtime;
        interpreter::unlink_entity(runtime, entity);
        runtime
            .extra_roots
            .retain(|v| v.as_object() != Some(entity));
    }

    /// Run a lifecycle event on an entity.
    ///
    /// Recoverable script errors are logged and reported as `Ok(false)`, as
    /// is a missing event; fatal errors are returned.
    pub fn run_event(
        &self,
        entity: ObjHandle,
        event: &str,
        args: &[Value],
    ) -> RegistryResult<bool> {
        let mut state = self.lock();
        let (runtime, thread) = state.main();
        let result = interpreter::run_event(runtime, thread, entity, hash_name(event), args);
        self.safe_point(&mut state);
        protect(result, false)
    }

    /// Run an event, calling `default` directly unless script overrides it
    pub fn invoke_with_default(
        &self,
        entity: ObjHandle,
        event: &str,
        default: NativeFn,
        args: &[Value],
    ) -> RegistryResult<Value> {
        let mut state = self.lock();
        let (runtime, thread) = state.main();
        let result = interpreter::invoke_with_default(
            runtime,
            thread,
            entity,
            hash_name(event),
            default,
            args,
        );
        self.safe_point(&mut state);
        protect(result, Value::Null)
    }

    // Collection

    /// Collect if allocation has crossed the threshold
    pub fn request_garbage_collection(&self) -> Option<CollectionReport> {
        let mut state = self.lock();
        let RegistryState { runtime, threads } = &mut *state;
        runtime.request_garbage_collection(threads)
    }

    /// Collect now; a no-op with more than one thread
    pub fn force_garbage_collection(&self) -> Option<CollectionReport> {
        let mut state = self.lock();
        let RegistryState { runtime, threads } = &mut *state;
        runtime.force_garbage_collection(threads)
    }

    /// Collector statistics
    pub fn gc_stats(&self) -> GcStats {
        self.lock().runtime.heap.stats()
    }

    /// Accounted size of live objects
    pub fn garbage_size(&self) -> usize {
        self.lock().runtime.heap.garbage_size()
    }

    /// Drop every loaded script, class and value.
    ///
    /// The registry can load scripts again afterwards.
    pub fn dispose(&self) {
        let mut state = self.lock();
        let RegistryState { runtime, threads } = &mut *state;
        runtime.dispose(threads);
        self.loader.clear();
        log::debug!("Disposed script registry");
    }

    // Debugging

    /// Install a debugger on a thread. Returns `false` for an unknown thread.
    pub fn set_debugger(&self, thread: usize, debugger: Box<dyn Debugger>) -> bool {
        match self.lock().thread_mut(thread) {
            Some(t) => {
                t.set_debugger(debugger);
                true
            }
            None => false,
        }
    }

    /// Set a breakpoint on a thread. Returns `false` for an unknown thread.
    pub fn add_breakpoint(&self, thread: usize, function: ObjHandle, offset: usize) -> bool {
        match self.lock().thread_mut(thread) {
            Some(t) => {
                t.add_breakpoint(function, offset);
                true
            }
            None => false,
        }
    }
}

fn protect<T>(result: VmResult<T>, fallback: T) -> RegistryResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(error) if error.is_fatal() => Err(error.into()),
        Err(error) => {
            log::warn!("Event failed: {}", error);
            Ok(fallback)
        }
    }
}
