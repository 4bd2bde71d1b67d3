//! Script and class loading.
//!
//! The [`ClassLoader`] owns the bytecode source, the cache of loaded files
//! and the set of classes whose native binding has run. It is also the
//! runtime's import hook, so `OP_IMPORT` loads classes the same way the host
//! does. Its tables sit behind their own lock, which is never held while
//! bytecode executes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use core_types::{hash_name, ObjHandle, VmError, VmResult};
use interpreter::{entry_function, read_module, ImportHook, Runtime, VmThread};
use memory_manager::ClassKind;
use parking_lot::Mutex;

use crate::error::RegistryResult;
use crate::source::BytecodeSource;

/// Native binding run once for each class a script defines
pub trait ClassBinder: Send + Sync {
    /// Bind natives and linked values onto a freshly loaded class
    fn bind_class(&self, runtime: &mut Runtime, class: ObjHandle, name: &str);
}

struct LoaderTables {
    source: Box<dyn BytecodeSource>,
    sources: HashMap<u32, Arc<[u8]>>,
    classes: HashSet<u32>,
    binder: Option<Arc<dyn ClassBinder>>,
}

/// Loads scripts and classes from a [`BytecodeSource`]
pub struct ClassLoader {
    tables: Mutex<LoaderTables>,
}

enum Fetched {
    Cached,
    Absent,
    Fresh(Arc<[u8]>),
}

impl ClassLoader {
    /// Create a loader over `source`
    pub fn new(source: Box<dyn BytecodeSource>) -> Self {
        Self {
            tables: Mutex::new(LoaderTables {
                source,
                sources: HashMap::new(),
                classes: HashSet::new(),
                binder: None,
            }),
        }
    }

    /// Install the native binding run for each new class
    pub fn set_binder(&self, binder: Arc<dyn ClassBinder>) {
        self.tables.lock().binder = Some(binder);
    }

    /// Whether a file has been loaded
    pub fn is_loaded(&self, file_hash: u32) -> bool {
        self.tables.lock().sources.contains_key(&file_hash)
    }

    /// Whether the class map knows a class
    pub fn class_exists(&self, name: &str) -> bool {
        self.tables.lock().source.class_map().contains(hash_name(name))
    }

    /// Every file named by the class map, in map order
    pub fn mapped_files(&self) -> Vec<u32> {
        let tables = self.tables.lock();
        let mut files = Vec::new();
        for entry in tables.source.class_map().entries() {
            for &file in &entry.files {
                if !files.contains(&file) {
                    files.push(file);
                }
            }
        }
        files
    }

    /// Forget every loaded file and bound class
    pub fn clear(&self) {
        let mut tables = self.tables.lock();
        tables.sources.clear();
        tables.classes.clear();
    }

    fn fetch(&self, file_hash: u32) -> RegistryResult<Fetched> {
        let mut tables = self.tables.lock();
        if tables.sources.contains_key(&file_hash) {
            return Ok(Fetched::Cached);
        }
        let Some(bytes) = tables.source.fetch(file_hash)? else {
            return Ok(Fetched::Absent);
        };
        // Recorded before it runs, so an import cycle cannot load it twice
        let bytes: Arc<[u8]> = Arc::from(bytes);
        tables.sources.insert(file_hash, bytes.clone());
        Ok(Fetched::Fresh(bytes))
    }

    /// Load a file and run its entry function, unless already loaded.
    ///
    /// Returns `Ok(false)` when the source has no such file.
    pub fn load_script(
        &self,
        runtime: &mut Runtime,
        thread: &mut VmThread,
        file_hash: u32,
    ) -> RegistryResult<bool> {
        match self.fetch(file_hash)? {
            Fetched::Cached => Ok(true),
            Fetched::Absent => {
                log::warn!("Script {:08X} does not exist!", file_hash);
                Ok(false)
            }
            Fetched::Fresh(bytes) => {
                run_file(runtime, thread, &bytes, file_hash)?;
                Ok(true)
            }
        }
    }

    /// Load every file of class `name`, then bind it once.
    ///
    /// Returns `Ok(false)` when the class is not mapped, one of its files is
    /// missing, or loading did not define it.
    pub fn load_object_class(
        &self,
        runtime: &mut Runtime,
        thread: &mut VmThread,
        name: &str,
    ) -> RegistryResult<bool> {
        if name.is_empty() {
            return Ok(false);
        }
        let class_hash = hash_name(name);
        let files = {
            let tables = self.tables.lock();
            tables.source.class_files(class_hash).map(<[u32]>::to_vec)
        };
        let Some(files) = files else {
            log::warn!(
                "Could not find classmap for {}! (Hash: 0x{:08X})",
                name,
                class_hash
            );
            return Ok(false);
        };

        for (index, &file_hash) in files.iter().enumerate() {
            match self.fetch(file_hash)? {
                Fetched::Cached => {}
                Fetched::Absent => {
                    log::warn!("Object \"{}\" does not exist!", name);
                    return Ok(false);
                }
                Fetched::Fresh(bytes) => {
                    if index == 0 {
                        log::debug!(
                            "Loading the object {} class, {} filenames...",
                            name,
                            files.len()
                        );
                    }
                    run_file(runtime, thread, &bytes, file_hash)?;
                }
            }
        }

        self.bind(runtime, name, class_hash)
    }

    fn bind(&self, runtime: &mut Runtime, name: &str, class_hash: u32) -> RegistryResult<bool> {
        let binder = {
            let mut tables = self.tables.lock();
            if !tables.classes.insert(class_hash) {
                return Ok(true);
            }
            tables.binder.clone()
        };

        let Some(class) = runtime.class_by_hash(class_hash) else {
            log::error!("Could not find class of {}", name);
            self.tables.lock().classes.remove(&class_hash);
            return Ok(false);
        };
        runtime.classes.push(class);

        let extended = runtime
            .heap
            .class(class)
            .is_some_and(|c| c.kind == ClassKind::Extended);
        if let Some(binder) = binder {
            if !extended && !runtime.is_standard_library_class(name) {
                log::trace!("Setting native functions for class {}...", name);
                binder.bind_class(runtime, class, name);
            }
        }
        Ok(true)
    }
}

/// Bind a container as a module and run its entry function once
pub(crate) fn run_file(
    runtime: &mut Runtime,
    thread: &mut VmThread,
    bytes: &[u8],
    file_hash: u32,
) -> RegistryResult<()> {
    let module = read_module(runtime, bytes, file_hash)?;
    if let Some(entry) = entry_function(runtime, module) {
        thread.run_function(runtime, entry, &[])?;
    }
    Ok(())
}

impl ImportHook for ClassLoader {
    fn import_class(
        &self,
        runtime: &mut Runtime,
        thread: &mut VmThread,
        name: &str,
    ) -> VmResult<bool> {
        match self.load_object_class(runtime, thread, name) {
            Ok(loaded) => Ok(loaded),
            Err(crate::RegistryError::Vm(error)) => Err(error),
            Err(error) => Err(VmError::fatal(error.to_string())),
        }
    }
}
