//! Where compiled bytecode comes from.
//!
//! A [`BytecodeSource`] hands out raw containers by filename hash and the
//! class map saying which files make up each class. Fetches complete before
//! anything executes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytecode_system::ClassMap;
use core_types::{filename_hash, hash_name};

use crate::error::{RegistryError, RegistryResult};

/// Class map filename inside a directory source
pub const CLASS_MAP_FILENAME: &str = "Objects.hcm";

/// Provider of compiled bytecode
pub trait BytecodeSource: Send + Sync {
    /// Container bytes for a filename hash, `None` when no such file exists
    fn fetch(&self, file_hash: u32) -> RegistryResult<Option<Vec<u8>>>;

    /// Class name hash to file hash map
    fn class_map(&self) -> &ClassMap;

    /// Files contributing to a class
    fn class_files(&self, class_hash: u32) -> Option<&[u32]> {
        self.class_map().files_for(class_hash)
    }
}

/// Bytecode held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<u32, Vec<u8>>,
    class_map: ClassMap,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file under its filename hash
    pub fn insert(&mut self, file_hash: u32, bytes: Vec<u8>) {
        self.files.insert(file_hash, bytes);
    }

    /// Add a file under the hash of `filename`
    pub fn insert_named(&mut self, filename: &str, bytes: Vec<u8>) -> u32 {
        let hash = filename_hash(filename);
        self.insert(hash, bytes);
        hash
    }

    /// Record that `file_hash` contributes to class `name`
    pub fn map_class(&mut self, name: &str, file_hash: u32) {
        self.class_map.insert(hash_name(name), file_hash);
    }

    /// Add a file and map it to class `name`
    pub fn with_class(mut self, name: &str, file_hash: u32, bytes: Vec<u8>) -> Self {
        self.insert(file_hash, bytes);
        self.map_class(name, file_hash);
        self
    }
}

impl BytecodeSource for MemorySource {
    fn fetch(&self, file_hash: u32) -> RegistryResult<Option<Vec<u8>>> {
        Ok(self.files.get(&file_hash).cloned())
    }

    fn class_map(&self) -> &ClassMap {
        &self.class_map
    }
}

/// Bytecode files in a directory.
///
/// Files are named `<HASH>.ibc` with the hash in uppercase hex; the class
/// map, when present, is `Objects.hcm`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    class_map: ClassMap,
}

impl DirectorySource {
    /// Open a directory and read its class map
    pub fn open(root: impl Into<PathBuf>) -> RegistryResult<Self> {
        let root = root.into();
        let map_path = root.join(CLASS_MAP_FILENAME);
        let class_map = if map_path.is_file() {
            let bytes = std::fs::read(&map_path).map_err(|e| RegistryError::io(&map_path, e))?;
            ClassMap::read(&bytes)?
        } else {
            log::debug!("No class map in {}", root.display());
            ClassMap::new()
        };
        Ok(Self { root, class_map })
    }

    /// Directory being read
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file for a filename hash
    pub fn path_for(&self, file_hash: u32) -> PathBuf {
        self.root.join(format!("{:08X}.ibc", file_hash))
    }
}

impl BytecodeSource for DirectorySource {
    fn fetch(&self, file_hash: u32) -> RegistryResult<Option<Vec<u8>>> {
        let path = self.path_for(file_hash);
        if !path.is_file() {
            return Ok(None);
        }
        std::fs::read(&path)
            .map(Some)
            .map_err(|e| RegistryError::io(path, e))
    }

    fn class_map(&self) -> &ClassMap {
        &self.class_map
    }
}
