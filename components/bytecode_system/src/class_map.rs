//! `HMAP` class map: which compiled files contribute to each class
//!
//! A class may be split over several source files; the map lists the
//! filename hashes of every file that must be loaded for it.

use crate::container::{ContainerError, Reader};

/// Class map magic
pub const HMAP_MAGIC: [u8; 4] = *b"HMAP";
const HMAP_VERSION: [u8; 4] = [0x00, 0x01, 0x02, 0x03];

/// Files contributing to one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// Hash of the class name
    pub class_hash: u32,
    /// Filename hashes, in load order
    pub files: Vec<u32>,
}

/// Class-name-hash to file-hash list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMap {
    entries: Vec<ClassEntry>,
}

impl ClassMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `file_hash` contributes to `class_hash`
    pub fn insert(&mut self, class_hash: u32, file_hash: u32) {
        match self.entries.iter_mut().find(|e| e.class_hash == class_hash) {
            Some(entry) => {
                if !entry.files.contains(&file_hash) {
                    entry.files.push(file_hash);
                }
            }
            None => self.entries.push(ClassEntry {
                class_hash,
                files: vec![file_hash],
            }),
        }
    }

    /// Files for a class, if it is mapped
    pub fn files_for(&self, class_hash: u32) -> Option<&[u32]> {
        self.entries
            .iter()
            .find(|e| e.class_hash == class_hash)
            .map(|e| e.files.as_slice())
    }

    /// Whether the class is mapped
    pub fn contains(&self, class_hash: u32) -> bool {
        self.files_for(class_hash).is_some()
    }

    /// All entries
    pub fn entries(&self) -> &[ClassEntry] {
        &self.entries
    }

    /// Number of mapped classes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no class is mapped
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse an `HMAP` file
    pub fn read(bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut reader = Reader::new(bytes);
        if reader.bytes(4)? != HMAP_MAGIC {
            return Err(ContainerError::BadMagic);
        }
        reader.skip(4)?;

        let count = reader.u32()?;
        let mut map = ClassMap::new();
        for _ in 0..count {
            let class_hash = reader.u32()?;
            let file_count = reader.u32()?;
            let mut files = Vec::new();
            for _ in 0..file_count {
                files.push(reader.u32()?);
            }
            map.entries.push(ClassEntry { class_hash, files });
        }
        Ok(map)
    }

    /// Serialize to `HMAP` bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&HMAP_MAGIC);
        out.extend_from_slice(&HMAP_VERSION);
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for entry in &self.entries {
            out.extend_from_slice(&entry.class_hash.to_le_bytes());
            out.extend_from_slice(&(entry.files.len() as u32).to_le_bytes());
            for file in &entry.files {
                out.extend_from_slice(&file.to_le_bytes());
            }
        }
        out
    }
}
