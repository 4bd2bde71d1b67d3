//! Generational handles into the object heap.

use std::fmt;

/// Non-owning reference to a heap object.
///
/// A handle pairs a slot index with the generation the slot had when the
/// object was allocated. Once the object is swept the slot's generation is
/// bumped, so stale handles stop resolving even if the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjHandle {
    index: u32,
    generation: u32,
}

impl ObjHandle {
    /// Create a handle from its raw parts
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the heap arena
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot at allocation time
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}
