//! Generational arena heap.
//!
//! Every live object occupies exactly one slot. Freeing a slot bumps its
//! generation, so handles taken before the free stop resolving even after
//! the slot is reused by a later allocation.

use core_types::{ObjHandle, Value};

use crate::object::{
    Obj, ObjArray, ObjBoundMethod, ObjClass, ObjFunction, ObjInstance, ObjKind, ObjMap,
    ObjModule, ObjNative, ObjString, ObjUpvalue,
};

/// Initial collection threshold in accounted bytes
pub const DEFAULT_GC_THRESHOLD: usize = 0x100000;

/// Bytes added to the live total to form the next threshold after a collection
pub const DEFAULT_GC_GROWTH: usize = 1024 * 1024;

#[derive(Debug, Default)]
pub(crate) struct Slot {
    pub(crate) generation: u32,
    pub(crate) marked: bool,
    pub(crate) obj: Option<Obj>,
}

/// Running collector statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Completed collections
    pub collections: usize,
    /// Objects freed by the most recent collection
    pub last_freed: usize,
    /// Bytes freed by the most recent collection
    pub last_freed_bytes: usize,
    /// Objects freed over the heap's lifetime
    pub total_freed: usize,
}

/// The object heap.
///
/// # Examples
///
/// ```
/// use memory_manager::Heap;
///
/// let mut heap = Heap::new();
/// let name = heap.new_string("Player");
///
/// assert_eq!(heap.string(name), Some("Player"));
/// assert_eq!(heap.len(), 1);
/// assert!(heap.garbage_size() > 0);
/// ```
#[derive(Debug)]
pub struct Heap {
    pub(crate) slots: Vec<Slot>,
    pub(crate) free_slots: Vec<u32>,
    pub(crate) live: usize,
    pub(crate) garbage_size: usize,
    pub(crate) next_gc: usize,
    pub(crate) gc_growth: usize,
    pub(crate) stats: GcStats,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! typed_accessors {
    ($($variant:ident => $ty:ty, $get:ident, $get_mut:ident;)*) => {
        $(
            #[doc = concat!("The `", stringify!($ty), "` behind a handle")]
            pub fn $get(&self, handle: ObjHandle) -> Option<&$ty> {
                match self.get(handle)? {
                    Obj::$variant(o) => Some(o),
                    _ => None,
                }
            }

            #[doc = concat!("Mutable `", stringify!($ty), "` behind a handle")]
            pub fn $get_mut(&mut self, handle: ObjHandle) -> Option<&mut $ty> {
                match self.get_mut(handle)? {
                    Obj::$variant(o) => Some(o),
                    _ => None,
                }
            }
        )*
    };
}

impl Heap {
    /// Create an empty heap with the default threshold and growth
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_GC_THRESHOLD, DEFAULT_GC_GROWTH)
    }

    /// Create an empty heap.
    ///
    /// # Arguments
    ///
    /// * `next_gc` - Accounted size above which a collection is requested
    /// * `gc_growth` - Headroom added to the live size after each collection
    pub fn with_threshold(next_gc: usize, gc_growth: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            live: 0,
            garbage_size: 0,
            next_gc,
            gc_growth,
            stats: GcStats::default(),
        }
    }

    /// Take ownership of an object and return its handle
    pub fn alloc(&mut self, obj: Obj) -> ObjHandle {
        self.garbage_size += obj.size();
        self.live += 1;

        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index as usize];
            slot.obj = Some(obj);
            slot.marked = false;
            return ObjHandle::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            marked: false,
            obj: Some(obj),
        });
        ObjHandle::new(index, 0)
    }

    /// Release an object and return it.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the accounted size would underflow;
    /// either means a native binding freed something it does not own.
    pub fn free(&mut self, handle: ObjHandle) -> Obj {
        let slot = self
            .slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation() && slot.obj.is_some());
        let Some(slot) = slot else {
            panic!("freeing stale handle {}", handle);
        };
        let obj = match slot.obj.take() {
            Some(obj) => obj,
            None => unreachable!(),
        };
        slot.generation = slot.generation.wrapping_add(1);
        slot.marked = false;
        self.free_slots.push(handle.index());
        self.live -= 1;

        let size = obj.size();
        assert!(
            self.garbage_size >= size,
            "garbage size underflow: freeing {} bytes with {} accounted",
            size,
            self.garbage_size
        );
        self.garbage_size -= size;
        obj
    }

    fn slot(&self, handle: ObjHandle) -> Option<&Slot> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
    }

    /// Whether a handle still resolves
    pub fn contains(&self, handle: ObjHandle) -> bool {
        self.get(handle).is_some()
    }

    /// The object behind a handle
    pub fn get(&self, handle: ObjHandle) -> Option<&Obj> {
        self.slot(handle)?.obj.as_ref()
    }

    /// Mutable object behind a handle
    pub fn get_mut(&mut self, handle: ObjHandle) -> Option<&mut Obj> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())?
            .obj
            .as_mut()
    }

    typed_accessors! {
        Function => ObjFunction, function, function_mut;
        Class => ObjClass, class, class_mut;
        Instance => ObjInstance, instance, instance_mut;
        Module => ObjModule, module, module_mut;
        Array => ObjArray, array, array_mut;
        Map => ObjMap, map, map_mut;
        BoundMethod => ObjBoundMethod, bound_method, bound_method_mut;
        Upvalue => ObjUpvalue, upvalue, upvalue_mut;
    }

    /// The characters of a string object
    pub fn string(&self, handle: ObjHandle) -> Option<&str> {
        match self.get(handle)? {
            Obj::String(s) => Some(&s.chars),
            _ => None,
        }
    }

    /// The native behind a handle
    pub fn native(&self, handle: ObjHandle) -> Option<ObjNative> {
        match self.get(handle)? {
            Obj::Native(n) => Some(*n),
            _ => None,
        }
    }

    /// Allocate a string
    pub fn new_string(&mut self, chars: &str) -> ObjHandle {
        self.alloc(Obj::String(ObjString {
            chars: chars.into(),
        }))
    }

    /// Allocate a string and wrap it in a value
    pub fn string_value(&mut self, chars: &str) -> Value {
        Value::Object(self.new_string(chars))
    }

    /// Kind of the object a value refers to
    pub fn kind_of(&self, value: &Value) -> Option<ObjKind> {
        self.get(value.as_object()?).map(Obj::kind)
    }

    /// Whether a value refers to an object of the given kind
    pub fn is_kind(&self, value: &Value, kind: ObjKind) -> bool {
        self.kind_of(value) == Some(kind)
    }

    /// String contents of a value, if it is a string
    pub fn str_of(&self, value: &Value) -> Option<&str> {
        self.string(value.as_object()?)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no objects are live
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Sum of the accounted sizes of all live objects
    pub fn garbage_size(&self) -> usize {
        self.garbage_size
    }

    /// Current collection threshold
    pub fn next_gc(&self) -> usize {
        self.next_gc
    }

    /// Override the collection threshold
    pub fn set_next_gc(&mut self, next_gc: usize) {
        self.next_gc = next_gc;
    }

    /// Headroom added after each collection
    pub fn gc_growth(&self) -> usize {
        self.gc_growth
    }

    /// Whether allocation pressure has crossed the threshold
    pub fn should_collect(&self) -> bool {
        self.garbage_size > self.next_gc
    }

    /// Collector statistics
    pub fn stats(&self) -> GcStats {
        self.stats
    }

    /// Iterate over live objects
    pub fn iter(&self) -> impl Iterator<Item = (ObjHandle, &Obj)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.obj
                .as_ref()
                .map(|obj| (ObjHandle::new(i as u32, slot.generation), obj))
        })
    }
}
