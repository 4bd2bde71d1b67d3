//! Memory Manager - heap objects and garbage collection
//!
//! This component provides:
//! - The closed set of heap object kinds ([`Obj`])
//! - A generational arena [`Heap`] with per-kind byte accounting
//! - Mark and sweep collection from a caller-supplied [`RootSet`]
//! - Value operations that need to look inside objects (loose equality,
//!   string casts, printing, `typeof`)
//!
//! # Examples
//!
//! ```
//! use memory_manager::{Heap, Obj, ObjArray, RootSet};
//!
//! let mut heap = Heap::new();
//! let kept = heap.alloc(Obj::Array(ObjArray::default()));
//! heap.new_string("unreachable");
//!
//! let mut roots = RootSet::new();
//! roots.object(kept);
//! let report = heap.collect(&roots);
//!
//! assert_eq!(report.freed, 1);
//! assert!(heap.contains(kept));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod gc;
pub mod heap;
pub mod object;
pub mod value_ops;

pub use gc::{CollectionReport, RootSet};
pub use heap::{GcStats, Heap, DEFAULT_GC_GROWTH, DEFAULT_GC_THRESHOLD};
pub use object::{
    ClassKind, HostObject, NativeFn, Obj, ObjArray, ObjBoundMethod, ObjClass, ObjFunction,
    ObjInstance, ObjKind, ObjMap, ObjModule, ObjNative, ObjString, ObjUpvalue,
};
pub use value_ops::{
    cast_as_string, concatenate, format_value, sorta_equal, type_name, type_of, write_value,
};
