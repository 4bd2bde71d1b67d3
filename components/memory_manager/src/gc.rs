//! Mark and sweep collection over the heap arena.
//!
//! Roots are gathered by the caller into a [`RootSet`]. Marking grays every
//! root, then blackens gray objects until none remain; sweeping frees every
//! slot left unmarked and clears the marks of survivors.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use core_types::{ObjHandle, Value};

use crate::heap::Heap;
use crate::object::{Obj, ObjKind};

/// Handles the collector must treat as reachable
#[derive(Debug, Clone, Default)]
pub struct RootSet {
    handles: Vec<ObjHandle>,
}

impl RootSet {
    /// Create an empty root set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value; non-object values are ignored
    pub fn value(&mut self, value: &Value) {
        if let Some(h) = value.as_object() {
            self.handles.push(h);
        }
    }

    /// Add several values
    pub fn values<'a>(&mut self, values: impl IntoIterator<Item = &'a Value>) {
        for value in values {
            self.value(value);
        }
    }

    /// Add a handle
    pub fn object(&mut self, handle: ObjHandle) {
        self.handles.push(handle);
    }

    /// Add several handles
    pub fn objects(&mut self, handles: impl IntoIterator<Item = ObjHandle>) {
        self.handles.extend(handles);
    }

    /// Number of root handles
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no roots were added
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Outcome of one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionReport {
    /// Objects freed
    pub freed: usize,
    /// Accounted bytes freed
    pub freed_bytes: usize,
    /// Objects surviving
    pub survivors: usize,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl Heap {
    fn gray(&mut self, handle: ObjHandle, gray: &mut Vec<ObjHandle>) {
        let Some(slot) = self.slots.get_mut(handle.index() as usize) else {
            return;
        };
        if slot.generation != handle.generation() || slot.obj.is_none() || slot.marked {
            return;
        }
        slot.marked = true;
        gray.push(handle);
    }

    /// Run a full collection.
    ///
    /// Every object not reachable from `roots` is freed. Afterwards the
    /// threshold becomes the surviving size plus the configured growth.
    /// Instances bound to a native object notify it on reclamation.
    pub fn collect(&mut self, roots: &RootSet) -> CollectionReport {
        let started = Instant::now();
        let mut gray = Vec::with_capacity(roots.len());
        for &handle in &roots.handles {
            self.gray(handle, &mut gray);
        }
        let gray_elapsed = started.elapsed();

        let started = Instant::now();
        let mut children = Vec::new();
        while let Some(handle) = gray.pop() {
            children.clear();
            if let Some(obj) = self.get(handle) {
                obj.trace(&mut children);
            }
            for &child in &children {
                self.gray(child, &mut gray);
            }
        }
        let blacken_elapsed = started.elapsed();

        let started = Instant::now();
        let mut counts: HashMap<ObjKind, (usize, usize)> = HashMap::new();
        let mut report = CollectionReport::default();
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            let Some(kind) = slot.obj.as_ref().map(Obj::kind) else {
                continue;
            };
            let entry = counts.entry(kind).or_default();
            entry.1 += 1;
            if slot.marked {
                slot.marked = false;
                report.survivors += 1;
                continue;
            }
            entry.0 += 1;

            let handle = ObjHandle::new(index as u32, slot.generation);
            let obj = self.free(handle);
            report.freed += 1;
            report.freed_bytes += obj.size();
            if let Obj::Instance(instance) = obj {
                if let Some(entity) = instance.entity {
                    entity.reclaimed();
                }
            }
        }
        let free_elapsed = started.elapsed();

        log::debug!("Sweep: Graying took {:.1} ms", millis(gray_elapsed));
        log::debug!("Sweep: Blackening took {:.1} ms", millis(blacken_elapsed));
        log::debug!("Sweep: Freeing took {:.1} ms", millis(free_elapsed));
        for kind in ObjKind::ALL {
            if let Some((freed, total)) = counts.get(&kind) {
                log::debug!("Freed {} {} objects out of {}.", freed, kind.name(), total);
            }
        }

        self.next_gc = self.garbage_size + self.gc_growth;
        self.stats.collections += 1;
        self.stats.last_freed = report.freed;
        self.stats.last_freed_bytes = report.freed_bytes;
        self.stats.total_freed += report.freed;
        report
    }
}
