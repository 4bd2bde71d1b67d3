//! Heap object kinds
//!
//! Containers hold [`ObjHandle`]s and [`Value`]s; they never own the objects
//! those refer to. The heap alone owns storage and reclaims by reachability.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::mem::size_of;
use std::sync::Arc;

use core_types::{ObjHandle, Value, VmResult};

use crate::heap::Heap;

/// Native function signature.
///
/// Natives receive their arguments (the receiver first when invoked as a
/// method) and return the value that replaces callee and arguments.
pub type NativeFn = fn(&mut Heap, &[Value]) -> VmResult<Value>;

/// Object kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjKind {
    /// Immutable string
    String,
    /// Compiled function
    Function,
    /// Class
    Class,
    /// Instance or entity
    Instance,
    /// Loaded module
    Module,
    /// Growable array
    Array,
    /// String-keyed map
    Map,
    /// Native function
    Native,
    /// Method bound to a receiver
    BoundMethod,
    /// Closed-over value
    Upvalue,
}

impl ObjKind {
    /// Every kind, in log order
    pub const ALL: [ObjKind; 10] = [
        ObjKind::BoundMethod,
        ObjKind::Class,
        ObjKind::Function,
        ObjKind::Instance,
        ObjKind::Array,
        ObjKind::Map,
        ObjKind::Native,
        ObjKind::String,
        ObjKind::Upvalue,
        ObjKind::Module,
    ];

    /// Fixed number of bytes accounted for one object of this kind
    pub fn size(self) -> usize {
        match self {
            ObjKind::String => size_of::<ObjString>(),
            ObjKind::Function => size_of::<ObjFunction>(),
            ObjKind::Class => size_of::<ObjClass>(),
            ObjKind::Instance => size_of::<ObjInstance>(),
            ObjKind::Module => size_of::<ObjModule>(),
            ObjKind::Array => size_of::<ObjArray>(),
            ObjKind::Map => size_of::<ObjMap>(),
            ObjKind::Native => size_of::<ObjNative>(),
            ObjKind::BoundMethod => size_of::<ObjBoundMethod>(),
            ObjKind::Upvalue => size_of::<ObjUpvalue>(),
        }
    }

    /// `OBJ_*` name used in collector logs
    pub fn name(self) -> &'static str {
        match self {
            ObjKind::String => "OBJ_STRING",
            ObjKind::Function => "OBJ_FUNCTION",
            ObjKind::Class => "OBJ_CLASS",
            ObjKind::Instance => "OBJ_INSTANCE",
            ObjKind::Module => "OBJ_MODULE",
            ObjKind::Array => "OBJ_ARRAY",
            ObjKind::Map => "OBJ_MAP",
            ObjKind::Native => "OBJ_NATIVE",
            ObjKind::BoundMethod => "OBJ_BOUND_METHOD",
            ObjKind::Upvalue => "OBJ_UPVALUE",
        }
    }

    /// Name used in runtime error messages
    pub fn type_name(self) -> &'static str {
        match self {
            ObjKind::String => "String",
            ObjKind::Function => "Function",
            ObjKind::Class => "Class",
            ObjKind::Instance => "Instance",
            ObjKind::Module => "Module",
            ObjKind::Array => "Array",
            ObjKind::Map => "Map",
            ObjKind::Native => "Native",
            ObjKind::BoundMethod => "Bound Method",
            ObjKind::Upvalue => "Upvalue",
        }
    }
}

/// Immutable string
#[derive(Debug, Clone)]
pub struct ObjString {
    /// Contents
    pub chars: Box<str>,
}

/// A compiled function
#[derive(Debug, Clone)]
pub struct ObjFunction {
    /// Exact number of arguments
    pub arity: i32,
    /// Minimum number of arguments
    pub min_arity: i32,
    /// Hash of the function's name
    pub name_hash: u32,
    /// Name string, when a token is known
    pub name: Option<ObjHandle>,
    /// Owning class name, once bound as a method
    pub class_name: Option<ObjHandle>,
    /// Source filename attribution
    pub source_filename: Option<ObjHandle>,
    /// Owning module
    pub module: Option<ObjHandle>,
    /// Instruction bytes
    pub code: Arc<[u8]>,
    /// Per-byte line table
    pub lines: Option<Arc<[i32]>>,
    /// Materialised constant pool
    pub constants: Vec<Value>,
}

impl ObjFunction {
    /// Create a function with the given code and no debug data
    pub fn new(arity: i32, name_hash: u32, code: impl Into<Arc<[u8]>>) -> Self {
        Self {
            arity,
            min_arity: arity,
            name_hash,
            name: None,
            class_name: None,
            source_filename: None,
            module: None,
            code: code.into(),
            lines: None,
            constants: Vec::new(),
        }
    }

    /// Source line at a code offset
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        let lines = self.lines.as_ref()?;
        lines.get(offset).map(|l| (l & 0xFFFF) as u32)
    }
}

/// Normal class or extension of an existing class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassKind {
    /// Ordinary class definition
    #[default]
    Normal,
    /// Adds methods to an already defined class
    Extended,
}

/// A class
#[derive(Debug, Clone, Default)]
pub struct ObjClass {
    /// Name string
    pub name: Option<ObjHandle>,
    /// Stable name hash
    pub hash: u32,
    /// Methods (functions, natives, linked or constant values)
    pub methods: HashMap<u32, Value>,
    /// Class-level fields; shadow same-hash methods
    pub fields: HashMap<u32, Value>,
    /// Cached initializer
    pub initializer: Option<Value>,
    /// Definition kind
    pub kind: ClassKind,
    /// Declared parent, resolved lazily
    pub parent_hash: Option<u32>,
    /// Resolved parent
    pub parent: Option<ObjHandle>,
    /// Instances are bound to native entities; lookups fall through to the
    /// native entity base class
    pub entity_bound: bool,
}

impl ObjClass {
    /// Create an empty class
    pub fn new(hash: u32) -> Self {
        Self {
            hash,
            ..Self::default()
        }
    }

    /// Parent hash is declared but not yet resolved
    pub fn parent_pending(&self) -> bool {
        self.parent_hash.is_some() && self.parent.is_none()
    }
}

/// A live native object an instance is bound to
pub trait HostObject: Any + Send + Sync {
    /// Called once when the collector reclaims the bound instance
    fn reclaimed(&self) {}
}

/// An instance; an entity when bound to a native object
#[derive(Clone)]
pub struct ObjInstance {
    /// Class
    pub class: ObjHandle,
    /// Script fields and linked native fields
    pub fields: HashMap<u32, Value>,
    /// Bound native object
    pub entity: Option<Arc<dyn HostObject>>,
}

impl ObjInstance {
    /// Create an instance with no fields
    pub fn new(class: ObjHandle) -> Self {
        Self {
            class,
            fields: HashMap::new(),
            entity: None,
        }
    }

    /// Whether a native object is bound
    pub fn is_entity(&self) -> bool {
        self.entity.is_some()
    }
}

impl fmt::Debug for ObjInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjInstance")
            .field("class", &self.class)
            .field("fields", &self.fields)
            .field("entity", &self.entity.is_some())
            .finish()
    }
}

/// A loaded module
#[derive(Debug, Clone, Default)]
pub struct ObjModule {
    /// Functions, entry first
    pub functions: Vec<ObjHandle>,
    /// Module-level locals
    pub locals: Vec<Value>,
    /// Source filename
    pub source_filename: Option<ObjHandle>,
}

/// A growable array
#[derive(Debug, Clone, Default)]
pub struct ObjArray {
    /// Elements
    pub values: Vec<Value>,
}

/// A string-keyed map; entries are keyed by the hash of the key
#[derive(Debug, Clone, Default)]
pub struct ObjMap {
    /// Values by key hash
    pub values: HashMap<u32, Value>,
    /// Key strings by key hash
    pub keys: HashMap<u32, String>,
}

impl ObjMap {
    /// Insert or replace an entry
    pub fn put(&mut self, key: &str, value: Value) {
        let hash = core_types::hash_name(key);
        self.values.insert(hash, value);
        self.keys.insert(hash, key.to_string());
    }

    /// Look up an entry
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&core_types::hash_name(key))
    }
}

/// A native function
#[derive(Clone, Copy)]
pub struct ObjNative {
    /// Entry point
    pub function: NativeFn,
}

impl ObjNative {
    /// Whether this native is exactly `function`
    pub fn is(&self, function: NativeFn) -> bool {
        self.function as usize == function as usize
    }
}

impl fmt::Debug for ObjNative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjNative({:#x})", self.function as usize)
    }
}

/// A method bound to its receiver
#[derive(Debug, Clone)]
pub struct ObjBoundMethod {
    /// Receiver placed in slot zero
    pub receiver: Value,
    /// Function to run
    pub method: ObjHandle,
}

/// A closed-over value
#[derive(Debug, Clone, Default)]
pub struct ObjUpvalue {
    /// The captured value
    pub closed: Value,
}

/// Any heap object
#[derive(Debug, Clone)]
pub enum Obj {
    /// String
    String(ObjString),
    /// Function
    Function(ObjFunction),
    /// Class
    Class(ObjClass),
    /// Instance
    Instance(ObjInstance),
    /// Module
    Module(ObjModule),
    /// Array
    Array(ObjArray),
    /// Map
    Map(ObjMap),
    /// Native
    Native(ObjNative),
    /// Bound method
    BoundMethod(ObjBoundMethod),
    /// Upvalue
    Upvalue(ObjUpvalue),
}

impl Obj {
    /// Kind tag
    pub fn kind(&self) -> ObjKind {
        match self {
            Obj::String(_) => ObjKind::String,
            Obj::Function(_) => ObjKind::Function,
            Obj::Class(_) => ObjKind::Class,
            Obj::Instance(_) => ObjKind::Instance,
            Obj::Module(_) => ObjKind::Module,
            Obj::Array(_) => ObjKind::Array,
            Obj::Map(_) => ObjKind::Map,
            Obj::Native(_) => ObjKind::Native,
            Obj::BoundMethod(_) => ObjKind::BoundMethod,
            Obj::Upvalue(_) => ObjKind::Upvalue,
        }
    }

    /// Accounted size
    pub fn size(&self) -> usize {
        self.kind().size()
    }

    /// Push every handle this object references into `out`
    pub fn trace(&self, out: &mut Vec<ObjHandle>) {
        fn value(out: &mut Vec<ObjHandle>, v: &Value) {
            if let Some(h) = v.as_object() {
                out.push(h);
            }
        }

        match self {
            Obj::BoundMethod(b) => {
                value(out, &b.receiver);
                out.push(b.method);
            }
            Obj::Class(c) => {
                out.extend(c.name);
                c.methods.values().for_each(|v| value(out, v));
                c.fields.values().for_each(|v| value(out, v));
                if let Some(init) = &c.initializer {
                    value(out, init);
                }
                out.extend(c.parent);
            }
            Obj::Function(f) => {
                out.extend(f.name);
                out.extend(f.class_name);
                out.extend(f.source_filename);
                out.extend(f.module);
                f.constants.iter().for_each(|v| value(out, v));
            }
            Obj::Instance(i) => {
                out.push(i.class);
                i.fields.values().for_each(|v| value(out, v));
            }
            Obj::Module(m) => {
                out.extend(m.functions.iter().copied());
                m.locals.iter().for_each(|v| value(out, v));
                out.extend(m.source_filename);
            }
            Obj::Array(a) => a.values.iter().for_each(|v| value(out, v)),
            Obj::Map(m) => m.values.values().for_each(|v| value(out, v)),
            Obj::Upvalue(u) => value(out, &u.closed),
            Obj::String(_) | Obj::Native(_) => {}
        }
    }
}
