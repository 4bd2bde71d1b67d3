//! Core script value types and error handling.
//!
//! This crate provides the foundational types shared by every layer of the
//! script runtime: the tagged [`Value`], generational [`ObjHandle`]s into the
//! object heap, linked native fields, the name hash used by bytecode and
//! runtime alike, and the error taxonomy.
//!
//! # Overview
//!
//! - [`Value`] - Tagged, copyable unit of script data
//! - [`ObjHandle`] - Non-owning reference to a heap object
//! - [`IntegerLink`] / [`DecimalLink`] - Zero-copy aliases of native fields
//! - [`VmError`] - Runtime, fatal and load errors with a call trace
//! - [`hash_name`] - Stable 32-bit name hash
//!
//! # Examples
//!
//! ```
//! use core_types::{NativeInteger, Value};
//!
//! let health = NativeInteger::new(100);
//! let linked = health.link();
//!
//! assert_eq!(linked, Value::Integer(100));
//! health.set(75);
//! assert_eq!(linked.delink(), Value::Integer(75));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod handle;
mod hash;
mod link;
mod source;
mod value;

pub use error::{ErrorKind, VmError, VmResult};
pub use handle::ObjHandle;
pub use hash::{filename_hash, hash_name, murmur_hash, HASH_SEED};
pub use link::{
    DecimalLink, FieldAccessor, IntegerLink, Link, NativeDecimal, NativeInteger,
};
pub use source::StackFrame;
pub use value::Value;
