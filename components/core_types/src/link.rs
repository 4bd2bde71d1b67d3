//! Linked native fields.
//!
//! A linked value aliases storage owned by a native engine object. Reading
//! or writing the script-visible value goes straight to that storage through
//! a [`FieldAccessor`], with no copy and no synchronization call on either
//! side.

use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

/// Read/write access to one native field.
pub trait FieldAccessor<T: Copy>: Send + Sync {
    /// Current value of the field
    fn get(&self) -> T;
    /// Overwrite the field
    fn set(&self, value: T);
}

/// Shared alias of a native field of type `T`.
///
/// Cloning a `Link` clones the alias, never the field.
pub struct Link<T: Copy>(Arc<dyn FieldAccessor<T>>);

/// Alias of a native `i32` field
pub type IntegerLink = Link<i32>;
/// Alias of a native `f32` field
pub type DecimalLink = Link<f32>;

impl<T: Copy + 'static> Link<T> {
    /// Wrap an accessor
    pub fn new(accessor: Arc<dyn FieldAccessor<T>>) -> Self {
        Self(accessor)
    }

    /// Build a link from a getter and a setter closure.
    ///
    /// Useful when the native field lives behind the host's own lock.
    pub fn from_fns<G, S>(get: G, set: S) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Self(Arc::new(FnAccessor { get, set }))
    }

    /// Read the aliased field
    #[inline]
    pub fn get(&self) -> T {
        self.0.get()
    }

    /// Write the aliased field
    #[inline]
    pub fn set(&self, value: T) {
        self.0.set(value)
    }

    /// Whether both links alias the same field
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl<T: Copy> Clone for Link<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Copy + fmt::Debug + 'static> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Link").field(&self.get()).finish()
    }
}

struct FnAccessor<G, S> {
    get: G,
    set: S,
}

impl<T, G, S> FieldAccessor<T> for FnAccessor<G, S>
where
    T: Copy,
    G: Fn() -> T + Send + Sync,
    S: Fn(T) + Send + Sync,
{
    fn get(&self) -> T {
        (self.get)()
    }

    fn set(&self, value: T) {
        (self.set)(value)
    }
}

struct IntegerCell(AtomicI32);

impl FieldAccessor<i32> for IntegerCell {
    fn get(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, value: i32) {
        self.0.store(value, Ordering::Relaxed)
    }
}

struct DecimalCell(AtomicU32);

impl FieldAccessor<f32> for DecimalCell {
    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed)
    }
}

/// An `i32` member of a native object that scripts may link to.
///
/// `Clone` allocates fresh storage holding the current value: a cloned
/// native object must never alias its source's fields.
pub struct NativeInteger(Arc<IntegerCell>);

impl NativeInteger {
    /// Create the field with an initial value
    pub fn new(value: i32) -> Self {
        Self(Arc::new(IntegerCell(AtomicI32::new(value))))
    }

    /// Native-side read
    #[inline]
    pub fn get(&self) -> i32 {
        self.0.get()
    }

    /// Native-side write
    #[inline]
    pub fn set(&self, value: i32) {
        self.0.set(value)
    }

    /// Alias of this field
    pub fn accessor(&self) -> IntegerLink {
        Link::new(self.0.clone())
    }

    /// Script value aliasing this field
    pub fn link(&self) -> crate::Value {
        crate::Value::LinkedInteger(self.accessor())
    }
}

impl Clone for NativeInteger {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for NativeInteger {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for NativeInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeInteger").field(&self.get()).finish()
    }
}

/// An `f32` member of a native object that scripts may link to.
///
/// See [`NativeInteger`] for the clone semantics.
pub struct NativeDecimal(Arc<DecimalCell>);

impl NativeDecimal {
    /// Create the field with an initial value
    pub fn new(value: f32) -> Self {
        Self(Arc::new(DecimalCell(AtomicU32::new(value.to_bits()))))
    }

    /// Native-side read
    #[inline]
    pub fn get(&self) -> f32 {
        self.0.get()
    }

    /// Native-side write
    #[inline]
    pub fn set(&self, value: f32) {
        self.0.set(value)
    }

    /// Alias of this field
    pub fn accessor(&self) -> DecimalLink {
        Link::new(self.0.clone())
    }

    /// Script value aliasing this field
    pub fn link(&self) -> crate::Value {
        crate::Value::LinkedDecimal(self.accessor())
    }
}

impl Clone for NativeDecimal {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for NativeDecimal {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl fmt::Debug for NativeDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeDecimal").field(&self.get()).finish()
    }
}
