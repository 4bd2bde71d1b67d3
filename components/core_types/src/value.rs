//! Script value representation.
//!
//! This module provides the tagged [`Value`] enum together with the
//! heap-independent value operations: equality, falsiness, numeric casts
//! and delinking. Operations that need to look inside heap objects (string
//! comparison, string casts, printing) live with the heap.

use std::fmt;

use crate::handle::ObjHandle;
use crate::link::{DecimalLink, IntegerLink};

/// Represents any script value.
///
/// Numbers are stored inline, heap objects by [`ObjHandle`]. Linked variants
/// alias a native field: they never own memory, are ignored by the garbage
/// collector, and must be [delinked](Value::delink) before being stored
/// anywhere that outlives the native object.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let number = Value::Integer(42);
/// let ratio = Value::Decimal(0.5);
///
/// assert!(!number.is_falsey());
/// assert!(Value::Null.is_falsey());
/// assert_eq!(ratio.cast_as_integer(), Some(0));
/// ```
#[derive(Clone, Default)]
pub enum Value {
    /// The null value
    #[default]
    Null,
    /// 32-bit signed integer
    Integer(i32),
    /// 32-bit float
    Decimal(f32),
    /// Reference to a heap object
    Object(ObjHandle),
    /// Alias of a native `i32` field
    LinkedInteger(IntegerLink),
    /// Alias of a native `f32` field
    LinkedDecimal(DecimalLink),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Integer(n) => f.debug_tuple("Integer").field(n).finish(),
            Value::Decimal(n) => f.debug_tuple("Decimal").field(n).finish(),
            Value::Object(h) => f.debug_tuple("Object").field(h).finish(),
            Value::LinkedInteger(l) => f.debug_tuple("LinkedInteger").field(&l.get()).finish(),
            Value::LinkedDecimal(l) => f.debug_tuple("LinkedDecimal").field(&l.get()).finish(),
        }
    }
}

/// `==` is [`Value::equals`]: linked values compare equal to plain values
/// holding the same number.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Decimal(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Integer(b as i32)
    }
}

impl From<ObjHandle> for Value {
    fn from(h: ObjHandle) -> Self {
        Value::Object(h)
    }
}

impl Value {
    /// Whether this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is an Integer, linked or not
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::LinkedInteger(_))
    }

    /// Whether this is a Decimal, linked or not
    pub fn is_decimal(&self) -> bool {
        matches!(self, Value::Decimal(_) | Value::LinkedDecimal(_))
    }

    /// Whether this is any numeric variant
    pub fn is_number(&self) -> bool {
        self.is_integer() || self.is_decimal()
    }

    /// Whether this aliases a native field
    pub fn is_linked(&self) -> bool {
        matches!(self, Value::LinkedInteger(_) | Value::LinkedDecimal(_))
    }

    /// The object handle, if this is an object
    pub fn as_object(&self) -> Option<ObjHandle> {
        match self {
            Value::Object(h) => Some(*h),
            _ => None,
        }
    }

    /// The integer, if this is an Integer (reading through a link)
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::LinkedInteger(l) => Some(l.get()),
            _ => None,
        }
    }

    /// The decimal, if this is a Decimal (reading through a link)
    pub fn as_decimal(&self) -> Option<f32> {
        match self {
            Value::Decimal(n) => Some(*n),
            Value::LinkedDecimal(l) => Some(l.get()),
            _ => None,
        }
    }

    /// Returns whether this value is falsey.
    ///
    /// Null, integer zero and decimal zero are falsey. Every object,
    /// including an empty string or array, is truthy.
    pub fn is_falsey(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Integer(_) | Value::LinkedInteger(_) => self.as_integer() == Some(0),
            Value::Decimal(_) | Value::LinkedDecimal(_) => self.as_decimal() == Some(0.0),
            Value::Object(_) => false,
        }
    }

    /// Loose identity equality.
    ///
    /// Kinds must match, except that a linked variant unifies with its plain
    /// numeric counterpart and is compared by the value it currently aliases.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Object(a), Value::Object(b)) => a == b,
            (
                Value::Integer(_) | Value::LinkedInteger(_),
                Value::Integer(_) | Value::LinkedInteger(_),
            ) => self.as_integer() == other.as_integer(),
            (
                Value::Decimal(_) | Value::LinkedDecimal(_),
                Value::Decimal(_) | Value::LinkedDecimal(_),
            ) => self.as_decimal() == other.as_decimal(),
            _ => false,
        }
    }

    /// Strict equality: kinds must match exactly and linked values must
    /// alias the same field.
    pub fn exactly_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::LinkedInteger(a), Value::LinkedInteger(b)) => a.ptr_eq(b),
            (Value::LinkedDecimal(a), Value::LinkedDecimal(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Numeric cast to `i32`; decimals truncate toward zero.
    ///
    /// Returns `None` for Null and objects. This is a distinct failure
    /// signal, never confused with a scripted null.
    pub fn cast_as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(_) | Value::LinkedInteger(_) => self.as_integer(),
            Value::Decimal(_) | Value::LinkedDecimal(_) => self.as_decimal().map(|d| d as i32),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Numeric cast to `f32`. Returns `None` for Null and objects.
    pub fn cast_as_decimal(&self) -> Option<f32> {
        match self {
            Value::Decimal(_) | Value::LinkedDecimal(_) => self.as_decimal(),
            Value::Integer(_) | Value::LinkedInteger(_) => self.as_integer().map(|n| n as f32),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Copy a linked value out into its plain numeric equivalent.
    ///
    /// Non-linked values are returned unchanged.
    pub fn delink(&self) -> Value {
        match self {
            Value::LinkedInteger(l) => Value::Integer(l.get()),
            Value::LinkedDecimal(l) => Value::Decimal(l.get()),
            other => other.clone(),
        }
    }

    /// Name of the value's kind, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::Object(_) => "Object",
            Value::LinkedInteger(_) => "Linked Integer",
            Value::LinkedDecimal(_) => "Linked Decimal",
        }
    }
}

/// Prints numbers the way scripts see them; objects print their handle.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Integer(_) | Value::LinkedInteger(_) => {
                write!(f, "{}", self.as_integer().unwrap_or_default())
            }
            Value::Decimal(_) | Value::LinkedDecimal(_) => {
                write!(f, "{:.6}", self.as_decimal().unwrap_or_default())
            }
            Value::Object(h) => write!(f, "<object {}>", h),
        }
    }
}
