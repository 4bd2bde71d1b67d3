//! Constant pool entries
//!
//! Constants are stored in the container with a one-byte tag followed by
//! the payload.

use std::fmt;

/// Tag byte for an `i32` constant
pub const TAG_INTEGER: u8 = 1;
/// Tag byte for an `f32` constant
pub const TAG_DECIMAL: u8 = 2;
/// Tag byte for a length-prefixed string constant
pub const TAG_STRING: u8 = 3;

/// A constant in a function's constant pool
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// 32-bit signed integer
    Integer(i32),
    /// 32-bit float
    Decimal(f32),
    /// UTF-8 string
    String(String),
}

impl Constant {
    /// The tag byte this constant is encoded with
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Integer(_) => TAG_INTEGER,
            Constant::Decimal(_) => TAG_DECIMAL,
            Constant::String(_) => TAG_STRING,
        }
    }
}

impl From<i32> for Constant {
    fn from(n: i32) -> Self {
        Constant::Integer(n)
    }
}

impl From<f32> for Constant {
    fn from(n: f32) -> Self {
        Constant::Decimal(n)
    }
}

impl From<&str> for Constant {
    fn from(s: &str) -> Self {
        Constant::String(s.to_string())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Integer(n) => write!(f, "{}", n),
            Constant::Decimal(n) => write!(f, "{:.6}", n),
            Constant::String(s) => write!(f, "\"{}\"", s),
        }
    }
}
