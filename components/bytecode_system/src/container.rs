//! `HTVM` bytecode container reader and writer
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "HTVM" | version u8 | options u8 | reserved u8 | function_count i32
//! per function:
//!   instruction_count i32 | arity i32 | name_hash u32 | code[count]
//!   [lines[count] i32, if options bit 0] | constant_count i32 | constants
//! [token_count i32 | tokens, if options bit 0]
//! [source filename, if options bit 1]
//! ```
//!
//! Strings are a `u32` byte length followed by UTF-8 bytes.

use thiserror::Error;

use crate::chunk::Chunk;
use crate::constant::{Constant, TAG_DECIMAL, TAG_INTEGER, TAG_STRING};

/// Container magic
pub const MAGIC: [u8; 4] = *b"HTVM";
/// Newest container version this reader understands
pub const LATEST_VERSION: u8 = 0;
/// Options bit: line tables and token table are present
pub const OPT_DEBUG_INFO: u8 = 1 << 0;
/// Options bit: a source filename follows the functions
pub const OPT_SOURCE_FILENAME: u8 = 1 << 1;

// Smallest encoded sizes, used to bound preallocation
const FUNCTION_HEADER_SIZE: usize = 12;
const CONSTANT_MIN_SIZE: usize = 5;
const STRING_MIN_SIZE: usize = 4;

/// Container parse failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContainerError {
    /// The first four bytes are not `HTVM`
    #[error("Incorrect magic!")]
    BadMagic,

    /// Version newer than [`LATEST_VERSION`]
    #[error("Unsupported bytecode version {0}")]
    UnsupportedVersion(u8),

    /// Input ended early
    #[error("Unexpected end of bytecode at offset {offset} (needed {needed} more bytes)")]
    Truncated {
        /// Byte offset of the failed read
        offset: usize,
        /// Bytes that were required
        needed: usize,
    },

    /// A count field is negative
    #[error("Invalid {what} count {count}")]
    InvalidCount {
        /// Which count
        what: &'static str,
        /// The decoded value
        count: i32,
    },

    /// A constant with an unrecognised tag
    #[error("Unknown constant type {tag} at offset {offset}")]
    UnknownConstantTag {
        /// The tag byte
        tag: u8,
        /// Byte offset of the tag
        offset: usize,
    },

    /// The container holds no functions
    #[error("Bytecode contains no functions")]
    NoFunctions,

    /// A string is not valid UTF-8
    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidString(usize),
}

/// One compiled function
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionProto {
    /// Exact number of arguments
    pub arity: i32,
    /// Hash of the function's name
    pub name_hash: u32,
    /// Body
    pub chunk: Chunk,
}

impl FunctionProto {
    /// Create a function prototype
    pub fn new(arity: i32, name_hash: u32, chunk: Chunk) -> Self {
        Self {
            arity,
            name_hash,
            chunk,
        }
    }
}

/// A parsed bytecode file: one module's functions plus debug data.
///
/// The first function is the module's top-level entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct BytecodeContainer {
    /// Format version
    pub version: u8,
    /// Whether line tables and the token table are present
    pub debug_info: bool,
    /// Functions in module order
    pub functions: Vec<FunctionProto>,
    /// Identifier strings, so hashes can be printed by name
    pub tokens: Vec<String>,
    /// Source filename banner
    pub source_filename: Option<String>,
}

impl BytecodeContainer {
    /// Create a container holding `functions`
    pub fn new(functions: Vec<FunctionProto>) -> Self {
        Self {
            version: LATEST_VERSION,
            debug_info: false,
            functions,
            tokens: Vec::new(),
            source_filename: None,
        }
    }

    /// Include a token table (and line tables)
    pub fn with_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.debug_info = true;
        self.tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Include a source filename banner
    pub fn with_source_filename(mut self, filename: impl Into<String>) -> Self {
        self.source_filename = Some(filename.into());
        self
    }

    /// Parse a container
    pub fn read(bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut reader = Reader::new(bytes);

        if reader.bytes(4)? != MAGIC {
            return Err(ContainerError::BadMagic);
        }
        let version = reader.u8()?;
        if version > LATEST_VERSION {
            return Err(ContainerError::UnsupportedVersion(version));
        }
        let options = reader.u8()?;
        reader.skip(1)?;

        let debug_info = options & OPT_DEBUG_INFO != 0;

        let function_count = reader.count("function")?;
        if function_count == 0 {
            return Err(ContainerError::NoFunctions);
        }

        let mut functions =
            Vec::with_capacity(reader.capacity_for(function_count, FUNCTION_HEADER_SIZE));
        for _ in 0..function_count {
            let length = reader.count("instruction")?;
            let arity = reader.i32()?;
            let name_hash = reader.u32()?;

            let code = reader.bytes(length)?.to_vec();
            let lines = if debug_info {
                let mut lines = Vec::with_capacity(length);
                for _ in 0..length {
                    lines.push(reader.i32()?);
                }
                Some(lines)
            } else {
                None
            };

            let constant_count = reader.count("constant")?;
            let mut constants =
                Vec::with_capacity(reader.capacity_for(constant_count, CONSTANT_MIN_SIZE));
            for _ in 0..constant_count {
                let offset = reader.offset();
                let constant = match reader.u8()? {
                    TAG_INTEGER => Constant::Integer(reader.i32()?),
                    TAG_DECIMAL => Constant::Decimal(reader.f32()?),
                    TAG_STRING => Constant::String(reader.string()?),
                    tag => return Err(ContainerError::UnknownConstantTag { tag, offset }),
                };
                constants.push(constant);
            }

            let chunk = Chunk::from_parts(code, lines, constants);
            functions.push(FunctionProto::new(arity, name_hash, chunk));
        }

        let mut tokens = Vec::new();
        if debug_info {
            let token_count = reader.count("token")?;
            tokens.reserve(reader.capacity_for(token_count, STRING_MIN_SIZE));
            for _ in 0..token_count {
                tokens.push(reader.string()?);
            }
        }

        let source_filename = if options & OPT_SOURCE_FILENAME != 0 {
            Some(reader.string()?)
        } else {
            None
        };

        Ok(Self {
            version,
            debug_info,
            functions,
            tokens,
            source_filename,
        })
    }

    /// Serialize to the exact bytes [`BytecodeContainer::read`] accepts
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.push(self.version);

        let mut options = 0;
        if self.debug_info {
            options |= OPT_DEBUG_INFO;
        }
        if self.source_filename.is_some() {
            options |= OPT_SOURCE_FILENAME;
        }
        out.push(options);
        out.push(0);

        out.extend_from_slice(&(self.functions.len() as i32).to_le_bytes());
        for function in &self.functions {
            let chunk = &function.chunk;
            out.extend_from_slice(&(chunk.code.len() as i32).to_le_bytes());
            out.extend_from_slice(&function.arity.to_le_bytes());
            out.extend_from_slice(&function.name_hash.to_le_bytes());
            out.extend_from_slice(&chunk.code);

            if self.debug_info {
                for i in 0..chunk.code.len() {
                    let line = chunk
                        .lines
                        .as_ref()
                        .and_then(|lines| lines.get(i).copied())
                        .unwrap_or(0);
                    out.extend_from_slice(&line.to_le_bytes());
                }
            }

            out.extend_from_slice(&(chunk.constants.len() as i32).to_le_bytes());
            for constant in &chunk.constants {
                out.push(constant.tag());
                match constant {
                    Constant::Integer(n) => out.extend_from_slice(&n.to_le_bytes()),
                    Constant::Decimal(n) => out.extend_from_slice(&n.to_le_bytes()),
                    Constant::String(s) => write_string(&mut out, s),
                }
            }
        }

        if self.debug_info {
            out.extend_from_slice(&(self.tokens.len() as i32).to_le_bytes());
            for token in &self.tokens {
                write_string(&mut out, token);
            }
        }

        if let Some(filename) = &self.source_filename {
            write_string(&mut out, filename);
        }

        out
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// Bounds-checked little-endian cursor
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.pos
    }

    pub(crate) fn bytes(&mut self, n: usize) -> Result<&'a [u8], ContainerError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(ContainerError::Truncated {
                offset: self.pos,
                needed: n,
            }),
        }
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), ContainerError> {
        self.bytes(n).map(|_| ())
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], ContainerError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, ContainerError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn i32(&mut self) -> Result<i32, ContainerError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, ContainerError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn f32(&mut self) -> Result<f32, ContainerError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    /// Capacity to reserve for `count` records of at least `record_size`
    /// bytes; never more than the remaining input could hold
    pub(crate) fn capacity_for(&self, count: usize, record_size: usize) -> usize {
        count.min((self.bytes.len() - self.pos) / record_size)
    }

    pub(crate) fn count(&mut self, what: &'static str) -> Result<usize, ContainerError> {
        let count = self.i32()?;
        usize::try_from(count).map_err(|_| ContainerError::InvalidCount { what, count })
    }

    pub(crate) fn string(&mut self) -> Result<String, ContainerError> {
        let len = self.u32()? as usize;
        let offset = self.pos;
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ContainerError::InvalidString(offset))
    }
}
