//! Bytecode chunk - one function's instructions, line table and constants
//!
//! The chunk doubles as an assembler: tests and tooling build function
//! bodies with the `emit_*` helpers and hand the result to the container
//! writer.

use core_types::hash_name;

use crate::constant::Constant;
use crate::opcode::OpCode;

/// Instructions, optional per-byte line table and constant pool
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    /// Raw instruction bytes
    pub code: Vec<u8>,
    /// One entry per code byte; the low 16 bits hold the source line
    pub lines: Option<Vec<i32>>,
    /// Constant pool
    pub constants: Vec<Constant>,
    current_line: i32,
}

impl Chunk {
    /// Create an empty chunk without a line table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty chunk that records a line for every emitted byte
    pub fn with_line_table() -> Self {
        Self {
            lines: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Rebuild a chunk from decoded container parts
    pub(crate) fn from_parts(
        code: Vec<u8>,
        lines: Option<Vec<i32>>,
        constants: Vec<Constant>,
    ) -> Self {
        Self {
            code,
            lines,
            constants,
            current_line: 0,
        }
    }

    /// Set the source line attributed to subsequently emitted bytes
    pub fn set_line(&mut self, line: i32) {
        self.current_line = line;
    }

    /// Number of instruction bytes
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether no instruction has been emitted
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Source line of the instruction byte at `offset`, if known
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        let lines = self.lines.as_ref()?;
        lines.get(offset).map(|line| (line & 0xFFFF) as u32)
    }

    /// Append one raw byte
    pub fn emit_byte(&mut self, byte: u8) {
        self.code.push(byte);
        if let Some(lines) = self.lines.as_mut() {
            lines.push(self.current_line);
        }
    }

    /// Append an opcode
    pub fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op.as_byte());
    }

    /// Append a little-endian `u16` operand
    pub fn emit_u16(&mut self, value: u16) {
        for b in value.to_le_bytes() {
            self.emit_byte(b);
        }
    }

    /// Append a little-endian `u32` operand
    pub fn emit_u32(&mut self, value: u32) {
        for b in value.to_le_bytes() {
            self.emit_byte(b);
        }
    }

    /// Append a little-endian `i32` operand
    pub fn emit_i32(&mut self, value: i32) {
        self.emit_u32(value as u32);
    }

    /// Append a little-endian `f32` operand
    pub fn emit_f32(&mut self, value: f32) {
        self.emit_u32(value.to_bits());
    }

    /// Add a constant to the pool and return its index
    pub fn add_constant(&mut self, constant: impl Into<Constant>) -> u32 {
        self.constants.push(constant.into());
        (self.constants.len() - 1) as u32
    }

    /// Emit `OP_CONSTANT` for a new pool entry
    pub fn emit_constant(&mut self, constant: impl Into<Constant>) -> u32 {
        let index = self.add_constant(constant);
        self.emit_op(OpCode::Constant);
        self.emit_u32(index);
        index
    }

    /// Emit `OP_INTEGER` with an inline operand
    pub fn emit_integer(&mut self, value: i32) {
        self.emit_op(OpCode::Integer);
        self.emit_i32(value);
    }

    /// Emit `OP_DECIMAL` with an inline operand
    pub fn emit_decimal(&mut self, value: f32) {
        self.emit_op(OpCode::Decimal);
        self.emit_f32(value);
    }

    /// Emit an opcode followed by the hash of `name`.
    ///
    /// Used for globals, properties, constants and `OP_INHERIT`.
    pub fn emit_named(&mut self, op: OpCode, name: &str) {
        self.emit_op(op);
        self.emit_u32(hash_name(name));
    }

    /// Emit an opcode with a single byte operand
    pub fn emit_with_byte(&mut self, op: OpCode, operand: u8) {
        self.emit_op(op);
        self.emit_byte(operand);
    }

    /// Emit `OP_INVOKE`
    pub fn emit_invoke(&mut self, name: &str, argc: u8, is_super: bool) {
        self.emit_op(OpCode::Invoke);
        self.emit_byte(argc);
        self.emit_u32(hash_name(name));
        self.emit_byte(is_super as u8);
    }

    /// Emit `OP_CLASS`; `extended` marks a class extension
    pub fn emit_class(&mut self, name: &str, extended: bool) {
        self.emit_op(OpCode::Class);
        self.emit_u32(hash_name(name));
        self.emit_byte(extended as u8);
    }

    /// Emit `OP_METHOD` binding module function `index` under `name`
    pub fn emit_method(&mut self, index: u8, name: &str) {
        self.emit_op(OpCode::Method);
        self.emit_byte(index);
        self.emit_u32(hash_name(name));
    }

    /// Emit a forward jump with a placeholder offset.
    ///
    /// Returns the operand position for [`Chunk::patch_jump`].
    pub fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_u16(0xFFFF);
        self.code.len() - 2
    }

    /// Point a forward jump at the current end of the chunk
    pub fn patch_jump(&mut self, operand: usize) {
        let offset = (self.code.len() - operand - 2) as i16;
        self.code[operand..operand + 2].copy_from_slice(&offset.to_le_bytes());
    }

    /// Emit `OP_JUMP_BACK` to `target`
    pub fn emit_loop(&mut self, target: usize) {
        self.emit_op(OpCode::JumpBack);
        let offset = (self.code.len() + 2 - target) as i16;
        self.emit_u16(offset as u16);
    }

    /// Read the opcode at `offset`
    pub fn op_at(&self, offset: usize) -> Option<OpCode> {
        self.code.get(offset).copied().and_then(OpCode::from_byte)
    }
}

/// Chunks compare by content; the assembler's current line is not part of it.
impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.lines == other.lines && self.constants == other.constants
    }
}
