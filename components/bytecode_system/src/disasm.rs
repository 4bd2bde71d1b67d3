//! Human-readable disassembly of chunks

use std::collections::HashMap;
use std::fmt::Write;

use crate::chunk::Chunk;
use crate::opcode::OpCode;

/// Total size of the instruction at `offset`, operands included.
///
/// Returns `None` for unknown opcodes, scene opcodes and truncated code.
pub fn instruction_size(code: &[u8], offset: usize) -> Option<usize> {
    let op = OpCode::from_byte(*code.get(offset)?)?;
    let size = match op {
        OpCode::SwitchTable => {
            let count = read_u16(code, offset + 1)? as usize;
            1 + 2 + count * 3
        }
        _ => 1 + op.operand_size()?,
    };
    if offset + size > code.len() {
        return None;
    }
    Some(size)
}

fn read_u16(code: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes([*code.get(at)?, *code.get(at + 1)?]))
}

fn read_u32(code: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes([
        *code.get(at)?,
        *code.get(at + 1)?,
        *code.get(at + 2)?,
        *code.get(at + 3)?,
    ]))
}

/// Disassembles chunks, printing hashes by name when a token is known
#[derive(Debug, Default)]
pub struct Disassembler<'a> {
    tokens: Option<&'a HashMap<u32, String>>,
}

impl<'a> Disassembler<'a> {
    /// Create a disassembler without a token table
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve hashes through `tokens`
    pub fn with_tokens(mut self, tokens: &'a HashMap<u32, String>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    fn hash(&self, out: &mut String, hash: u32) {
        let _ = write!(out, "#{:08X}", hash);
        if let Some(token) = self.tokens.and_then(|t| t.get(&hash)) {
            let _ = write!(out, " ({})", token);
        }
    }

    /// Disassemble a whole chunk under a `== name ==` banner
    pub fn chunk(&self, chunk: &Chunk, name: &str) -> String {
        let mut out = format!("== {} ==\n", name);
        let mut offset = 0;
        while offset < chunk.code.len() {
            offset = self.instruction(&mut out, chunk, offset);
        }
        out
    }

    /// Disassemble one instruction into `out`; returns the next offset
    pub fn instruction(&self, out: &mut String, chunk: &Chunk, offset: usize) -> usize {
        let code = &chunk.code;
        let _ = write!(out, "{:04} ", offset);
        match (chunk.line_at(offset), offset.checked_sub(1).and_then(|p| chunk.line_at(p))) {
            (Some(line), Some(prev)) if line == prev => out.push_str("   | "),
            (Some(line), _) => {
                let _ = write!(out, "{:4} ", line);
            }
            (None, _) => out.push_str("     "),
        }

        let op = match OpCode::from_byte(code[offset]) {
            Some(op) => op,
            None => {
                let _ = writeln!(out, "Unknown opcode {}", code[offset]);
                return offset + 1;
            }
        };
        let size = match instruction_size(code, offset) {
            Some(size) => size,
            None => {
                let _ = writeln!(out, "{} (no viewer)", op.name());
                return code.len();
            }
        };

        let _ = write!(out, "{:<16} ", op.name());
        let at = offset + 1;
        match op {
            OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::DefineGlobal
            | OpCode::DefineConstant
            | OpCode::GetProperty
            | OpCode::SetProperty
            | OpCode::HasProperty
            | OpCode::Inherit
            | OpCode::Class => self.hash(out, read_u32(code, at).unwrap_or(0)),
            OpCode::Constant | OpCode::Import => {
                let index = read_u32(code, at).unwrap_or(0);
                let _ = write!(out, "{:9} '", index);
                match chunk.constants.get(index as usize) {
                    Some(c) => {
                        let _ = write!(out, "{}'", c);
                    }
                    None => out.push_str("?'"),
                }
            }
            OpCode::Integer => {
                let _ = write!(out, "{:9}", read_u32(code, at).unwrap_or(0) as i32);
            }
            OpCode::Decimal => {
                let _ = write!(out, "{:9.6}", f32::from_bits(read_u32(code, at).unwrap_or(0)));
            }
            OpCode::GetLocal | OpCode::SetLocal => {
                let slot = code[at];
                let _ = write!(out, "{:9}", slot);
                if slot == 0 {
                    out.push_str(" 'this'");
                }
            }
            OpCode::Call | OpCode::New | OpCode::Copy | OpCode::PopN => {
                let _ = write!(out, "{:9}", code[at]);
            }
            OpCode::GetModuleLocal | OpCode::SetModuleLocal | OpCode::Failsafe => {
                let _ = write!(out, "{:9}", read_u16(code, at).unwrap_or(0));
            }
            OpCode::NewArray | OpCode::NewMap => {
                let _ = write!(out, "{:9}", read_u32(code, at).unwrap_or(0));
            }
            OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpBack => {
                let jump = read_u16(code, at).unwrap_or(0) as i16 as i64;
                let sign = if op == OpCode::JumpBack { -1 } else { 1 };
                let _ = write!(out, "{:9} -> {}", offset, offset as i64 + 3 + sign * jump);
            }
            OpCode::Method => {
                let _ = write!(out, "{:2} ", code[at]);
                self.hash(out, read_u32(code, at + 1).unwrap_or(0));
            }
            OpCode::Invoke => {
                let _ = write!(out, "{:2} ", code[at]);
                self.hash(out, read_u32(code, at + 1).unwrap_or(0));
                if code[at + 5] != 0 {
                    out.push_str(" super");
                }
            }
            OpCode::SwitchTable => {
                let count = read_u16(code, at).unwrap_or(0);
                let _ = write!(out, "{:9} cases", count);
            }
            _ => {}
        }
        out.push('\n');
        offset + size
    }
}
