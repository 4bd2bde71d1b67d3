//! Contract compliance tests for bytecode_system
//! Pins the binary layout shared with the external compiler

use bytecode_system::{BytecodeContainer, Chunk, Constant, FunctionProto, OpCode, MAGIC};

/// Contract: header is magic, version, options, one reserved byte, count
#[test]
fn test_contract_header() {
    let mut chunk = Chunk::new();
    chunk.emit_op(OpCode::Return);
    let bytes = BytecodeContainer::new(vec![FunctionProto::new(0, 7, chunk)]).to_bytes();
    assert_eq!(&bytes[0..4], &MAGIC);
    assert_eq!(bytes[6], 0);
    assert_eq!(i32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]), 1);
}

/// Contract: per-function record is count, arity, name hash, code
#[test]
fn test_contract_function_record() {
    let mut chunk = Chunk::new();
    chunk.emit_op(OpCode::Return);
    let bytes = BytecodeContainer::new(vec![FunctionProto::new(2, 0xCAFEBABE, chunk)]).to_bytes();
    assert_eq!(&bytes[11..15], &1i32.to_le_bytes());
    assert_eq!(&bytes[15..19], &2i32.to_le_bytes());
    assert_eq!(&bytes[19..23], &0xCAFEBABEu32.to_le_bytes());
    assert_eq!(bytes[23], OpCode::Return as u8);
}

/// Contract: constant tags 1, 2, 3
#[test]
fn test_contract_constant_tags() {
    assert_eq!(Constant::Integer(0).tag(), 1);
    assert_eq!(Constant::Decimal(0.0).tag(), 2);
    assert_eq!(Constant::String(String::new()).tag(), 3);
}

/// Contract: opcode bytes used by hand-written fixtures
#[test]
fn test_contract_opcode_bytes() {
    assert_eq!(OpCode::Constant as u8, 1);
    assert_eq!(OpCode::GetGlobal as u8, 5);
    assert_eq!(OpCode::Return as u8, 11);
    assert_eq!(OpCode::Call as u8, 14);
    assert_eq!(OpCode::Integer as u8, 75);
}
