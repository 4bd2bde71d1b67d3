//! Tests for OpCode numbering and operand sizes

use bytecode_system::OpCode;

#[test]
fn test_names() {
    assert_eq!(OpCode::GetGlobal.name(), "OP_GET_GLOBAL");
    assert_eq!(OpCode::JumpIfFalse.to_string(), "OP_JUMP_IF_FALSE");
}

#[test]
fn test_from_byte() {
    assert_eq!(OpCode::from_byte(0), Some(OpCode::Error));
    assert_eq!(OpCode::from_byte(11), Some(OpCode::Return));
    assert_eq!(OpCode::from_byte(255), None);
}

#[test]
fn test_operand_sizes() {
    assert_eq!(OpCode::Return.operand_size(), Some(0));
    assert_eq!(OpCode::GetLocal.operand_size(), Some(1));
    assert_eq!(OpCode::Jump.operand_size(), Some(2));
    assert_eq!(OpCode::GetGlobal.operand_size(), Some(4));
    assert_eq!(OpCode::Class.operand_size(), Some(5));
    assert_eq!(OpCode::Invoke.operand_size(), Some(6));
    assert_eq!(OpCode::SwitchTable.operand_size(), None);
}

#[test]
fn test_scene_bound() {
    assert!(OpCode::With.is_scene_bound());
    assert!(OpCode::Switch.is_scene_bound());
    assert!(!OpCode::SwitchTable.is_scene_bound());
    assert!(!OpCode::Import.is_scene_bound());
}
