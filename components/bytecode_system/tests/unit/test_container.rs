//! Tests for the HTVM container and HMAP class map

use bytecode_system::{
    BytecodeContainer, Chunk, ClassMap, Constant, ContainerError, FunctionProto, OpCode,
};
use core_types::hash_name;

fn function(name: &str, arity: i32, constants: &[Constant]) -> FunctionProto {
    let mut chunk = Chunk::new();
    for c in constants {
        chunk.add_constant(c.clone());
    }
    chunk.emit_op(OpCode::Null);
    chunk.emit_op(OpCode::Return);
    FunctionProto::new(arity, hash_name(name), chunk)
}

#[test]
fn test_functions_round_trip_in_order() {
    let functions = vec![
        function("main", 0, &[Constant::String("Player".into())]),
        function("Hurt", 1, &[Constant::Integer(10), Constant::Decimal(0.25)]),
        function("Draw", 0, &[]),
    ];
    let bytes = BytecodeContainer::new(functions.clone()).to_bytes();
    let read = BytecodeContainer::read(&bytes).unwrap();
    assert_eq!(read.functions, functions);
    assert!(!read.debug_info);
    assert!(read.tokens.is_empty());
    assert_eq!(read.source_filename, None);
}

#[test]
fn test_source_filename_without_debug_info() {
    let container =
        BytecodeContainer::new(vec![function("main", 0, &[])]).with_source_filename("Ring.hsl");
    let bytes = container.to_bytes();
    assert_eq!(bytes[5], 2);
    let read = BytecodeContainer::read(&bytes).unwrap();
    assert_eq!(read.source_filename.as_deref(), Some("Ring.hsl"));
}

#[test]
fn test_missing_lines_written_as_zero() {
    let container = BytecodeContainer::new(vec![function("main", 0, &[])]).with_tokens(["main"]);
    let read = BytecodeContainer::read(&container.to_bytes()).unwrap();
    assert_eq!(read.functions[0].chunk.lines, Some(vec![0, 0]));
    assert_eq!(read.tokens, vec!["main".to_string()]);
}

#[test]
fn test_negative_count_rejected() {
    let mut bytes = BytecodeContainer::new(vec![function("main", 0, &[])]).to_bytes();
    bytes[7..11].copy_from_slice(&(-1i32).to_le_bytes());
    assert_eq!(
        BytecodeContainer::read(&bytes),
        Err(ContainerError::InvalidCount {
            what: "function",
            count: -1
        })
    );
}

#[test]
fn test_invalid_utf8_string() {
    let f = function("main", 0, &[Constant::String("ab".into())]);
    let mut bytes = BytecodeContainer::new(vec![f]).to_bytes();
    let len = bytes.len();
    bytes[len - 1] = 0xFF;
    assert!(matches!(
        BytecodeContainer::read(&bytes),
        Err(ContainerError::InvalidString(_))
    ));
}

#[test]
fn test_empty_input() {
    assert!(matches!(
        BytecodeContainer::read(&[]),
        Err(ContainerError::Truncated { offset: 0, needed: 4 })
    ));
}

#[test]
fn test_class_map_lookup() {
    let mut map = ClassMap::new();
    map.insert(hash_name("Player"), 0x1234);
    map.insert(hash_name("Player"), 0x5678);
    let read = ClassMap::read(&map.to_bytes()).unwrap();
    assert_eq!(read.files_for(hash_name("Player")), Some(&[0x1234, 0x5678][..]));
    assert!(!read.contains(hash_name("Ring")));
}
