//! Unit tests for bytecode_system

mod test_container;
mod test_opcode;
