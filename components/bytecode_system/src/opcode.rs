//! Bytecode opcodes for the script VM
//!
//! Numbering is part of the container format: a compiled `.ibc` file stores
//! these bytes verbatim, so variants must never be reordered.

/// A single-byte instruction opcode
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Invalid instruction; executing it is fatal
    Error = 0,
    /// Push constant `u32` index
    Constant,
    /// Define global `u32` hash from the top of stack
    DefineGlobal,
    /// Read property `u32` hash of the object on top of stack
    GetProperty,
    /// Write property `u32` hash
    SetProperty,
    /// Push global `u32` hash
    GetGlobal,
    /// Assign global `u32` hash
    SetGlobal,
    /// Push local `u8` slot
    GetLocal,
    /// Assign local `u8` slot
    SetLocal,
    /// Dump the operand stack to the log
    PrintStack,
    /// Set parent hash `u32` of the class on top of stack
    Inherit,
    /// Return from the current frame
    Return,
    /// Bind module function `u8` index as method `u32` hash
    Method,
    /// Create class `u32` hash, `u8` kind
    Class,
    /// Call with `u8` argument count
    Call,
    /// Reserved
    Super,
    /// Invoke `u8` argc, `u32` hash, `u8` is_super
    Invoke,
    /// Jump forward `i16`
    Jump,
    /// Jump forward `i16` when top of stack is falsey (peeks)
    JumpIfFalse,
    /// Jump backward `i16`
    JumpBack,
    /// Discard top of stack
    Pop,
    /// Duplicate the top `u8` values
    Copy,
    /// Addition or string concatenation
    Add,
    /// Subtraction
    Subtract,
    /// Multiplication
    Multiply,
    /// Division
    Divide,
    /// Remainder
    Modulo,
    /// Arithmetic negation
    Negate,
    /// Add one
    Increment,
    /// Subtract one
    Decrement,
    /// Shift left
    BitshiftLeft,
    /// Shift right
    BitshiftRight,
    /// Push null
    Null,
    /// Push integer 1
    True,
    /// Push integer 0
    False,
    /// Bitwise not
    BwNot,
    /// Bitwise and
    BwAnd,
    /// Bitwise or
    BwOr,
    /// Bitwise xor
    BwXor,
    /// Logical not
    LgNot,
    /// Logical and
    LgAnd,
    /// Logical or
    LgOr,
    /// Loose equality
    Equal,
    /// Loose inequality
    EqualNot,
    /// Greater than
    Greater,
    /// Greater than or equal
    GreaterEqual,
    /// Less than
    Less,
    /// Less than or equal
    LessEqual,
    /// Print and pop top of stack
    Print,
    /// Scene iteration (unsupported)
    EnumNext,
    /// Pop into the thread register
    SaveValue,
    /// Push the thread register
    LoadValue,
    /// Scene iteration (unsupported)
    With,
    /// Index an array or map
    GetElement,
    /// Store into an array or map
    SetElement,
    /// Build an array from `u32` values
    NewArray,
    /// Build a map from `u32` key/value pairs
    NewMap,
    /// Constant switch table
    SwitchTable,
    /// Record a failsafe offset `u16`
    Failsafe,
    /// Scene event (unsupported)
    Event,
    /// Push the type name of top of stack
    TypeOf,
    /// Instantiate with `u8` argument count
    New,
    /// Import class named by constant `u32` index
    Import,
    /// Dynamic switch (unsupported)
    Switch,
    /// Pop `u8` values
    PopN,
    /// Test property `u32` hash
    HasProperty,
    /// Module import (unsupported)
    ImportModule,
    /// Enum definition (unsupported)
    AddEnum,
    /// Enum definition (unsupported)
    NewEnum,
    /// Replace a class or instance with its parent class
    GetSuperclass,
    /// Push module local `u16` slot
    GetModuleLocal,
    /// Assign module local `u16` slot
    SetModuleLocal,
    /// Append top of stack as a new module local
    DefineModuleLocal,
    /// Namespace import (unsupported)
    UseNamespace,
    /// Define constant `u32` hash
    DefineConstant,
    /// Push inline `i32`
    Integer,
    /// Push inline `f32`
    Decimal,
}

const ALL: [OpCode; 77] = [
    OpCode::Error,
    OpCode::Constant,
    OpCode::DefineGlobal,
    OpCode::GetProperty,
    OpCode::SetProperty,
    OpCode::GetGlobal,
    OpCode::SetGlobal,
    OpCode::GetLocal,
    OpCode::SetLocal,
    OpCode::PrintStack,
    OpCode::Inherit,
    OpCode::Return,
    OpCode::Method,
    OpCode::Class,
    OpCode::Call,
    OpCode::Super,
    OpCode::Invoke,
    OpCode::Jump,
    OpCode::JumpIfFalse,
    OpCode::JumpBack,
    OpCode::Pop,
    OpCode::Copy,
    OpCode::Add,
    OpCode::Subtract,
    OpCode::Multiply,
    OpCode::Divide,
    OpCode::Modulo,
    OpCode::Negate,
    OpCode::Increment,
    OpCode::Decrement,
    OpCode::BitshiftLeft,
    OpCode::BitshiftRight,
    OpCode::Null,
    OpCode::True,
    OpCode::False,
    OpCode::BwNot,
    OpCode::BwAnd,
    OpCode::BwOr,
    OpCode::BwXor,
    OpCode::LgNot,
    OpCode::LgAnd,
    OpCode::LgOr,
    OpCode::Equal,
    OpCode::EqualNot,
    OpCode::Greater,
    OpCode::GreaterEqual,
    OpCode::Less,
    OpCode::LessEqual,
    OpCode::Print,
    OpCode::EnumNext,
    OpCode::SaveValue,
    OpCode::LoadValue,
    OpCode::With,
    OpCode::GetElement,
    OpCode::SetElement,
    OpCode::NewArray,
    OpCode::NewMap,
    OpCode::SwitchTable,
    OpCode::Failsafe,
    OpCode::Event,
    OpCode::TypeOf,
    OpCode::New,
    OpCode::Import,
    OpCode::Switch,
    OpCode::PopN,
    OpCode::HasProperty,
    OpCode::ImportModule,
    OpCode::AddEnum,
    OpCode::NewEnum,
    OpCode::GetSuperclass,
    OpCode::GetModuleLocal,
    OpCode::SetModuleLocal,
    OpCode::DefineModuleLocal,
    OpCode::UseNamespace,
    OpCode::DefineConstant,
    OpCode::Integer,
    OpCode::Decimal,
];

impl OpCode {
    /// Decode a raw instruction byte
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        ALL.get(byte as usize).copied()
    }

    /// The raw instruction byte
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Canonical `OP_*` name, as shown in disassembly and traces
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Error => "OP_ERROR",
            OpCode::Constant => "OP_CONSTANT",
            OpCode::DefineGlobal => "OP_DEFINE_GLOBAL",
            OpCode::GetProperty => "OP_GET_PROPERTY",
            OpCode::SetProperty => "OP_SET_PROPERTY",
            OpCode::GetGlobal => "OP_GET_GLOBAL",
            OpCode::SetGlobal => "OP_SET_GLOBAL",
            OpCode::GetLocal => "OP_GET_LOCAL",
            OpCode::SetLocal => "OP_SET_LOCAL",
            OpCode::PrintStack => "OP_PRINT_STACK",
            OpCode::Inherit => "OP_INHERIT",
            OpCode::Return => "OP_RETURN",
            OpCode::Method => "OP_METHOD",
            OpCode::Class => "OP_CLASS",
            OpCode::Call => "OP_CALL",
            OpCode::Super => "OP_SUPER",
            OpCode::Invoke => "OP_INVOKE",
            OpCode::Jump => "OP_JUMP",
            OpCode::JumpIfFalse => "OP_JUMP_IF_FALSE",
            OpCode::JumpBack => "OP_JUMP_BACK",
            OpCode::Pop => "OP_POP",
            OpCode::Copy => "OP_COPY",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Modulo => "OP_MODULO",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Increment => "OP_INCREMENT",
            OpCode::Decrement => "OP_DECREMENT",
            OpCode::BitshiftLeft => "OP_BITSHIFT_LEFT",
            OpCode::BitshiftRight => "OP_BITSHIFT_RIGHT",
            OpCode::Null => "OP_NULL",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::BwNot => "OP_BW_NOT",
            OpCode::BwAnd => "OP_BW_AND",
            OpCode::BwOr => "OP_BW_OR",
            OpCode::BwXor => "OP_BW_XOR",
            OpCode::LgNot => "OP_LG_NOT",
            OpCode::LgAnd => "OP_LG_AND",
            OpCode::LgOr => "OP_LG_OR",
            OpCode::Equal => "OP_EQUAL",
            OpCode::EqualNot => "OP_EQUAL_NOT",
            OpCode::Greater => "OP_GREATER",
            OpCode::GreaterEqual => "OP_GREATER_EQUAL",
            OpCode::Less => "OP_LESS",
            OpCode::LessEqual => "OP_LESS_EQUAL",
            OpCode::Print => "OP_PRINT",
            OpCode::EnumNext => "OP_ENUM_NEXT",
            OpCode::SaveValue => "OP_SAVE_VALUE",
            OpCode::LoadValue => "OP_LOAD_VALUE",
            OpCode::With => "OP_WITH",
            OpCode::GetElement => "OP_GET_ELEMENT",
            OpCode::SetElement => "OP_SET_ELEMENT",
            OpCode::NewArray => "OP_NEW_ARRAY",
            OpCode::NewMap => "OP_NEW_MAP",
            OpCode::SwitchTable => "OP_SWITCH_TABLE",
            OpCode::Failsafe => "OP_FAILSAFE",
            OpCode::Event => "OP_EVENT",
            OpCode::TypeOf => "OP_TYPEOF",
            OpCode::New => "OP_NEW",
            OpCode::Import => "OP_IMPORT",
            OpCode::Switch => "OP_SWITCH",
            OpCode::PopN => "OP_POPN",
            OpCode::HasProperty => "OP_HAS_PROPERTY",
            OpCode::ImportModule => "OP_IMPORT_MODULE",
            OpCode::AddEnum => "OP_ADD_ENUM",
            OpCode::NewEnum => "OP_NEW_ENUM",
            OpCode::GetSuperclass => "OP_GET_SUPERCLASS",
            OpCode::GetModuleLocal => "OP_GET_MODULE_LOCAL",
            OpCode::SetModuleLocal => "OP_SET_MODULE_LOCAL",
            OpCode::DefineModuleLocal => "OP_DEFINE_MODULE_LOCAL",
            OpCode::UseNamespace => "OP_USE_NAMESPACE",
            OpCode::DefineConstant => "OP_DEFINE_CONSTANT",
            OpCode::Integer => "OP_INTEGER",
            OpCode::Decimal => "OP_DECIMAL",
        }
    }

    /// Size in bytes of the fixed operands following this opcode.
    ///
    /// Returns `None` for `OP_SWITCH_TABLE`, whose size depends on its
    /// entry count, and for the scene opcodes this VM does not execute.
    pub fn operand_size(self) -> Option<usize> {
        let size = match self {
            OpCode::Constant
            | OpCode::DefineGlobal
            | OpCode::GetProperty
            | OpCode::SetProperty
            | OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::Inherit
            | OpCode::NewArray
            | OpCode::NewMap
            | OpCode::Import
            | OpCode::HasProperty
            | OpCode::DefineConstant
            | OpCode::Integer
            | OpCode::Decimal => 4,
            OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::Call
            | OpCode::Copy
            | OpCode::New
            | OpCode::PopN => 1,
            OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpBack
            | OpCode::Failsafe
            | OpCode::GetModuleLocal
            | OpCode::SetModuleLocal => 2,
            OpCode::Class => 5,
            OpCode::Method => 5,
            OpCode::Invoke => 6,
            OpCode::SwitchTable
            | OpCode::EnumNext
            | OpCode::With
            | OpCode::Event
            | OpCode::Switch
            | OpCode::ImportModule
            | OpCode::AddEnum
            | OpCode::NewEnum
            | OpCode::UseNamespace => return None,
            _ => 0,
        };
        Some(size)
    }

    /// Scene-bound opcodes that need a host scene graph to execute
    pub fn is_scene_bound(self) -> bool {
        matches!(
            self,
            OpCode::With
                | OpCode::Event
                | OpCode::EnumNext
                | OpCode::AddEnum
                | OpCode::NewEnum
                | OpCode::UseNamespace
                | OpCode::ImportModule
                | OpCode::Switch
        )
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
