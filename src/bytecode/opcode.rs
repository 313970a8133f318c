//! Bytecode instruction definitions for the Pidgin VM.

/// Opcodes for the bytecode virtual machine.
///
/// Discriminants are grouped by tens so related instructions share a decade
/// and the set can grow without renumbering. All multi-byte operands are
/// big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // ============ Literals & Constants ============
    /// Push integer 0
    Const0 = 0,
    /// Push integer 1
    Const1 = 1,
    /// Push integer -1
    ConstMinus1 = 2,
    /// Push nothing
    Nothing = 3,
    /// Push true
    Tru = 4,
    /// Push false
    Lie = 5,
    /// Push constant from the pool: CONSTANT <index:u16>
    Constant = 6,
    /// Push inline 8-bit integer: CONST_I8 <value:i8>
    ConstI8 = 7,
    /// Push inline 16-bit integer: CONST_I16 <value:i16>
    ConstI16 = 8,

    // ============ Arithmetic ============
    /// a + b (polymorphic: integers add, strings concatenate)
    Add = 10,
    /// a - b
    Sub = 11,
    /// a * b
    Mul = 12,
    /// a / b (truncating integer division)
    Div = 13,
    /// -a
    Negate = 14,

    // ============ Comparison ============
    /// a be b
    Equal = 20,
    /// a no be b
    NotEqual = 21,
    /// a big pass b
    Greater = 22,
    /// a no reach b
    Less = 23,

    // ============ Logical ============
    /// no be a / !a
    ///
    /// `and` and `abi`/`or` have no opcode: the compiler lowers them to
    /// short-circuit jumps.
    Not = 30,

    // ============ Variables ============
    /// Get local at slot 0
    GetLocal0 = 35,
    /// Get local at slot 1
    GetLocal1 = 36,
    /// Get local at slot 2
    GetLocal2 = 37,
    /// Get local at slot 3
    GetLocal3 = 38,
    /// Get local: GET_LOCAL <slot:u8>
    GetLocal = 39,
    /// Set local at slot 0 (peeks, does not pop)
    SetLocal0 = 40,
    /// Set local at slot 1 (peeks, does not pop)
    SetLocal1 = 41,
    /// Set local: SET_LOCAL <slot:u8> (peeks, does not pop)
    SetLocal = 42,
    /// Get global: GET_GLOBAL <name_index:u16>
    GetGlobal = 43,
    /// Set global: SET_GLOBAL <name_index:u16> (peeks, does not pop)
    SetGlobal = 44,

    // ============ Control Flow ============
    /// Unconditional jump: JUMP <offset:i16>
    Jump = 45,
    /// Pop condition, jump forward if falsey: JUMP_IF_LIE <offset:i16>
    JumpIfLie = 46,
    /// Pop condition, jump forward if truthy: JUMP_IF_TRU <offset:i16>
    JumpIfTru = 47,
    /// Jump backward: LOOP <offset:u16>
    Loop = 48,

    // ============ Functions ============
    /// Call with 0 arguments
    Call0 = 55,
    /// Call with 1 argument
    Call1 = 56,
    /// Call with 2 arguments
    Call2 = 57,
    /// Call: CALL <arg_count:u8>
    Call = 58,
    /// Push a function value from the pool: CLOSURE <func_index:u16>
    Closure = 59,
    /// Return the block's trailing value from a function
    Return = 60,
    /// Explicit return (`bring`)
    Bring = 61,

    // ============ Builtins ============
    /// Optimized print: YARN <arg_count:u8>
    Yarn = 65,
    /// Call a builtin: BUILTIN <builtin_index:u8> <arg_count:u8>
    Builtin = 66,

    // ============ Stack ============
    /// Pop and discard the top value
    Pop = 75,
    /// Duplicate the top value
    Dup = 76,

    // ============ Strings ============
    /// String concatenation (stringifies both operands)
    Concat = 80,

    // ============ Special ============
    /// Stop execution, leaving the stack intact
    Halt = 85,
}

impl OpCode {
    /// Get the number of operand bytes that follow this opcode.
    pub fn operand_size(self) -> usize {
        use OpCode::*;
        match self {
            Const0 | Const1 | ConstMinus1 | Nothing | Tru | Lie | Add | Sub | Mul | Div
            | Negate | Equal | NotEqual | Greater | Less | Not | GetLocal0 | GetLocal1
            | GetLocal2 | GetLocal3 | SetLocal0 | SetLocal1 | Call0 | Call1 | Call2 | Return
            | Bring | Pop | Dup | Concat | Halt => 0,

            ConstI8 | GetLocal | SetLocal | Call | Yarn => 1,

            ConstI16 | Constant | GetGlobal | SetGlobal | Jump | JumpIfLie | JumpIfTru | Loop
            | Closure | Builtin => 2,
        }
    }

    /// Decode a byte into an opcode. Returns `None` for bytes in the gaps
    /// between decades.
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        use OpCode::*;
        Some(match byte {
            0 => Const0,
            1 => Const1,
            2 => ConstMinus1,
            3 => Nothing,
            4 => Tru,
            5 => Lie,
            6 => Constant,
            7 => ConstI8,
            8 => ConstI16,
            10 => Add,
            11 => Sub,
            12 => Mul,
            13 => Div,
            14 => Negate,
            20 => Equal,
            21 => NotEqual,
            22 => Greater,
            23 => Less,
            30 => Not,
            35 => GetLocal0,
            36 => GetLocal1,
            37 => GetLocal2,
            38 => GetLocal3,
            39 => GetLocal,
            40 => SetLocal0,
            41 => SetLocal1,
            42 => SetLocal,
            43 => GetGlobal,
            44 => SetGlobal,
            45 => Jump,
            46 => JumpIfLie,
            47 => JumpIfTru,
            48 => Loop,
            55 => Call0,
            56 => Call1,
            57 => Call2,
            58 => Call,
            59 => Closure,
            60 => Return,
            61 => Bring,
            65 => Yarn,
            66 => Builtin,
            75 => Pop,
            76 => Dup,
            80 => Concat,
            85 => Halt,
            _ => return None,
        })
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}
