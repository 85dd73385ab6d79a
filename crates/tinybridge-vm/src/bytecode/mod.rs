//! Bytecode for compiled Tiny functions.
//!
//! The VM is a stack machine. Locals live in the frame's slots at the bottom
//! of the frame, the operand stack sits above them.

mod chunk;
mod constant;

pub use chunk::Chunk;
pub use constant::{Constant, ConstantPool};

/// One VM instruction.
///
/// Jump targets are absolute instruction offsets within the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from the unit's pool.
    Const(u32),
    PushNull,
    PushTrue,
    PushFalse,

    // =========================================================================
    // Stack and variables
    // =========================================================================
    Pop,
    LoadLocal(u32),
    /// Pop into a local slot.
    StoreLocal(u32),
    LoadGlobal(u32),
    /// Pop into a global slot.
    StoreGlobal(u32),

    // =========================================================================
    // Operators
    // =========================================================================
    Neg,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Fail unless the top of the stack is a bool. Leaves it in place.
    CheckBool,

    // =========================================================================
    // Control flow
    // =========================================================================
    Jump(u32),
    /// Pop a bool and jump if it is false.
    JumpIfFalse(u32),
    Call { function: u32, argc: u8 },
    CallForeign { function: u32, argc: u8 },
    Return,
}

impl Instr {
    /// Operator spelling, for runtime diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            Instr::Neg | Instr::Sub => "-",
            Instr::Not => "!",
            Instr::Add => "+",
            Instr::Mul => "*",
            Instr::Div => "/",
            Instr::Rem => "%",
            Instr::Eq => "==",
            Instr::Ne => "!=",
            Instr::Lt => "<",
            Instr::Le => "<=",
            Instr::Gt => ">",
            Instr::Ge => ">=",
            _ => "?",
        }
    }
}
