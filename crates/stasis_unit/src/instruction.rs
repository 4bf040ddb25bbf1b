//! Instruction variants carried by a method body.

use std::fmt;

/// Opcode of the unconditional method exit.
pub const OP_RETURN: u8 = 0xB1;

/// Opcode of a call to a named, zero-argument external procedure.
pub const OP_CALL: u8 = 0xB8;

/// A single instruction in a method body.
///
/// Only exits and calls are modelled. All other instructions are opaque: their
/// opcode and operand bytes are preserved exactly and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Unconditional exit from the current method.
    Return,
    /// Invocation of a named external zero-argument procedure.
    Call {
        /// Fully qualified name of the procedure, e.g. `stasis/Hooks.afterRunFinishedSuccessfully`.
        target: String,
    },
    /// Any other instruction, passed through untouched.
    Opaque {
        /// The raw opcode. Never [`OP_RETURN`] or [`OP_CALL`].
        opcode: u8,
        /// Raw operand bytes (at most 255).
        operands: Vec<u8>,
    },
}

impl Instruction {
    /// Creates a call instruction for the given target.
    pub fn call(target: impl Into<String>) -> Self {
        Instruction::Call {
            target: target.into(),
        }
    }

    /// Creates an opaque instruction.
    pub fn opaque(opcode: u8, operands: impl Into<Vec<u8>>) -> Self {
        Instruction::Opaque {
            opcode,
            operands: operands.into(),
        }
    }

    /// Returns `true` for the unconditional exit instruction.
    pub fn is_return(&self) -> bool {
        matches!(self, Instruction::Return)
    }

    /// Returns the call target if this is a call.
    pub fn call_target(&self) -> Option<&str> {
        match self {
            Instruction::Call { target } => Some(target),
            _ => None,
        }
    }

    /// Returns the opcode this instruction encodes to.
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::Return => OP_RETURN,
            Instruction::Call { .. } => OP_CALL,
            Instruction::Opaque { opcode, .. } => *opcode,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Return => write!(f, "return"),
            Instruction::Call { target } => write!(f, "call {target}"),
            Instruction::Opaque { opcode, operands } => {
                write!(f, "op 0x{opcode:02x}")?;
                if !operands.is_empty() {
                    write!(f, " [")?;
                    for (i, b) in operands.iter().enumerate() {
                        if i > 0 {
                            write!(f, " ")?;
                        }
                        write!(f, "{b:02x}")?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
        }
    }
}
