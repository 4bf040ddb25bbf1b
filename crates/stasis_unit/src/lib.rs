//! Compiled-unit model and binary codec.
//!
//! A compiled unit is the host's binary representation of one type: a name and
//! an ordered list of methods, each an ordered instruction sequence. This crate
//! decodes unit bytes into a mutable [`CompiledUnit`], lets callers locate
//! methods by name, and re-encodes the unit with freshly computed length and
//! checksum metadata.
//!
//! Only two instructions are understood: [`Instruction::Return`] and
//! [`Instruction::Call`]. Everything else is carried through as
//! [`Instruction::Opaque`] payload and re-emitted verbatim.

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod instruction;
pub mod unit;

pub use codec::{decode, encode, UNIT_FORMAT_VERSION, UNIT_MAGIC};
pub use error::UnitError;
pub use instruction::{Instruction, OP_CALL, OP_RETURN};
pub use unit::{CompiledMethod, CompiledUnit, MethodId};
