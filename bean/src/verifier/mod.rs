//! Verification of bytecode against the operand stack model.
//!
//! Every opcode has an entry in an [`OpcodeTable`], which decodes its operands and applies its effect to the
//! [`OperandStack`] and the [`Locals`]. The code verifier drives the entries over the bytecode of a method.

pub(crate) mod code;
pub(crate) mod context;
mod frames;
pub mod locals;
mod ops;
pub mod stack;
pub mod table;

pub use locals::{LocalSlot, Locals};
pub use stack::{OperandStack, Origin, Provenance, StackItem};
pub use table::{InstructionLength, OpcodeEntry, OpcodeTable, Profile};
