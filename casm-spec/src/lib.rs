//! # Cairo VM Specification
//!
//! Core types shared by the runtime, the assembler and the disassembler.
//!
//! ## Key Features
//! - Stark prime field elements (`p = 2^251 + 17 * 2^192 + 1`)
//! - Relocatable memory addresses and tagged memory values
//! - 64-bit instruction words with one-hot flag groups
//! - JSON program files with hints and entry points
//! - SHARP layouts and builtin names

pub mod encoding;
pub mod error;
pub mod field;
pub mod hint;
pub mod instruction;
pub mod layout;
pub mod program;
pub mod value;

pub use error::{DecodeError, EncodeError, MathError, ProgramError, Result, SpecError};
pub use field::{Felt, FeltError, STARK_PRIME_DEC, STARK_PRIME_HEX};
pub use hint::{
    BinOpOperand, CellRef, CoreHint, DerefOrImmediate, HintDecodeError, Operation, ResOperand,
};
pub use instruction::{
    ApUpdate, FlagGroup, Instruction, Op1Source, Opcode, PcUpdate, Register, ResLogic,
};
pub use layout::{Builtin, Layout};
pub use program::{EntryPoint, EntryPointsByType, Program};
pub use value::{MemoryAddress, MemoryValue};

/// Upper bound (exclusive) of values accepted by the range-check builtin
pub const RANGE_CHECK_BOUND_BITS: u32 = 128;

/// Largest positive instruction offset
pub const MAX_OFFSET: i16 = i16::MAX;

/// Smallest negative instruction offset
pub const MIN_OFFSET: i16 = i16::MIN;
