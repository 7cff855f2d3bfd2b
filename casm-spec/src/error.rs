//! # Error Types for casm-spec

use crate::field::{Felt, FeltError};
use crate::instruction::FlagGroup;
use crate::value::{MemoryAddress, MemoryValue};
use thiserror::Error;

/// Arithmetic on memory values and addresses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("Operation failed: {} + {}, offset out of range", .0.0, .0.1)]
    OffsetOverflow(Box<(MemoryAddress, String)>),

    #[error("Operation failed: {} + {}, can't add two addresses", .0.0, .0.1)]
    AddressAddition(Box<(MemoryAddress, MemoryAddress)>),

    #[error("Operation failed: {} - {}, addresses belong to different segments", .0.0, .0.1)]
    CrossSegmentSubtraction(Box<(MemoryAddress, MemoryAddress)>),

    #[error("Operation failed: {} - {}, can't subtract an address from a field element", .0.0, .0.1)]
    FeltMinusAddress(Box<(Felt, MemoryAddress)>),

    #[error("Operation failed: {} * {}, can't multiply these two values", .0.0, .0.1)]
    InvalidMul(Box<(MemoryValue, MemoryValue)>),

    #[error("Expected a field element but found address {0}")]
    ExpectedFelt(MemoryAddress),

    #[error("Expected an address but found field element {0}")]
    ExpectedAddress(Felt),

    #[error(transparent)]
    Felt(#[from] FeltError),
}

/// Failure to decode an instruction word
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid instruction encoding: {0:#x} is larger than 64 bits")]
    TooLarge(Felt),

    #[error("Invalid instruction encoding: {0:#018x} has the reserved bit 63 set")]
    ReservedBitSet(u64),

    #[error("Invalid instruction encoding: {word:#018x} sets more than one {group} flag")]
    NonOneHotFlags { group: FlagGroup, word: u64 },

    #[error("Invalid instruction encoding: {word:#018x} is a jnz with {reason}")]
    InvalidJnz { word: u64, reason: &'static str },

    #[error("Invalid instruction encoding: {0:#018x} is a call with an explicit ap update")]
    InvalidCallApUpdate(u64),
}

/// Instruction that cannot be packed into a word
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("Invalid instruction: {0}")]
    InvalidCombination(&'static str),
}

/// Program file errors
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("Invalid program JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Program prime {0} does not match the Stark prime")]
    PrimeMismatch(String),

    #[error("Invalid hint pc {0:?}")]
    InvalidHintPc(String),

    #[error("Unknown layout {0:?}")]
    UnknownLayout(String),

    #[error("Unknown builtin {0:?}")]
    UnknownBuiltin(String),

    #[error("Program has no bytecode")]
    EmptyProgram,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SpecError {
    #[error(transparent)]
    Felt(#[from] FeltError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Program(#[from] ProgramError),
}

pub type Result<T> = std::result::Result<T, SpecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError::TooLarge(Felt::from(u128::MAX));
        assert!(err.to_string().contains("larger than 64 bits"));

        let err = DecodeError::NonOneHotFlags {
            group: FlagGroup::PcUpdate,
            word: 0x0180_0000_0000_0000,
        };
        assert_eq!(
            err.to_string(),
            "Invalid instruction encoding: 0x0180000000000000 sets more than one pc_update flag"
        );

        let err = MathError::ExpectedFelt(MemoryAddress::new(1, 2));
        assert_eq!(err.to_string(), "Expected a field element but found address 1:2");
    }

    #[test]
    fn test_spec_error_from() {
        let err: SpecError = FeltError::DivisionByZero.into();
        assert_eq!(err.to_string(), "Division by zero");

        let err: SpecError = ProgramError::UnknownLayout("tiny".into()).into();
        assert!(err.to_string().contains("tiny"));
    }
}
