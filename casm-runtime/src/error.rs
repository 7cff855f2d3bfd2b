//! Runtime error types for the Cairo VM

use casm_spec::{
    Builtin, DecodeError, Felt, Instruction, Layout, MathError, MemoryAddress, MemoryValue,
    ProgramError,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("Memory at address {0} is uninitialised")]
    UninitialisedRead(MemoryAddress),

    #[error(
        "Write-once violation at address {}: cannot overwrite {} with {}",
        .0.0, .0.1, .0.2
    )]
    InconsistentWrite(Box<(MemoryAddress, MemoryValue, MemoryValue)>),

    #[error("Cannot access segment {segment}: only {allocated} segments are allocated")]
    UnallocatedSegment { segment: usize, allocated: usize },

    #[error("Cannot write through the unknown address sentinel")]
    UnknownAddressWrite,

    #[error("Offset {0} exceeds the maximum segment size")]
    SegmentTooLarge(u64),

    #[error("Address {0} does not fit in the relocated address space")]
    RelocationOverflow(MemoryAddress),

    #[error("Value at {address} is not a field element: {source}")]
    TypeMismatch {
        address: MemoryAddress,
        source: MathError,
    },

    #[error(transparent)]
    Math(#[from] MathError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuiltinError {
    #[error("Range check failed at {address}: {value} does not fit in {bits} bits")]
    RangeCheckOutOfBounds {
        address: MemoryAddress,
        value: Felt,
        bits: u32,
    },

    #[error("Range check cell {0} holds an address")]
    RangeCheckNotFelt(MemoryAddress),

    #[error("Bitwise input at {address} does not fit in 251 bits: {value}")]
    BitwiseInputTooLarge { address: MemoryAddress, value: Felt },

    #[error("Bitwise input at {0} holds an address")]
    BitwiseInputNotFelt(MemoryAddress),
}

/// Failure of a single step, before pc context is attached
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Builtin(#[from] BuiltinError),

    #[error("An ASSERT_EQ instruction failed: {dst} != {res}")]
    AssertEqFailed { dst: MemoryValue, res: MemoryValue },

    #[error("Cannot deduce operands: dst={dst} op0={op0} op1={op1}")]
    UnderdeterminedOperands {
        dst: MemoryAddress,
        op0: MemoryAddress,
        op1: MemoryAddress,
    },

    #[error("jnz condition at {0} is an address, expected a field element")]
    JnzOnAddress(MemoryAddress),

    #[error("Absolute jump target {0} is not an address")]
    JumpTargetNotAddress(Felt),

    #[error("Instruction uses an unconstrained res")]
    UnconstrainedResUsed,

    #[error("ap {ap} is below fp {fp}")]
    ApBelowFp { ap: MemoryAddress, fp: MemoryAddress },

    #[error("CALL must write [ap] and [ap + 1], got dst={dst} op0={op0} with ap={ap}")]
    InvalidCallOperands {
        dst: MemoryAddress,
        op0: MemoryAddress,
        ap: MemoryAddress,
    },

    #[error("CALL expected {cell} = {expected}, found {found}")]
    CallFrameMismatch {
        cell: &'static str,
        expected: MemoryValue,
        found: MemoryValue,
    },
}

#[derive(Debug, Error)]
pub enum HintError {
    #[error("Unknown hint {0:?}")]
    UnknownHint(String),

    #[error("Hint code needs an external runner: {0:?}")]
    MissingHintCode(String),

    #[error("Malformed {name} hint: {reason}")]
    MalformedHint { name: String, reason: String },

    #[error("Scope variable {0:?} not found")]
    ScopeVariableNotFound(String),

    #[error("Scope variable {0:?} has an unexpected type")]
    ScopeVariableTypeMismatch(String),

    #[error("Cannot exit the main scope")]
    CannotExitMainScope,

    #[error("{hint}: {value} is out of range (expected below 2^{bits})")]
    ValueOutOfRange {
        hint: &'static str,
        value: Felt,
        bits: u32,
    },

    #[error("{0}: division by zero")]
    DivisionByZero(&'static str),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Math(#[from] MathError),
}

impl From<casm_spec::HintDecodeError> for HintError {
    fn from(err: casm_spec::HintDecodeError) -> Self {
        match err {
            casm_spec::HintDecodeError::Unknown(name) => HintError::UnknownHint(name),
            casm_spec::HintDecodeError::PythonCode(code) => HintError::MissingHintCode(code),
            casm_spec::HintDecodeError::Malformed { name, reason } => {
                HintError::MalformedHint { name, reason }
            }
        }
    }
}

fn describe(instruction: &Option<Instruction>) -> String {
    match instruction {
        Some(inst) => inst.to_string(),
        None => "undecoded".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Error at pc={pc} ({}): {source}", describe(.instruction))]
    Step {
        pc: MemoryAddress,
        instruction: Option<Instruction>,
        source: StepError,
    },

    #[error("Hint error at pc={pc}: {source}")]
    Hint { pc: MemoryAddress, source: HintError },

    #[error("Hint setup failed: {0}")]
    HintSetup(HintError),

    #[error("pc {0} ran past the end of the program segment")]
    PcOutOfProgram(MemoryAddress),

    #[error("Step limit exceeded: {0}")]
    StepLimitExceeded(u64),

    #[error("Builtin {builtin} is not part of layout {layout}")]
    BuiltinNotInLayout { builtin: Builtin, layout: Layout },

    #[error("Invalid program arguments: {0}")]
    InvalidArgs(String),

    #[error("Invalid {kind} file: {reason}")]
    MalformedFile { kind: &'static str, reason: String },

    #[error(transparent)]
    Builtin(#[from] BuiltinError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error("Encoding error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
