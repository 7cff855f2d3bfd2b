//! Assembler errors

use casm_spec::EncodeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("Syntax error at line {line}, column {column}: {message}")]
    SyntaxError {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unexpected token at line {line}, column {column}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    #[error("Unknown instruction at line {line}, column {column}: {name}")]
    UnknownMnemonic {
        line: usize,
        column: usize,
        name: String,
    },

    #[error("Unterminated instruction at line {line}, column {column}: missing ';'")]
    UnterminatedInstruction { line: usize, column: usize },

    #[error("Offset out of range at line {line}, column {column}: {value} is not in [-32768, 32767]")]
    OffsetOutOfRange {
        line: usize,
        column: usize,
        value: i64,
    },

    #[error("Invalid immediate value at line {line}, column {column}: {text}")]
    InvalidImmediate {
        line: usize,
        column: usize,
        text: String,
    },

    #[error("Invalid instruction at line {line}, column {column}: {reason}")]
    InvalidCombination {
        line: usize,
        column: usize,
        reason: String,
    },

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl AssemblerError {
    /// Source position, when the error has one
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            AssemblerError::SyntaxError { line, column, .. }
            | AssemblerError::UnexpectedToken { line, column, .. }
            | AssemblerError::UnknownMnemonic { line, column, .. }
            | AssemblerError::UnterminatedInstruction { line, column }
            | AssemblerError::OffsetOutOfRange { line, column, .. }
            | AssemblerError::InvalidImmediate { line, column, .. }
            | AssemblerError::InvalidCombination { line, column, .. } => Some((*line, *column)),
            AssemblerError::Encode(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssemblerError>;
