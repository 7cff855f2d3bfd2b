//! Disassembler errors

use casm_spec::ProgramError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisassemblerError {
    #[error("Failed to load program: {0}")]
    Program(#[from] ProgramError),

    #[error("Failed to write listing: {0}")]
    Format(#[from] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, DisassemblerError>;
