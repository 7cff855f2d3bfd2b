//! Main assembler logic

use crate::encoder::encode;
use crate::error::Result;
use crate::parser::parse;
use casm_spec::{Felt, Program};

/// Assemble source text into raw bytecode words
pub fn assemble_bytecode(source: &str) -> Result<Vec<Felt>> {
    let mut bytecode = Vec::new();
    for instruction in parse(source)? {
        bytecode.extend(encode(&instruction)?);
    }
    Ok(bytecode)
}

/// Assemble source text into a program
///
/// The program has no hints and enters at offset 0 with no builtins.
pub fn assemble(source: &str) -> Result<Program> {
    Ok(Program::from_bytecode(assemble_bytecode(source)?))
}
