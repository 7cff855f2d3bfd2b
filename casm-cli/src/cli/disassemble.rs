use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use super::utils::load_program;

/// Print the assembly listing of a program
#[derive(Debug, Clone, Parser)]
pub struct DisassembleCmd {
    pub program: PathBuf,
}

impl DisassembleCmd {
    pub fn execute(&self) -> Result<()> {
        let program = load_program(&self.program)?;
        print!("{}", casm_disassembler::disassemble(&program)?);
        Ok(())
    }
}
