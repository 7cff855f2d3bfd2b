use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// Assemble a `.casm` source into a JSON program
#[derive(Debug, Clone, Parser)]
pub struct AssembleCmd {
    pub source: PathBuf,

    /// Output file; defaults to the source path with a `.json` extension
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl AssembleCmd {
    pub fn execute(&self) -> Result<()> {
        let source = std::fs::read_to_string(&self.source)
            .with_context(|| format!("failed to read {}", self.source.display()))?;
        let program = casm_assembler::assemble(&source)
            .with_context(|| format!("failed to assemble {}", self.source.display()))?;

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| self.source.with_extension("json"));
        std::fs::write(&output, program.to_json()?)
            .with_context(|| format!("failed to write {}", output.display()))?;
        tracing::info!(words = program.bytecode.len(), path = %output.display(), "assembled");
        Ok(())
    }
}
