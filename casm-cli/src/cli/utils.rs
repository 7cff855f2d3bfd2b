use std::path::Path;

use anyhow::{Context, Result};
use casm_spec::Program;

/// Load a JSON program, or assemble a `.casm` source file
pub fn load_program(path: &Path) -> Result<Program> {
    let is_source = path.extension().is_some_and(|ext| ext == "casm");
    if is_source {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        casm_assembler::assemble(&source)
            .with_context(|| format!("failed to assemble {}", path.display()))
    } else {
        Program::from_file(path).with_context(|| format!("failed to load {}", path.display()))
    }
}
