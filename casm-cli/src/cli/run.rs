use std::path::PathBuf;

use anyhow::{Context, Result};
use casm_runtime::{io, parse_args, run_program, VmConfig};
use casm_spec::Layout;
use clap::Parser;

use super::utils::load_program;

/// Run a program and write its trace and memory files
#[derive(Debug, Clone, Parser)]
pub struct RunCmd {
    /// Program file: JSON, or `.casm` assembly
    pub program: PathBuf,

    /// Binary trace output
    #[arg(long)]
    pub trace: Option<PathBuf>,

    /// Binary memory output
    #[arg(long)]
    pub memory: Option<PathBuf>,

    /// Builtin layout
    #[arg(long, default_value = "plain")]
    pub layout: String,

    /// Pad the run to a power-of-two number of steps
    #[arg(long)]
    pub proof_mode: bool,

    /// Entry point arguments, e.g. `1 -2 [3 4]`
    #[arg(long)]
    pub args: Option<String>,

    /// Entry point offset, defaults to the program's main entry point
    #[arg(long)]
    pub entrypoint: Option<u64>,

    #[arg(long, default_value_t = VmConfig::default().max_steps)]
    pub max_steps: u64,

    /// Print the output builtin values
    #[arg(long)]
    pub print_output: bool,
}

impl RunCmd {
    pub fn execute(&self) -> Result<()> {
        let program = load_program(&self.program)?;
        let layout: Layout = self.layout.parse()?;
        let args = match &self.args {
            Some(text) => parse_args(text)?,
            None => Vec::new(),
        };
        let config = VmConfig {
            layout,
            proof_mode: self.proof_mode,
            max_steps: self.max_steps,
            entrypoint: self.entrypoint,
        };

        let result = run_program(&program, &args, config)
            .with_context(|| format!("failed to run {}", self.program.display()))?;
        tracing::info!(steps = result.steps, "run complete");

        if let Some(path) = &self.trace {
            io::write_trace_file(path, &result.trace)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        if let Some(path) = &self.memory {
            io::write_memory_file(path, &result.memory)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        if self.print_output {
            println!("Program output:");
            for value in &result.outputs {
                println!("  {}", value.to_bigint());
            }
        }
        Ok(())
    }
}
