//! # Cairo VM Runtime
//!
//! Execute compiled Cairo programs.
//!
//! ## Features
//!
//! - **Segmented memory**: write-once cells, relocation to a linear address space
//! - **Step engine**: operand deduction, lazy operand reads, pc/ap/fp updates
//! - **Hints**: pluggable [`HintRunner`] with a scope stack and the core hint set
//! - **Builtins**: output, range checks and bitwise
//! - **Files**: binary trace and memory files
//!
//! ## Example
//!
//! ```rust,no_run
//! use casm_runtime::{run_program, VmConfig};
//! use casm_spec::Program;
//!
//! let program = Program::from_file("program.json").unwrap();
//! let result = run_program(&program, &[], VmConfig::default()).unwrap();
//! println!("Steps: {}", result.steps);
//! ```

pub mod args;
pub mod builtins;
pub mod error;
pub mod execute;
pub mod hint;
pub mod io;
pub mod memory;
pub mod state;
pub mod vm;

pub use args::{parse_args, CairoArg};
pub use builtins::BuiltinRunner;
pub use error::{BuiltinError, HintError, MemoryError, Result, RuntimeError, StepError};
pub use execute::{compute_step, execute_step, StepOutcome};
pub use hint::{CoreHintRunner, HintContext, HintRunner, NoHintRunner, ScopeManager};
pub use memory::Memory;
pub use state::{HaltReason, Registers, RelocatedTraceEntry};
pub use vm::{proof_mode_steps, run_program, ExecutionResult, Vm, VmConfig};

/// Simple execution helper
///
/// Runs a program with the default configuration and returns its outputs.
pub fn run(program: &casm_spec::Program) -> Result<Vec<casm_spec::Felt>> {
    Ok(run_program(program, &[], VmConfig::default())?.outputs)
}
