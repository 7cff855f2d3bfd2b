//! Cairo Assembler
//!
//! Assemble Cairo assembly text into bytecode.
//!
//! ## Example
//!
//! ```rust
//! use casm_assembler::assemble;
//!
//! let source = r#"
//!     [ap] = [fp - 3] + 1, ap++;
//!     ret;
//! "#;
//!
//! let program = assemble(source).unwrap();
//! assert_eq!(program.bytecode.len(), 3);
//! ```

pub mod assembler;
pub mod encoder;
pub mod error;
pub mod lexer;
pub mod parser;

pub use assembler::{assemble, assemble_bytecode};
pub use encoder::{encode, lower, Lowered};
pub use error::{AssemblerError, Result};
pub use parser::{parse, ParsedInstruction, Statement};
