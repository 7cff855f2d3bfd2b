//! # Cairo Disassembler
//!
//! Disassemble Cairo bytecode into assembly text that the assembler accepts.
//!
//! Words without a surface form are listed as `dw` data, so
//! `assemble(disassemble(bytecode))` always gives back `bytecode`.
//!
//! ## Example
//!
//! ```rust
//! use casm_disassembler::disassemble_bytecode;
//! use casm_spec::Felt;
//!
//! let asm = disassemble_bytecode(&[Felt::from(0x208b_7fff_7fff_7ffeu64)]).unwrap();
//! assert!(asm.contains("ret;"));
//! ```

pub mod decoder;
pub mod disassembler;
pub mod error;
pub mod formatter;

pub use decoder::{decode, is_expressible, Decoded, DecodedItem};
pub use disassembler::{disassemble, disassemble_bytecode, disassemble_file};
pub use error::{DisassemblerError, Result};
pub use formatter::format;
