mod assemble;
mod disassemble;
mod run;
mod utils;

pub use assemble::AssembleCmd;
pub use disassemble::DisassembleCmd;
pub use run::RunCmd;
