//! Register file and trace entries

use casm_spec::{MemoryAddress, Register};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three address registers of the Cairo machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registers {
    pub pc: MemoryAddress,
    pub ap: MemoryAddress,
    pub fp: MemoryAddress,
}

impl Registers {
    pub fn new(pc: MemoryAddress, ap: MemoryAddress, fp: MemoryAddress) -> Self {
        Self { pc, ap, fp }
    }

    /// Registers before the runner has initialised them
    pub fn unknown() -> Self {
        Self::new(
            MemoryAddress::UNKNOWN,
            MemoryAddress::UNKNOWN,
            MemoryAddress::UNKNOWN,
        )
    }

    #[inline]
    pub fn get(&self, register: Register) -> MemoryAddress {
        match register {
            Register::Ap => self.ap,
            Register::Fp => self.fp,
        }
    }

    pub fn is_known(&self) -> bool {
        !(self.pc.is_unknown() || self.ap.is_unknown() || self.fp.is_unknown())
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pc={} ap={} fp={}", self.pc, self.ap, self.fp)
    }
}

/// One row of the relocated trace, recorded before the step executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelocatedTraceEntry {
    pub pc: u64,
    pub ap: u64,
    pub fp: u64,
}

impl RelocatedTraceEntry {
    pub fn new(pc: u64, ap: u64, fp: u64) -> Self {
        Self { pc, ap, fp }
    }
}

impl From<(u64, u64, u64)> for RelocatedTraceEntry {
    fn from((pc, ap, fp): (u64, u64, u64)) -> Self {
        Self::new(pc, ap, fp)
    }
}

/// Why a run stopped without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// pc reached the return address saved by the bootstrap call
    Returned,
    /// pc reached the requested stop address
    ReachedPc,
}
