//! Builtins and SHARP layouts
//!
//! A layout is a named, ordered set of enabled builtins. The order matters:
//! builtin segments are allocated, and their base pointers pushed on the
//! initial stack, in layout order.

use crate::error::ProgramError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Builtin {
    Output,
    Pedersen,
    RangeCheck,
    Ecdsa,
    Bitwise,
    EcOp,
    Keccak,
    Poseidon,
    RangeCheck96,
    AddMod,
    MulMod,
}

impl Builtin {
    pub const ALL: [Builtin; 11] = [
        Builtin::Output,
        Builtin::Pedersen,
        Builtin::RangeCheck,
        Builtin::Ecdsa,
        Builtin::Bitwise,
        Builtin::EcOp,
        Builtin::Keccak,
        Builtin::Poseidon,
        Builtin::RangeCheck96,
        Builtin::AddMod,
        Builtin::MulMod,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Output => "output",
            Builtin::Pedersen => "pedersen",
            Builtin::RangeCheck => "range_check",
            Builtin::Ecdsa => "ecdsa",
            Builtin::Bitwise => "bitwise",
            Builtin::EcOp => "ec_op",
            Builtin::Keccak => "keccak",
            Builtin::Poseidon => "poseidon",
            Builtin::RangeCheck96 => "range_check96",
            Builtin::AddMod => "add_mod",
            Builtin::MulMod => "mul_mod",
        }
    }

    /// Number of memory cells in one builtin instance
    pub fn cells_per_instance(&self) -> u64 {
        match self {
            Builtin::Output | Builtin::RangeCheck | Builtin::RangeCheck96 => 1,
            Builtin::Pedersen => 3,
            Builtin::Ecdsa => 2,
            Builtin::Bitwise => 5,
            Builtin::EcOp => 7,
            Builtin::Keccak => 16,
            Builtin::Poseidon => 6,
            Builtin::AddMod | Builtin::MulMod => 7,
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Builtin {
    type Err = ProgramError;

    /// Accepts `range_check`, `range_check_builtin` and `RangeCheck` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix("_builtin").unwrap_or(s);
        Builtin::ALL
            .iter()
            .copied()
            .find(|builtin| {
                builtin.name() == name || builtin.name().replace('_', "") == name.to_lowercase()
            })
            .ok_or_else(|| ProgramError::UnknownBuiltin(s.to_string()))
    }
}

/// SHARP layouts
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Plain,
    Small,
    Dex,
    Recursive,
    Starknet,
    StarknetWithKeccak,
    RecursiveLargeOutput,
    RecursiveWithPoseidon,
    AllSolidity,
    AllCairo,
}

impl Layout {
    pub const ALL: [Layout; 10] = [
        Layout::Plain,
        Layout::Small,
        Layout::Dex,
        Layout::Recursive,
        Layout::Starknet,
        Layout::StarknetWithKeccak,
        Layout::RecursiveLargeOutput,
        Layout::RecursiveWithPoseidon,
        Layout::AllSolidity,
        Layout::AllCairo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Layout::Plain => "plain",
            Layout::Small => "small",
            Layout::Dex => "dex",
            Layout::Recursive => "recursive",
            Layout::Starknet => "starknet",
            Layout::StarknetWithKeccak => "starknet_with_keccak",
            Layout::RecursiveLargeOutput => "recursive_large_output",
            Layout::RecursiveWithPoseidon => "recursive_with_poseidon",
            Layout::AllSolidity => "all_solidity",
            Layout::AllCairo => "all_cairo",
        }
    }

    /// Enabled builtins in allocation order
    pub fn builtins(&self) -> &'static [Builtin] {
        use Builtin::*;
        match self {
            Layout::Plain => &[],
            Layout::Small | Layout::Dex => &[Output, Pedersen, RangeCheck, Ecdsa],
            Layout::Recursive => &[Output, Pedersen, RangeCheck, Bitwise],
            Layout::Starknet => &[Output, Pedersen, RangeCheck, Ecdsa, Bitwise, EcOp, Poseidon],
            Layout::StarknetWithKeccak => &[
                Output, Pedersen, RangeCheck, Ecdsa, Bitwise, EcOp, Keccak, Poseidon,
            ],
            Layout::RecursiveLargeOutput | Layout::RecursiveWithPoseidon => {
                &[Output, Pedersen, RangeCheck, Bitwise, Poseidon]
            }
            Layout::AllSolidity => &[Output, Pedersen, RangeCheck, Ecdsa, Bitwise, EcOp],
            Layout::AllCairo => &[
                Output,
                Pedersen,
                RangeCheck,
                Ecdsa,
                Bitwise,
                EcOp,
                Keccak,
                Poseidon,
                RangeCheck96,
                AddMod,
                MulMod,
            ],
        }
    }

    pub fn supports(&self, builtin: Builtin) -> bool {
        self.builtins().contains(&builtin)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Layout {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::ALL
            .iter()
            .copied()
            .find(|layout| layout.name() == s)
            .ok_or_else(|| ProgramError::UnknownLayout(s.to_string()))
    }
}
