//! # Program file
//!
//! Compiled programs are JSON documents. The loader accepts both the current
//! shape (`bytecode`, `hints` as a list of `[pc, [hint, ...]]` pairs,
//! `entry_points_by_type`) and the legacy one (`data`, `hints` as an object
//! keyed by pc, top-level `builtins`). Unknown keys are ignored.
//!
//! Hints are kept as raw JSON: interpreting them is the hint runner's job.

use crate::error::ProgramError;
use crate::field::{Felt, STARK_PRIME_HEX};
use crate::layout::Builtin;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// A callable offset of the program with the builtins it expects
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    #[serde(default = "default_selector")]
    pub selector: Felt,
    pub offset: u64,
    #[serde(default)]
    pub builtins: Vec<String>,
}

fn default_selector() -> Felt {
    Felt::ZERO
}

impl EntryPoint {
    pub fn new(offset: u64, builtins: Vec<Builtin>) -> Self {
        Self {
            selector: Felt::ZERO,
            offset,
            builtins: builtins.iter().map(|b| b.name().to_string()).collect(),
        }
    }

    /// Builtins requested by this entry point, in declaration order
    pub fn builtin_list(&self) -> Result<Vec<Builtin>, ProgramError> {
        self.builtins.iter().map(|name| name.parse()).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct EntryPointsByType {
    #[serde(default)]
    pub external: Vec<EntryPoint>,
    #[serde(default)]
    pub l1_handler: Vec<EntryPoint>,
    #[serde(default)]
    pub constructor: Vec<EntryPoint>,
}

/// Compiled Cairo program
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub compiler_version: Option<String>,
    pub bytecode: Vec<Felt>,
    /// Hints keyed by program offset, in the order they must run
    pub hints: BTreeMap<u64, Vec<Value>>,
    pub entry_points: EntryPointsByType,
    /// Builtins listed at the top level of legacy programs
    pub builtins: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHints {
    Keyed(BTreeMap<String, Vec<Value>>),
    Listed(Vec<(u64, Vec<Value>)>),
}

#[derive(Deserialize)]
struct RawProgram {
    #[serde(default)]
    prime: Option<Value>,
    #[serde(default)]
    compiler_version: Option<String>,
    #[serde(default)]
    bytecode: Option<Vec<Felt>>,
    #[serde(default)]
    data: Option<Vec<Felt>>,
    #[serde(default)]
    hints: Option<RawHints>,
    #[serde(default)]
    entry_points_by_type: Option<EntryPointsByType>,
    #[serde(default)]
    builtins: Vec<String>,
}

/// The prime is not itself a field element, so it is compared as an integer
fn check_prime(prime: &Value) -> Result<(), ProgramError> {
    let text = match prime {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    let parsed = match text.strip_prefix("0x") {
        Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16),
        None => BigUint::parse_bytes(text.as_bytes(), 10),
    };
    match parsed {
        Some(value) if value == Felt::prime() => Ok(()),
        _ => Err(ProgramError::PrimeMismatch(text)),
    }
}

#[derive(Serialize)]
struct ProgramJson<'a> {
    prime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    compiler_version: Option<&'a str>,
    bytecode: &'a [Felt],
    hints: Vec<(u64, &'a Vec<Value>)>,
    entry_points_by_type: &'a EntryPointsByType,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    builtins: &'a [String],
}

impl Program {
    /// Build a hint-free program starting at offset 0
    pub fn from_bytecode(bytecode: Vec<Felt>) -> Self {
        Self {
            bytecode,
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ProgramError> {
        let raw: RawProgram = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProgramError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn from_raw(raw: RawProgram) -> Result<Self, ProgramError> {
        if let Some(prime) = &raw.prime {
            check_prime(prime)?;
        }

        let bytecode = raw
            .bytecode
            .or(raw.data)
            .ok_or(ProgramError::EmptyProgram)?;

        let hints = match raw.hints {
            None => BTreeMap::new(),
            Some(RawHints::Listed(list)) => {
                let mut hints = BTreeMap::new();
                for (pc, batch) in list {
                    hints.entry(pc).or_insert_with(Vec::new).extend(batch);
                }
                hints
            }
            Some(RawHints::Keyed(map)) => {
                let mut hints = BTreeMap::new();
                for (pc, batch) in map {
                    let pc = pc
                        .parse::<u64>()
                        .map_err(|_| ProgramError::InvalidHintPc(pc.clone()))?;
                    hints.insert(pc, batch);
                }
                hints
            }
        };

        Ok(Self {
            compiler_version: raw.compiler_version,
            bytecode,
            hints,
            entry_points: raw.entry_points_by_type.unwrap_or_default(),
            builtins: raw.builtins,
        })
    }

    pub fn to_json(&self) -> Result<String, ProgramError> {
        let json = ProgramJson {
            prime: STARK_PRIME_HEX.to_string(),
            compiler_version: self.compiler_version.as_deref(),
            bytecode: &self.bytecode,
            hints: self.hints.iter().map(|(pc, batch)| (*pc, batch)).collect(),
            entry_points_by_type: &self.entry_points,
            builtins: &self.builtins,
        };
        Ok(serde_json::to_string_pretty(&json)?)
    }

    /// Entry point used when none is selected: the first external entry
    /// point, or offset 0 with the top-level builtins
    pub fn main_entry_point(&self) -> EntryPoint {
        match self.entry_points.external.first() {
            Some(entry) => entry.clone(),
            None => EntryPoint {
                selector: Felt::ZERO,
                offset: 0,
                builtins: self.builtins.clone(),
            },
        }
    }

    /// Entry point at `offset`, inheriting declared builtins if one matches
    pub fn entry_point_at(&self, offset: u64) -> EntryPoint {
        self.entry_points
            .external
            .iter()
            .chain(&self.entry_points.l1_handler)
            .chain(&self.entry_points.constructor)
            .find(|entry| entry.offset == offset)
            .cloned()
            .unwrap_or_else(|| EntryPoint {
                selector: Felt::ZERO,
                offset,
                builtins: self.builtins.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }
}
