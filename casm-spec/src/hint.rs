//! Hint descriptions
//!
//! Hints are attached to program offsets in the program file. Their operands
//! are register-relative references resolved at hint time against the
//! current `ap`/`fp`. Only the description lives here; execution belongs to
//! the runtime.

use crate::field::Felt;
use crate::instruction::Register;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// `[ap + offset]` or `[fp + offset]`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub register: Register,
    pub offset: i16,
}

impl CellRef {
    pub fn ap(offset: i16) -> Self {
        CellRef {
            register: Register::Ap,
            offset,
        }
    }

    pub fn fp(offset: i16) -> Self {
        CellRef {
            register: Register::Fp,
            offset,
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            0 => write!(f, "[{}]", self.register),
            n if n < 0 => write!(f, "[{} - {}]", self.register, -(n as i32)),
            n => write!(f, "[{} + {}]", self.register, n),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Mul,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerefOrImmediate {
    Deref(CellRef),
    Immediate(Felt),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinOpOperand {
    pub op: Operation,
    pub a: CellRef,
    pub b: DerefOrImmediate,
}

/// Value-producing hint operand
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResOperand {
    Deref(CellRef),
    DoubleDeref(CellRef, i16),
    Immediate(Felt),
    BinOp(BinOpOperand),
}

/// Hints understood by the core hint runner
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreHint {
    AllocSegment {
        dst: CellRef,
    },
    TestLessThan {
        lhs: ResOperand,
        rhs: ResOperand,
        dst: CellRef,
    },
    TestLessThanOrEqual {
        lhs: ResOperand,
        rhs: ResOperand,
        dst: CellRef,
    },
    DivMod {
        lhs: ResOperand,
        rhs: ResOperand,
        quotient: CellRef,
        remainder: CellRef,
    },
    SquareRoot {
        value: ResOperand,
        dst: CellRef,
    },
    LinearSplit {
        value: ResOperand,
        scalar: ResOperand,
        max_x: ResOperand,
        x: CellRef,
        y: CellRef,
    },
    WideMul128 {
        lhs: ResOperand,
        rhs: ResOperand,
        high: CellRef,
        low: CellRef,
    },
    AllocConstantSize {
        size: ResOperand,
        dst: CellRef,
    },
    EnterScope,
    ExitScope,
    DebugPrint {
        start: ResOperand,
        end: ResOperand,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HintDecodeError {
    #[error("Unknown hint {0:?}")]
    Unknown(String),

    #[error("Hint needs an external code runner: {0:?}")]
    PythonCode(String),

    #[error("Malformed {name} hint: {reason}")]
    Malformed { name: String, reason: String },
}

impl CoreHint {
    pub fn name(&self) -> &'static str {
        match self {
            CoreHint::AllocSegment { .. } => "AllocSegment",
            CoreHint::TestLessThan { .. } => "TestLessThan",
            CoreHint::TestLessThanOrEqual { .. } => "TestLessThanOrEqual",
            CoreHint::DivMod { .. } => "DivMod",
            CoreHint::SquareRoot { .. } => "SquareRoot",
            CoreHint::LinearSplit { .. } => "LinearSplit",
            CoreHint::WideMul128 { .. } => "WideMul128",
            CoreHint::AllocConstantSize { .. } => "AllocConstantSize",
            CoreHint::EnterScope => "EnterScope",
            CoreHint::ExitScope => "ExitScope",
            CoreHint::DebugPrint { .. } => "DebugPrint",
        }
    }

    /// Interpret one entry of a program's hints table
    pub fn from_json(value: &Value) -> Result<CoreHint, HintDecodeError> {
        if let Some(code) = value.get("code").and_then(Value::as_str) {
            return Err(HintDecodeError::PythonCode(code.to_string()));
        }
        let name = match value {
            Value::String(name) => name.clone(),
            Value::Object(map) if map.len() == 1 => map.keys().cloned().next().unwrap_or_default(),
            other => return Err(HintDecodeError::Unknown(other.to_string())),
        };
        serde_json::from_value::<CoreHint>(value.clone()).map_err(|err| {
            if KNOWN_HINTS.contains(&name.as_str()) {
                HintDecodeError::Malformed {
                    name,
                    reason: err.to_string(),
                }
            } else {
                HintDecodeError::Unknown(name)
            }
        })
    }
}

const KNOWN_HINTS: [&str; 11] = [
    "AllocSegment",
    "TestLessThan",
    "TestLessThanOrEqual",
    "DivMod",
    "SquareRoot",
    "LinearSplit",
    "WideMul128",
    "AllocConstantSize",
    "EnterScope",
    "ExitScope",
    "DebugPrint",
];
