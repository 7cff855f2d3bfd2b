//! Cairo instruction set
//!
//! A Cairo instruction is a single field element that packs three signed
//! 16-bit offsets and fifteen flag bits. The flags form one-hot groups that
//! select the operand sources, the result computation, the register updates
//! and the opcode. This module holds the decoded, logical form; see
//! [`crate::encoding`] for the bit layout.

use crate::error::DecodeError;
use crate::field::Felt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address registers usable as operand bases
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Register {
    Ap,
    Fp,
}

impl Register {
    pub fn name(&self) -> &'static str {
        match self {
            Register::Ap => "ap",
            Register::Fp => "fp",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Base of the op1 address
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op1Source {
    /// `[[op0] + off_op1]`
    Op0,
    /// `[pc + 1]`, the word following the instruction
    Imm,
    Fp,
    Ap,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResLogic {
    Op1,
    Add,
    Mul,
    /// Only legal under `jnz`, where `res` is never consumed
    Unconstrained,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PcUpdate {
    Next,
    JumpAbs,
    JumpRel,
    Jnz,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApUpdate {
    Same,
    AddRes,
    Add1,
    /// Implied by `call`
    Add2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Nop,
    Call,
    Ret,
    AssertEq,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::AssertEq => "ASSERT_EQ",
        }
    }
}

/// One-hot flag groups of the instruction word
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagGroup {
    Op1Source,
    ResLogic,
    PcUpdate,
    ApUpdate,
    Opcode,
}

impl fmt::Display for FlagGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlagGroup::Op1Source => "op1_src",
            FlagGroup::ResLogic => "res_logic",
            FlagGroup::PcUpdate => "pc_update",
            FlagGroup::ApUpdate => "ap_update",
            FlagGroup::Opcode => "opcode",
        };
        write!(f, "{}", name)
    }
}

/// Decoded Cairo instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub off_dst: i16,
    pub off_op0: i16,
    pub off_op1: i16,
    pub dst_register: Register,
    pub op0_register: Register,
    pub op1_source: Op1Source,
    pub res_logic: ResLogic,
    pub pc_update: PcUpdate,
    pub ap_update: ApUpdate,
    pub opcode: Opcode,
}

impl Instruction {
    /// Number of memory words occupied, including the immediate
    #[inline]
    pub fn size(&self) -> u64 {
        match self.op1_source {
            Op1Source::Imm => 2,
            _ => 1,
        }
    }

    pub fn decode(word: &Felt) -> Result<Self, DecodeError> {
        crate::encoding::decode(word)
    }

    pub fn decode_u64(word: u64) -> Result<Self, DecodeError> {
        crate::encoding::decode_word(word)
    }

    pub fn encode(&self) -> Result<u64, crate::error::EncodeError> {
        crate::encoding::encode(self)
    }

    /// Whether op0 has to be read to execute this instruction
    pub fn needs_op0(&self) -> bool {
        matches!(self.op1_source, Op1Source::Op0)
            || matches!(self.res_logic, ResLogic::Add | ResLogic::Mul)
            || matches!(self.opcode, Opcode::Call)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dst=[{}{:+}] op0=[{}{:+}] op1={:?}{:+} res={:?} pc={:?} ap={:?}",
            self.opcode.mnemonic(),
            self.dst_register,
            self.off_dst,
            self.op0_register,
            self.off_op0,
            self.op1_source,
            self.off_op1,
            self.res_logic,
            self.pc_update,
            self.ap_update,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_eq_instruction() -> Instruction {
        Instruction {
            off_dst: 0,
            off_op0: -1,
            off_op1: 1,
            dst_register: Register::Ap,
            op0_register: Register::Fp,
            op1_source: Op1Source::Imm,
            res_logic: ResLogic::Op1,
            pc_update: PcUpdate::Next,
            ap_update: ApUpdate::Add1,
            opcode: Opcode::AssertEq,
        }
    }

    #[test]
    fn test_size() {
        let mut inst = assert_eq_instruction();
        assert_eq!(inst.size(), 2);
        inst.op1_source = Op1Source::Fp;
        assert_eq!(inst.size(), 1);
    }

    #[test]
    fn test_needs_op0() {
        let mut inst = assert_eq_instruction();
        assert!(!inst.needs_op0());
        inst.res_logic = ResLogic::Add;
        assert!(inst.needs_op0());
        inst.res_logic = ResLogic::Op1;
        inst.op1_source = Op1Source::Op0;
        assert!(inst.needs_op0());
    }

    #[test]
    fn test_display() {
        let text = assert_eq_instruction().to_string();
        assert_eq!(
            text,
            "ASSERT_EQ dst=[ap+0] op0=[fp-1] op1=Imm+1 res=Op1 pc=Next ap=Add1"
        );
    }

    #[test]
    fn test_register_serde() {
        let json = serde_json::to_string(&Register::Ap).unwrap();
        assert_eq!(json, "\"AP\"");
    }
}
