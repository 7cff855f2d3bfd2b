//! Bytecode decoding
//!
//! Splits bytecode into instructions and raw data words. A word becomes data
//! when it does not decode, when its immediate is missing, or when the
//! assembly syntax has no way to spell it.

use casm_spec::{
    ApUpdate, Felt, Instruction, Op1Source, Opcode, PcUpdate, Register, ResLogic,
};

/// Word of `ret`
pub const RET_WORD: u64 = 0x208b_7fff_7fff_7ffe;

/// Canonical operand for unused dst and op0 slots
const UNUSED: (Register, i16) = (Register::Fp, -1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Instruction {
        instruction: Instruction,
        immediate: Option<Felt>,
    },
    Data(Felt),
}

/// Decoded item at a bytecode offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedItem {
    pub offset: u64,
    pub decoded: Decoded,
}

impl DecodedItem {
    /// Number of bytecode words this item covers
    pub fn size(&self) -> u64 {
        match &self.decoded {
            Decoded::Instruction { instruction, .. } => instruction.size(),
            Decoded::Data(_) => 1,
        }
    }
}

fn dst(inst: &Instruction) -> (Register, i16) {
    (inst.dst_register, inst.off_dst)
}

fn op0(inst: &Instruction) -> (Register, i16) {
    (inst.op0_register, inst.off_op0)
}

/// Whether the res part of `inst` has a surface form
fn res_expressible(inst: &Instruction, allow_binop: bool) -> bool {
    match (inst.res_logic, inst.op1_source) {
        (ResLogic::Op1 | ResLogic::Unconstrained, Op1Source::Op0) => true,
        (ResLogic::Op1 | ResLogic::Unconstrained, Op1Source::Imm) => {
            inst.off_op1 == 1 && op0(inst) == UNUSED
        }
        (ResLogic::Op1 | ResLogic::Unconstrained, _) => op0(inst) == UNUSED,
        (ResLogic::Add | ResLogic::Mul, Op1Source::Op0) => false,
        (ResLogic::Add | ResLogic::Mul, Op1Source::Imm) => allow_binop && inst.off_op1 == 1,
        (ResLogic::Add | ResLogic::Mul, _) => allow_binop,
    }
}

/// Whether assembling the listing of `inst` gives back the same word
pub fn is_expressible(inst: &Instruction) -> bool {
    let plain_ap = matches!(inst.ap_update, ApUpdate::Same | ApUpdate::Add1);
    match inst.opcode {
        Opcode::Ret => inst.encode() == Ok(RET_WORD),
        Opcode::Call => {
            dst(inst) == (Register::Ap, 0)
                && op0(inst) == (Register::Ap, 1)
                && inst.res_logic == ResLogic::Op1
                && match inst.op1_source {
                    Op1Source::Op0 => false,
                    Op1Source::Imm => inst.off_op1 == 1,
                    Op1Source::Fp | Op1Source::Ap => true,
                }
        }
        Opcode::AssertEq => {
            inst.pc_update == PcUpdate::Next && plain_ap && res_expressible(inst, true)
        }
        Opcode::Nop => match inst.pc_update {
            PcUpdate::JumpAbs | PcUpdate::JumpRel => {
                dst(inst) == UNUSED && plain_ap && res_expressible(inst, true)
            }
            PcUpdate::Jnz => plain_ap && res_expressible(inst, false),
            PcUpdate::Next => {
                inst.ap_update == ApUpdate::AddRes
                    && dst(inst) == UNUSED
                    && res_expressible(inst, true)
            }
        },
    }
}

/// Decode the word at `offset`, reading its immediate when present
fn decode_at(bytecode: &[Felt], offset: usize) -> Decoded {
    let word = bytecode[offset];
    let Ok(instruction) = Instruction::decode(&word) else {
        return Decoded::Data(word);
    };
    if !is_expressible(&instruction) {
        return Decoded::Data(word);
    }
    let immediate = if instruction.op1_source == Op1Source::Imm {
        match bytecode.get(offset + 1) {
            Some(value) => Some(*value),
            None => return Decoded::Data(word),
        }
    } else {
        None
    };
    Decoded::Instruction {
        instruction,
        immediate,
    }
}

/// Decode a whole bytecode listing
pub fn decode(bytecode: &[Felt]) -> Vec<DecodedItem> {
    let mut items = Vec::new();
    let mut offset = 0usize;
    while offset < bytecode.len() {
        let item = DecodedItem {
            offset: offset as u64,
            decoded: decode_at(bytecode, offset),
        };
        offset += item.size() as usize;
        items.push(item);
    }
    items
}
