//! # Instruction Encoding Constants and Helpers
//!
//! ## Instruction Format (64-bit word)
//!
//! ```text
//! bits  0..15 : off_dst (biased)      bit 55 : pc_jump_abs
//! bits 16..31 : off_op0 (biased)      bit 56 : pc_jump_rel
//! bits 32..47 : off_op1 (biased)      bit 57 : pc_jnz
//! bit      48 : dst_reg               bit 58 : ap_add
//! bit      49 : op0_reg               bit 59 : ap_add1
//! bit      50 : op1_imm               bit 60 : opcode_call
//! bit      51 : op1_fp                bit 61 : opcode_ret
//! bit      52 : op1_ap                bit 62 : opcode_assert_eq
//! bit      53 : res_add               bit 63 : reserved, must be 0
//! bit      54 : res_mul
//! ```
//!
//! Offsets are stored biased (`stored = signed ^ 0x8000`) so their unsigned
//! encoding is monotone.

use crate::error::{DecodeError, EncodeError};
use crate::field::Felt;
use crate::instruction::{
    ApUpdate, FlagGroup, Instruction, Op1Source, Opcode, PcUpdate, Register, ResLogic,
};

// ============================================================================
// Bit Position Constants
// ============================================================================

pub const OFF_DST_SHIFT: u32 = 0;
pub const OFF_OP0_SHIFT: u32 = 16;
pub const OFF_OP1_SHIFT: u32 = 32;
pub const FLAGS_SHIFT: u32 = 48;

pub const DST_REG_BIT: u32 = 48;
pub const OP0_REG_BIT: u32 = 49;
pub const OP1_IMM_BIT: u32 = 50;
pub const OP1_FP_BIT: u32 = 51;
pub const OP1_AP_BIT: u32 = 52;
pub const RES_ADD_BIT: u32 = 53;
pub const RES_MUL_BIT: u32 = 54;
pub const PC_JUMP_ABS_BIT: u32 = 55;
pub const PC_JUMP_REL_BIT: u32 = 56;
pub const PC_JNZ_BIT: u32 = 57;
pub const AP_ADD_BIT: u32 = 58;
pub const AP_ADD1_BIT: u32 = 59;
pub const OPCODE_CALL_BIT: u32 = 60;
pub const OPCODE_RET_BIT: u32 = 61;
pub const OPCODE_ASSERT_EQ_BIT: u32 = 62;
pub const RESERVED_BIT: u32 = 63;

// ============================================================================
// Field Masks
// ============================================================================

/// Mask for one 16-bit offset lane
pub const OFFSET_MASK: u64 = 0xFFFF;

/// XOR mask that removes the bias from all three offsets at once
pub const OFFSET_BIAS_MASK: u64 = 0x0000_8000_8000_8000;

const OP1_SRC_MASK: u64 = bit(OP1_IMM_BIT) | bit(OP1_FP_BIT) | bit(OP1_AP_BIT);
const RES_MASK: u64 = bit(RES_ADD_BIT) | bit(RES_MUL_BIT);
const PC_MASK: u64 = bit(PC_JUMP_ABS_BIT) | bit(PC_JUMP_REL_BIT) | bit(PC_JNZ_BIT);
const AP_MASK: u64 = bit(AP_ADD_BIT) | bit(AP_ADD1_BIT);
const OPCODE_MASK: u64 = bit(OPCODE_CALL_BIT) | bit(OPCODE_RET_BIT) | bit(OPCODE_ASSERT_EQ_BIT);

#[inline]
const fn bit(position: u32) -> u64 {
    1u64 << position
}

// ============================================================================
// Offset Helpers
// ============================================================================

/// Bias a signed offset into its stored 16-bit form
#[inline]
pub const fn bias_offset(offset: i16) -> u64 {
    ((offset as u16) ^ 0x8000) as u64
}

/// Recover the signed offset from a 16-bit lane
#[inline]
pub const fn unbias_offset(lane: u64) -> i16 {
    ((lane & OFFSET_MASK) as u16 ^ 0x8000) as i16
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode an instruction held in a field element
pub fn decode(word: &Felt) -> Result<Instruction, DecodeError> {
    let word = word.to_u64().ok_or(DecodeError::TooLarge(*word))?;
    decode_word(word)
}

/// Index of the single set bit among `bits`, or `None` when none is set
fn one_hot(word: u64, bits: &[u32], group: FlagGroup) -> Result<Option<usize>, DecodeError> {
    let mut found = None;
    for (index, position) in bits.iter().enumerate() {
        if word & bit(*position) != 0 {
            if found.is_some() {
                return Err(DecodeError::NonOneHotFlags { group, word });
            }
            found = Some(index);
        }
    }
    Ok(found)
}

pub fn decode_word(word: u64) -> Result<Instruction, DecodeError> {
    if word & bit(RESERVED_BIT) != 0 {
        return Err(DecodeError::ReservedBitSet(word));
    }

    let unbiased = word ^ OFFSET_BIAS_MASK;
    let off_dst = (unbiased >> OFF_DST_SHIFT & OFFSET_MASK) as u16 as i16;
    let off_op0 = (unbiased >> OFF_OP0_SHIFT & OFFSET_MASK) as u16 as i16;
    let off_op1 = (unbiased >> OFF_OP1_SHIFT & OFFSET_MASK) as u16 as i16;

    let register = |position| {
        if word & bit(position) != 0 {
            Register::Fp
        } else {
            Register::Ap
        }
    };
    let dst_register = register(DST_REG_BIT);
    let op0_register = register(OP0_REG_BIT);

    let op1_source = match one_hot(
        word,
        &[OP1_IMM_BIT, OP1_FP_BIT, OP1_AP_BIT],
        FlagGroup::Op1Source,
    )? {
        None => Op1Source::Op0,
        Some(0) => Op1Source::Imm,
        Some(1) => Op1Source::Fp,
        Some(_) => Op1Source::Ap,
    };

    let pc_update = match one_hot(
        word,
        &[PC_JUMP_ABS_BIT, PC_JUMP_REL_BIT, PC_JNZ_BIT],
        FlagGroup::PcUpdate,
    )? {
        None => PcUpdate::Next,
        Some(0) => PcUpdate::JumpAbs,
        Some(1) => PcUpdate::JumpRel,
        Some(_) => PcUpdate::Jnz,
    };

    let res_logic = match one_hot(word, &[RES_ADD_BIT, RES_MUL_BIT], FlagGroup::ResLogic)? {
        None if pc_update == PcUpdate::Jnz => ResLogic::Unconstrained,
        None => ResLogic::Op1,
        Some(_) if pc_update == PcUpdate::Jnz => {
            return Err(DecodeError::InvalidJnz {
                word,
                reason: "a result computation",
            })
        }
        Some(0) => ResLogic::Add,
        Some(_) => ResLogic::Mul,
    };

    let opcode = match one_hot(
        word,
        &[OPCODE_CALL_BIT, OPCODE_RET_BIT, OPCODE_ASSERT_EQ_BIT],
        FlagGroup::Opcode,
    )? {
        None => Opcode::Nop,
        Some(0) => Opcode::Call,
        Some(1) => Opcode::Ret,
        Some(_) => Opcode::AssertEq,
    };

    let ap_update = match one_hot(word, &[AP_ADD_BIT, AP_ADD1_BIT], FlagGroup::ApUpdate)? {
        None if opcode == Opcode::Call => ApUpdate::Add2,
        None => ApUpdate::Same,
        Some(_) if opcode == Opcode::Call => return Err(DecodeError::InvalidCallApUpdate(word)),
        Some(0) => ApUpdate::AddRes,
        Some(_) => ApUpdate::Add1,
    };

    if pc_update == PcUpdate::Jnz {
        if opcode != Opcode::Nop {
            return Err(DecodeError::InvalidJnz {
                word,
                reason: "a non-NOP opcode",
            });
        }
        if ap_update == ApUpdate::AddRes {
            return Err(DecodeError::InvalidJnz {
                word,
                reason: "an ap += res update",
            });
        }
    }

    Ok(Instruction {
        off_dst,
        off_op0,
        off_op1,
        dst_register,
        op0_register,
        op1_source,
        res_logic,
        pc_update,
        ap_update,
        opcode,
    })
}

// ============================================================================
// Encoding
// ============================================================================

/// Pack an instruction into its word; inverse of [`decode_word`]
pub fn encode(inst: &Instruction) -> Result<u64, EncodeError> {
    let jnz = inst.pc_update == PcUpdate::Jnz;
    let call = inst.opcode == Opcode::Call;

    if jnz && inst.res_logic != ResLogic::Unconstrained {
        return Err(EncodeError::InvalidCombination("jnz requires an unconstrained res"));
    }
    if !jnz && inst.res_logic == ResLogic::Unconstrained {
        return Err(EncodeError::InvalidCombination("unconstrained res is only valid under jnz"));
    }
    if jnz && inst.opcode != Opcode::Nop {
        return Err(EncodeError::InvalidCombination("jnz cannot carry an opcode"));
    }
    if jnz && inst.ap_update == ApUpdate::AddRes {
        return Err(EncodeError::InvalidCombination("jnz cannot update ap by res"));
    }
    if call && inst.ap_update != ApUpdate::Add2 {
        return Err(EncodeError::InvalidCombination("call implies ap += 2"));
    }
    if !call && inst.ap_update == ApUpdate::Add2 {
        return Err(EncodeError::InvalidCombination("ap += 2 is only valid for call"));
    }

    let mut word = bias_offset(inst.off_dst) << OFF_DST_SHIFT
        | bias_offset(inst.off_op0) << OFF_OP0_SHIFT
        | bias_offset(inst.off_op1) << OFF_OP1_SHIFT;

    if inst.dst_register == Register::Fp {
        word |= bit(DST_REG_BIT);
    }
    if inst.op0_register == Register::Fp {
        word |= bit(OP0_REG_BIT);
    }
    word |= match inst.op1_source {
        Op1Source::Op0 => 0,
        Op1Source::Imm => bit(OP1_IMM_BIT),
        Op1Source::Fp => bit(OP1_FP_BIT),
        Op1Source::Ap => bit(OP1_AP_BIT),
    };
    word |= match inst.res_logic {
        ResLogic::Op1 | ResLogic::Unconstrained => 0,
        ResLogic::Add => bit(RES_ADD_BIT),
        ResLogic::Mul => bit(RES_MUL_BIT),
    };
    word |= match inst.pc_update {
        PcUpdate::Next => 0,
        PcUpdate::JumpAbs => bit(PC_JUMP_ABS_BIT),
        PcUpdate::JumpRel => bit(PC_JUMP_REL_BIT),
        PcUpdate::Jnz => bit(PC_JNZ_BIT),
    };
    word |= match inst.ap_update {
        ApUpdate::Same | ApUpdate::Add2 => 0,
        ApUpdate::AddRes => bit(AP_ADD_BIT),
        ApUpdate::Add1 => bit(AP_ADD1_BIT),
    };
    word |= match inst.opcode {
        Opcode::Nop => 0,
        Opcode::Call => bit(OPCODE_CALL_BIT),
        Opcode::Ret => bit(OPCODE_RET_BIT),
        Opcode::AssertEq => bit(OPCODE_ASSERT_EQ_BIT),
    };

    Ok(word)
}

/// Flag field (bits 48..62) of a word
#[inline]
pub const fn flags(word: u64) -> u64 {
    (word >> FLAGS_SHIFT) & 0x7FFF
}

/// True if at least one of the flag groups has more than one bit set
pub fn has_conflicting_flags(word: u64) -> bool {
    [OP1_SRC_MASK, RES_MASK, PC_MASK, AP_MASK, OPCODE_MASK]
        .iter()
        .any(|mask| (word & mask).count_ones() > 1)
}
