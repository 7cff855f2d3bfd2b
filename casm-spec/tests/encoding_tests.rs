//! Encoding tests across the public API: canonical words, flag groups and
//! the decode/encode inverse over structured instruction spaces.

use casm_spec::encoding::*;
use casm_spec::{
    ApUpdate, DecodeError, Felt, FlagGroup, Instruction, Op1Source, Opcode, PcUpdate, Register,
    ResLogic,
};

fn instruction(
    op1_source: Op1Source,
    res_logic: ResLogic,
    pc_update: PcUpdate,
    ap_update: ApUpdate,
    opcode: Opcode,
) -> Instruction {
    Instruction {
        off_dst: -3,
        off_op0: 7,
        off_op1: 1,
        dst_register: Register::Fp,
        op0_register: Register::Ap,
        op1_source,
        res_logic,
        pc_update,
        ap_update,
        opcode,
    }
}

// ============================================================================
// Canonical Words
// ============================================================================

#[test]
fn test_assert_eq_from_fp_with_ap_increment() {
    let inst = Instruction::decode(&Felt::from(0x480a_8000_7fff_8000u64)).unwrap();
    assert_eq!(
        inst,
        Instruction {
            off_dst: 0,
            off_op0: -1,
            off_op1: 0,
            dst_register: Register::Ap,
            op0_register: Register::Fp,
            op1_source: Op1Source::Fp,
            res_logic: ResLogic::Op1,
            pc_update: PcUpdate::Next,
            ap_update: ApUpdate::Add1,
            opcode: Opcode::AssertEq,
        }
    );
}

#[test]
fn test_word_above_64_bits_is_rejected() {
    let word = Felt::from(u64::MAX) + Felt::ONE;
    let err = Instruction::decode(&word).unwrap_err();
    assert!(matches!(err, DecodeError::TooLarge(_)));
    assert!(err.to_string().contains("larger than 64 bits"));
}

#[test]
fn test_extreme_offsets() {
    let mut inst = instruction(
        Op1Source::Ap,
        ResLogic::Add,
        PcUpdate::Next,
        ApUpdate::Same,
        Opcode::AssertEq,
    );
    inst.off_dst = i16::MIN;
    inst.off_op0 = i16::MAX;
    inst.off_op1 = -1;
    let word = inst.encode().unwrap();
    assert_eq!(word & 0xFFFF, 0);
    assert_eq!((word >> 16) & 0xFFFF, 0xFFFF);
    assert_eq!(Instruction::decode_u64(word).unwrap(), inst);
}

// ============================================================================
// Flag Groups
// ============================================================================

#[test]
fn test_every_two_bit_group_combination_is_rejected() {
    let groups: [(&[u32], FlagGroup); 5] = [
        (&[OP1_IMM_BIT, OP1_FP_BIT, OP1_AP_BIT], FlagGroup::Op1Source),
        (&[RES_ADD_BIT, RES_MUL_BIT], FlagGroup::ResLogic),
        (&[PC_JUMP_ABS_BIT, PC_JUMP_REL_BIT, PC_JNZ_BIT], FlagGroup::PcUpdate),
        (&[AP_ADD_BIT, AP_ADD1_BIT], FlagGroup::ApUpdate),
        (
            &[OPCODE_CALL_BIT, OPCODE_RET_BIT, OPCODE_ASSERT_EQ_BIT],
            FlagGroup::Opcode,
        ),
    ];
    for (bits, group) in groups {
        for (i, a) in bits.iter().enumerate() {
            for b in &bits[i + 1..] {
                let word = (1u64 << a) | (1u64 << b);
                assert_eq!(
                    decode_word(word),
                    Err(DecodeError::NonOneHotFlags { group, word }),
                    "bits {a} and {b}"
                );
            }
        }
    }
}

#[test]
fn test_all_legal_flag_combinations_roundtrip() {
    let op1_sources = [Op1Source::Op0, Op1Source::Imm, Op1Source::Fp, Op1Source::Ap];
    let pc_updates = [PcUpdate::Next, PcUpdate::JumpAbs, PcUpdate::JumpRel, PcUpdate::Jnz];
    let opcodes = [Opcode::Nop, Opcode::Call, Opcode::Ret, Opcode::AssertEq];

    let mut checked = 0;
    for op1 in op1_sources {
        for pc in pc_updates {
            for opcode in opcodes {
                let res_options: &[ResLogic] = if pc == PcUpdate::Jnz {
                    &[ResLogic::Unconstrained]
                } else {
                    &[ResLogic::Op1, ResLogic::Add, ResLogic::Mul]
                };
                let ap_options: &[ApUpdate] = match (pc, opcode) {
                    (_, Opcode::Call) => &[ApUpdate::Add2],
                    (PcUpdate::Jnz, _) => &[ApUpdate::Same, ApUpdate::Add1],
                    _ => &[ApUpdate::Same, ApUpdate::AddRes, ApUpdate::Add1],
                };
                if pc == PcUpdate::Jnz && opcode != Opcode::Nop {
                    continue;
                }
                for res in res_options {
                    for ap in ap_options {
                        let inst = instruction(op1, *res, pc, *ap, opcode);
                        let word = inst.encode().unwrap();
                        assert_eq!(Instruction::decode_u64(word).unwrap(), inst);
                        checked += 1;
                    }
                }
            }
        }
    }
    assert!(checked > 100);
}

#[test]
fn test_flags_accessor() {
    let inst = instruction(
        Op1Source::Imm,
        ResLogic::Op1,
        PcUpdate::JumpRel,
        ApUpdate::Add2,
        Opcode::Call,
    );
    let word = inst.encode().unwrap();
    let flag_bits = flags(word);
    assert_ne!(flag_bits & (1 << (OPCODE_CALL_BIT - FLAGS_SHIFT)), 0);
    assert_eq!(flag_bits & (1 << (AP_ADD_BIT - FLAGS_SHIFT)), 0);
}
