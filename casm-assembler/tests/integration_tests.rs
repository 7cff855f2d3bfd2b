//! Integration tests for the assembler

use casm_assembler::{assemble, assemble_bytecode};
use casm_spec::{
    ApUpdate, Felt, Instruction, Op1Source, Opcode, PcUpdate, Register, ResLogic,
};

fn decode_all(bytecode: &[Felt]) -> Vec<Instruction> {
    let mut out = Vec::new();
    let mut pc = 0;
    while pc < bytecode.len() {
        let instruction = Instruction::decode(&bytecode[pc]).unwrap();
        pc += instruction.size() as usize;
        out.push(instruction);
    }
    out
}

// ============================================================================
// Encodings
// ============================================================================

#[test]
fn test_copy_with_ap_increment() {
    let bytecode = assemble_bytecode("[ap] = [fp + 0], ap++;").unwrap();
    assert_eq!(bytecode, vec![Felt::from(0x480a_8000_7fff_8000u64)]);

    let instruction = Instruction::decode(&bytecode[0]).unwrap();
    assert_eq!(instruction.off_dst, 0);
    assert_eq!(instruction.off_op0, -1);
    assert_eq!(instruction.off_op1, 0);
    assert_eq!(instruction.dst_register, Register::Ap);
    assert_eq!(instruction.op0_register, Register::Fp);
    assert_eq!(instruction.op1_source, Op1Source::Fp);
    assert_eq!(instruction.res_logic, ResLogic::Op1);
    assert_eq!(instruction.pc_update, PcUpdate::Next);
    assert_eq!(instruction.ap_update, ApUpdate::Add1);
    assert_eq!(instruction.opcode, Opcode::AssertEq);
}

#[test]
fn test_negative_immediate() {
    let bytecode = assemble_bytecode("[ap] = -5, ap++;").unwrap();
    assert_eq!(bytecode[1], Felt::from(-5i64));
}

#[test]
fn test_function_call_program() {
    let source = r#"
        // main
        [ap] = 10, ap++;
        call rel 3;
        ret;
        // double
        [ap] = [fp - 3] + [fp - 3], ap++;
        ret;
    "#;
    let program = assemble(source).unwrap();
    let instructions = decode_all(&program.bytecode);
    assert_eq!(instructions.len(), 5);
    assert_eq!(instructions[1].opcode, Opcode::Call);
    assert_eq!(instructions[1].ap_update, ApUpdate::Add2);
    assert_eq!(instructions[3].res_logic, ResLogic::Add);
    assert_eq!(instructions[4].opcode, Opcode::Ret);
}

#[test]
fn test_all_statement_forms_decode() {
    let source = r#"
        [fp + 1] = [ap - 1] * 3;
        [ap] = [[fp - 4] + 1], ap++;
        jmp abs [fp - 3];
        jmp rel 4, ap++;
        jmp rel [ap - 2] if [fp - 7] != 0;
        call abs [fp - 5];
        ap += [fp + 2];
        ret;
    "#;
    let instructions = decode_all(&assemble_bytecode(source).unwrap());
    let opcodes: Vec<_> = instructions.iter().map(|i| i.pc_update).collect();
    assert_eq!(
        opcodes,
        vec![
            PcUpdate::Next,
            PcUpdate::Next,
            PcUpdate::JumpAbs,
            PcUpdate::JumpRel,
            PcUpdate::Jnz,
            PcUpdate::JumpAbs,
            PcUpdate::Next,
            PcUpdate::JumpAbs,
        ]
    );
    assert_eq!(instructions[3].ap_update, ApUpdate::Add1);
    assert_eq!(instructions[6].ap_update, ApUpdate::AddRes);
}

#[test]
fn test_data_words_pass_through() {
    let bytecode = assemble_bytecode("dw 0x8000000000000000; dw 3;").unwrap();
    assert_eq!(bytecode, vec![Felt::from(1u64 << 63), Felt::from(3u64)]);
}

#[test]
fn test_hex_immediate_larger_than_64_bits() {
    let bytecode =
        assemble_bytecode("[ap] = [ap - 1] * 0x400000000000008800000000000000000000000000000000000000000000000, ap++;")
            .unwrap();
    assert_eq!(bytecode.len(), 2);
    assert!(bytecode[1].bits() > 64);
}
