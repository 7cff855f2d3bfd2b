//! Cross-module interaction tests
//!
//! Assembler, disassembler and runtime agree on the same words.

use casm_assembler::{assemble, assemble_bytecode};
use casm_disassembler::{decode, disassemble_bytecode, Decoded};
use casm_runtime::{run_program, RuntimeError, StepError, VmConfig};
use casm_spec::{Felt, Instruction, MemoryAddress, Opcode};
use proptest::prelude::*;

// ============================================================================
// Assembler -> Disassembler
// ============================================================================

fn deref() -> impl Strategy<Value = String> {
    (prop_oneof![Just("ap"), Just("fp")], -40i32..40).prop_map(|(reg, off)| match off {
        0 => format!("[{reg}]"),
        o if o > 0 => format!("[{reg} + {o}]"),
        o => format!("[{reg} - {}]", -o),
    })
}

fn immediate() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1000i64..1000).prop_map(|v| v.to_string()),
        any::<u64>().prop_map(|v| format!("{v:#x}")),
    ]
}

fn expr() -> impl Strategy<Value = String> {
    prop_oneof![
        deref(),
        immediate(),
        (deref(), -5i32..5).prop_map(|(d, off)| format!("[{d} + {off}]")),
        (deref(), prop_oneof![Just("+"), Just("*")], deref())
            .prop_map(|(a, op, b)| format!("{a} {op} {b}")),
        (deref(), prop_oneof![Just("+"), Just("*")], immediate())
            .prop_map(|(a, op, b)| format!("{a} {op} {b}")),
    ]
}

fn plain_target() -> impl Strategy<Value = String> {
    prop_oneof![deref(), immediate()]
}

fn ap_pp() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(""), Just(", ap++")]
}

fn statement() -> impl Strategy<Value = String> {
    prop_oneof![
        (deref(), expr(), ap_pp()).prop_map(|(d, e, pp)| format!("{d} = {e}{pp};")),
        (prop_oneof![Just("abs"), Just("rel")], expr(), ap_pp())
            .prop_map(|(k, e, pp)| format!("jmp {k} {e}{pp};")),
        (plain_target(), deref(), ap_pp())
            .prop_map(|(t, c, pp)| format!("jmp rel {t} if {c} != 0{pp};")),
        (prop_oneof![Just("abs"), Just("rel")], plain_target())
            .prop_map(|(k, t)| format!("call {k} {t};")),
        Just("ret;".to_string()),
        expr().prop_map(|e| format!("ap += {e};")),
        immediate().prop_map(|v| format!("dw {v};")),
    ]
}

proptest! {
    #[test]
    fn prop_disassembly_reassembles(statements in prop::collection::vec(statement(), 1..20)) {
        let source = statements.join("\n");
        let bytecode = assemble_bytecode(&source).unwrap();
        let listing = disassemble_bytecode(&bytecode).unwrap();
        prop_assert_eq!(assemble_bytecode(&listing).unwrap(), bytecode);
    }

    #[test]
    fn prop_assembled_instructions_decode(statement in statement()) {
        let bytecode = assemble_bytecode(&statement).unwrap();
        if !statement.starts_with("dw") {
            let inst = Instruction::decode(&bytecode[0]).unwrap();
            prop_assert_eq!(inst.size() as usize, bytecode.len());
            prop_assert_eq!(Felt::from(inst.encode().unwrap()), bytecode[0]);
        }
    }
}

#[test]
fn test_decoder_sees_every_assembled_instruction() {
    let source = "[ap] = 1, ap++; call rel 2; ret; jmp rel 0;";
    let items = decode(&assemble_bytecode(source).unwrap());
    let opcodes: Vec<Opcode> = items
        .iter()
        .map(|item| match item.decoded {
            Decoded::Instruction { instruction, .. } => instruction.opcode,
            Decoded::Data(_) => panic!("unexpected data at {}", item.offset),
        })
        .collect();
    assert_eq!(
        opcodes,
        vec![Opcode::AssertEq, Opcode::Call, Opcode::Ret, Opcode::Nop]
    );
}

// ============================================================================
// Assembler -> Runtime
// ============================================================================

#[test]
fn test_failing_assert_names_pc_and_instruction() {
    let program = assemble("[ap] = 1, ap++; [ap - 1] = 2; ret;").unwrap();
    match run_program(&program, &[], VmConfig::default()) {
        Err(RuntimeError::Step {
            pc,
            instruction: Some(inst),
            source: StepError::AssertEqFailed { .. },
        }) => {
            assert_eq!(pc, MemoryAddress::new(0, 6));
            assert_eq!(inst.opcode, Opcode::AssertEq);
        }
        other => panic!("expected an assert failure, got {other:?}"),
    }
}

#[test]
fn test_data_word_in_execution_path_fails() {
    let program = assemble("dw 0x8000000000000000;").unwrap();
    match run_program(&program, &[], VmConfig::default()) {
        Err(RuntimeError::Step {
            instruction: None,
            source: StepError::Decode(_),
            ..
        }) => {}
        other => panic!("expected a decode failure, got {other:?}"),
    }
}

#[test]
fn test_running_off_the_program() {
    let program = assemble("[ap] = 1, ap++;").unwrap();
    assert!(matches!(
        run_program(&program, &[], VmConfig::default()),
        Err(RuntimeError::PcOutOfProgram(pc)) if pc == MemoryAddress::new(0, 6)
    ));
}

#[test]
fn test_uninitialised_read_is_reported() {
    let program = assemble("[ap] = [fp + 5] + [fp + 6]; ret;").unwrap();
    assert!(matches!(
        run_program(&program, &[], VmConfig::default()),
        Err(RuntimeError::Step { .. })
    ));
}
