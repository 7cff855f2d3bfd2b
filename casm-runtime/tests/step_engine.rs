//! Step engine scenarios driven on hand-built memory

use casm_assembler::assemble_bytecode;
use casm_runtime::{
    compute_step, execute_step, HaltReason, Memory, NoHintRunner, Registers,
    RelocatedTraceEntry, StepError, Vm, VmConfig,
};
use casm_spec::{Felt, Instruction, MemoryAddress, MemoryValue};

fn addr(segment: usize, offset: u64) -> MemoryAddress {
    MemoryAddress::new(segment, offset)
}

/// Program segment 0 holding `source`, empty execution segment 1
fn load(source: &str) -> Memory {
    let words: Vec<MemoryValue> = assemble_bytecode(source)
        .unwrap()
        .into_iter()
        .map(MemoryValue::Felt)
        .collect();
    let mut memory = Memory::new();
    memory.allocate_segment_with(&words).unwrap();
    memory.allocate_segment();
    memory
}

fn instruction_at(memory: &Memory, pc: MemoryAddress) -> Instruction {
    Instruction::decode(&memory.read_felt(pc).unwrap()).unwrap()
}

// ============================================================================
// Assert-eq
// ============================================================================

#[test]
fn test_copy_from_frame() {
    let mut memory = load("[ap] = [fp + 0], ap++;");
    memory.write(addr(1, 2), 5u64.into()).unwrap();

    let mut vm = Vm::new(
        memory,
        Registers::new(addr(0, 0), addr(1, 2), addr(1, 2)),
        VmConfig::default(),
    );
    let result = vm.run(&mut NoHintRunner).unwrap();

    assert_eq!(result.steps, 1);
    assert_eq!(result.halt_reason, HaltReason::ReachedPc);
    assert_eq!(result.trace, vec![RelocatedTraceEntry::new(1, 4, 4)]);
    assert_eq!(vm.memory().read_felt(addr(1, 2)).unwrap(), Felt::from(5u64));
    assert_eq!(vm.registers().ap, addr(1, 3));
    assert_eq!(vm.registers().pc, addr(0, 1));
}

#[test]
fn test_unwritten_destination_is_deduced() {
    let mut memory = load("[fp + 1] = 5;");
    let regs = Registers::new(addr(0, 0), addr(1, 0), addr(1, 0));
    let inst = instruction_at(&memory, regs.pc);

    let outcome = execute_step(&mut memory, &regs, &inst).unwrap();
    assert_eq!(outcome.deduced, vec![(addr(1, 1), MemoryValue::from(5u64))]);
    assert_eq!(outcome.next.pc, addr(0, 2));
    assert_eq!(memory.read_felt(addr(1, 1)).unwrap(), Felt::from(5u64));
}

#[test]
fn test_assert_mismatch() {
    let mut memory = load("[fp] = [ap + 1] + 3;");
    memory.write(addr(1, 0), 4u64.into()).unwrap();
    memory.write(addr(1, 1), 9u64.into()).unwrap();
    let regs = Registers::new(addr(0, 0), addr(1, 0), addr(1, 0));
    let inst = instruction_at(&memory, regs.pc);

    let err = execute_step(&mut memory, &regs, &inst).unwrap_err();
    assert!(matches!(err, StepError::AssertEqFailed { .. }));
}

#[test]
fn test_deduce_op1_through_double_deref() {
    let mut memory = load("[ap] = [[fp - 1] + 2];");
    let data = memory.allocate_segment();
    memory.write(addr(1, 0), data.into()).unwrap();
    memory.write(addr(1, 1), 11u64.into()).unwrap();
    let regs = Registers::new(addr(0, 0), addr(1, 1), addr(1, 1));
    let inst = instruction_at(&memory, regs.pc);

    execute_step(&mut memory, &regs, &inst).unwrap();
    assert_eq!(memory.read_felt(addr(2, 2)).unwrap(), Felt::from(11u64));
}

// ============================================================================
// Calls and returns
// ============================================================================

#[test]
fn test_call_abs_and_return() {
    let mut memory = load("call abs 123;");
    memory
        .write(addr(0, 123), Felt::from(0x208b_7fff_7fff_7ffeu64).into())
        .unwrap();
    let regs = Registers::new(addr(0, 0), addr(1, 3), addr(1, 3));

    let call = instruction_at(&memory, regs.pc);
    let after_call = execute_step(&mut memory, &regs, &call).unwrap().next;
    assert_eq!(memory.read_address(addr(1, 3)).unwrap(), addr(1, 3));
    assert_eq!(memory.read_address(addr(1, 4)).unwrap(), addr(0, 2));
    assert_eq!(after_call, Registers::new(addr(0, 123), addr(1, 5), addr(1, 5)));

    let ret = instruction_at(&memory, after_call.pc);
    let after_ret = execute_step(&mut memory, &after_call, &ret).unwrap().next;
    assert_eq!(after_ret, Registers::new(addr(0, 2), addr(1, 5), addr(1, 3)));
}

#[test]
fn test_call_with_mismatched_frame_fails() {
    let mut memory = load("call rel 2;");
    memory.write(addr(1, 0), 77u64.into()).unwrap();
    let regs = Registers::new(addr(0, 0), addr(1, 0), addr(1, 0));
    let inst = instruction_at(&memory, regs.pc);
    assert!(execute_step(&mut memory, &regs, &inst).is_err());
}

// ============================================================================
// Conditional jumps
// ============================================================================

fn jnz_memory(condition: u64) -> (Memory, Registers) {
    let mut memory = load("jmp rel [ap - 2] if [fp - 7] != 0;");
    memory.write(addr(1, 0), condition.into()).unwrap();
    memory.write(addr(1, 5), 10u64.into()).unwrap();
    (memory, Registers::new(addr(0, 0), addr(1, 7), addr(1, 7)))
}

#[test]
fn test_jnz_not_taken() {
    let (memory, regs) = jnz_memory(0);
    let inst = instruction_at(&memory, regs.pc);
    let outcome = compute_step(&memory, &regs, &inst).unwrap();
    assert_eq!(outcome.next.pc, addr(0, 1));
}

#[test]
fn test_jnz_taken() {
    let (memory, regs) = jnz_memory(1);
    let inst = instruction_at(&memory, regs.pc);
    let outcome = compute_step(&memory, &regs, &inst).unwrap();
    assert_eq!(outcome.next.pc, addr(0, 10));
    assert!(outcome.deduced.is_empty());
}

#[test]
fn test_jnz_on_address_fails() {
    let mut memory = load("jmp rel 4 if [fp] != 0;");
    memory.write(addr(1, 0), addr(1, 0).into()).unwrap();
    let regs = Registers::new(addr(0, 0), addr(1, 0), addr(1, 0));
    let inst = instruction_at(&memory, regs.pc);
    assert!(matches!(
        compute_step(&memory, &regs, &inst),
        Err(StepError::JnzOnAddress(_))
    ));
}

// ============================================================================
// Write-once
// ============================================================================

#[test]
fn test_rewrite_with_other_value_fails() {
    let mut memory = Memory::new();
    let base = memory.allocate_segment();
    memory.write(base, 1u64.into()).unwrap();
    memory.write(base, 1u64.into()).unwrap();
    assert!(memory.write(base, 2u64.into()).is_err());
    assert_eq!(memory.write_order().len(), 1);
}
