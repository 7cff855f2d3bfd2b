//! Stress tests for the Cairo toolchain
//!
//! Long loops, deep recursion and large memories.

use casm_assembler::{assemble, assemble_bytecode};
use casm_disassembler::disassemble_bytecode;
use casm_runtime::{parse_args, run_program, CairoArg, NoHintRunner, RuntimeError, Vm, VmConfig};
use casm_spec::{Felt, MemoryAddress};

const COUNTDOWN: &str = r#"
    [ap] = [fp - 3], ap++;
    [ap] = [ap - 1] + -1, ap++;
    jmp rel -2 if [ap - 1] != 0;
    ret;
"#;

/// sum(n) = n + sum(n - 1), sum(0) = 0
const RECURSIVE_SUM: &str = r#"
    jmp rel 5 if [fp - 3] != 0;
    [ap] = 0, ap++;
    ret;
    [ap] = [fp - 3] + -1, ap++;
    call rel -7;
    [ap] = [ap - 1] + [fp - 3], ap++;
    ret;
"#;

// ============================================================================
// Long runs
// ============================================================================

#[test]
fn test_long_countdown() {
    let program = assemble(COUNTDOWN).unwrap();
    let args = parse_args("100000").unwrap();
    let result = run_program(&program, &args, VmConfig::default()).unwrap();
    // bootstrap call, copy, 100000 * (decrement + jnz), ret
    assert_eq!(result.steps, 1 + 1 + 200_000 + 1);
    assert_eq!(result.trace.len(), result.steps as usize);
}

#[test]
fn test_deep_recursion() {
    let program = assemble(RECURSIVE_SUM).unwrap();
    let n = 2000u64;
    let args = parse_args(&n.to_string()).unwrap();
    let mut vm = Vm::from_program(&program, &args, VmConfig::default()).unwrap();
    let result = vm.run(&mut NoHintRunner).unwrap();

    assert_eq!(result.steps, 1 + 5 * n + 3);
    let ap = vm.registers().ap;
    let top = MemoryAddress::new(ap.segment_index, ap.offset - 1);
    assert_eq!(vm.memory().read_felt(top).unwrap(), Felt::from(n * (n + 1) / 2));
}

#[test]
fn test_step_limit_is_exact() {
    let program = assemble(COUNTDOWN).unwrap();
    let args = parse_args("10").unwrap();
    let steps = run_program(&program, &args, VmConfig::default()).unwrap().steps;

    let exact = VmConfig {
        max_steps: steps,
        ..VmConfig::default()
    };
    assert!(run_program(&program, &args, exact).is_ok());

    let short = VmConfig {
        max_steps: steps - 1,
        ..VmConfig::default()
    };
    assert!(matches!(
        run_program(&program, &args, short),
        Err(RuntimeError::StepLimitExceeded(_))
    ));
}

// ============================================================================
// Large memories
// ============================================================================

#[test]
fn test_large_array_argument() {
    let values: Vec<Felt> = (0..50_000u64).map(Felt::from).collect();
    let program = assemble("[ap] = [[fp - 3] - 1], ap++; ret;").unwrap();
    let args = vec![CairoArg::Array(values)];
    let mut vm = Vm::from_program(&program, &args, VmConfig::default()).unwrap();
    let result = vm.run(&mut NoHintRunner).unwrap();

    assert_eq!(result.relocation_table.len(), 3);
    assert!(result.memory.len() > 50_000);
    let last = vm.registers().ap;
    let top = MemoryAddress::new(last.segment_index, last.offset - 1);
    assert_eq!(vm.memory().read_felt(top).unwrap(), Felt::from(49_999u64));
}

#[test]
fn test_many_statements_round_trip() {
    let source: String = (0..5_000)
        .map(|i| format!("[ap] = [fp - {}] * {}, ap++;\n", i % 100, i))
        .collect();
    let bytecode = assemble_bytecode(&source).unwrap();
    assert_eq!(bytecode.len(), 10_000);
    let listing = disassemble_bytecode(&bytecode).unwrap();
    assert_eq!(assemble_bytecode(&listing).unwrap(), bytecode);
}
