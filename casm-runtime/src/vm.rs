//! Virtual machine and runner driver

use crate::args::CairoArg;
use crate::builtins::BuiltinRunner;
use crate::error::{Result, RuntimeError, StepError};
use crate::execute::execute_step;
use crate::hint::{CoreHintRunner, HintContext, HintRunner, ScopeManager};
use crate::memory::Memory;
use crate::state::{HaltReason, Registers, RelocatedTraceEntry};
use casm_spec::{Felt, Instruction, Layout, MemoryAddress, MemoryValue, Program};

/// `call rel <imm>`
pub const BOOTSTRAP_CALL: u64 = 0x1104_8001_8001_8000;

/// `jmp rel 0`
pub const BOOTSTRAP_LOOP: u64 = 0x0107_8001_7fff_7fff;

/// Words placed in front of the program
pub const BOOTSTRAP_LEN: u64 = 4;

/// Offset of the `jmp rel 0` the entry point returns to
pub const BOOTSTRAP_RETURN_OFFSET: u64 = 2;

/// Proof-mode traces are padded to at least this many steps
pub const PROOF_MODE_MIN_STEPS: u64 = 16;

/// VM configuration
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Layout providing the builtins
    pub layout: Layout,

    /// Pad the trace to a power of two with the final self-loop
    pub proof_mode: bool,

    /// Maximum number of steps before aborting
    pub max_steps: u64,

    /// Entry offset; the program's main entry point when unset
    pub entrypoint: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Plain,
            proof_mode: false,
            max_steps: 10_000_000,
            entrypoint: None,
        }
    }
}

/// Execution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Number of steps executed, including proof-mode padding
    pub steps: u64,

    pub halt_reason: HaltReason,

    /// Relocated `(pc, ap, fp)` before every step
    pub trace: Vec<RelocatedTraceEntry>,

    /// Relocated `(address, value)` of every written cell in first-write order
    pub memory: Vec<(u64, Felt)>,

    /// Linear base of each segment
    pub relocation_table: Vec<u64>,

    /// Values written to the output builtin
    pub outputs: Vec<Felt>,
}

/// Number of steps a proof-mode run is padded to
pub fn proof_mode_steps(steps: u64) -> u64 {
    steps.next_power_of_two().max(PROOF_MODE_MIN_STEPS)
}

/// Cairo virtual machine
#[derive(Debug)]
pub struct Vm {
    memory: Memory,
    registers: Registers,
    scopes: ScopeManager,
    builtins: Vec<BuiltinRunner>,

    /// Registers before each executed step
    trace: Vec<Registers>,

    program_base: MemoryAddress,
    program_len: u64,

    /// Address of program offset 0, after the bootstrap
    code_base: MemoryAddress,

    halt_pc: Option<MemoryAddress>,
    config: VmConfig,
    steps: u64,
}

impl Vm {
    /// VM over pre-loaded memory; the program is the segment `pc` points into
    pub fn new(memory: Memory, registers: Registers, config: VmConfig) -> Self {
        let program_base = MemoryAddress::new(registers.pc.segment_index, 0);
        let program_len = memory.segment_len(program_base.segment_index).unwrap_or(0);
        Self {
            memory,
            registers,
            scopes: ScopeManager::new(),
            builtins: Vec::new(),
            trace: Vec::new(),
            program_base,
            program_len,
            code_base: program_base,
            halt_pc: None,
            config,
            steps: 0,
        }
    }

    /// Lay out a program behind the bootstrap, with builtins and arguments on
    /// the initial stack
    pub fn from_program(program: &Program, args: &[CairoArg], config: VmConfig) -> Result<Self> {
        let entry = match config.entrypoint {
            Some(offset) => program.entry_point_at(offset),
            None => program.main_entry_point(),
        };
        let requested = entry.builtin_list()?;
        if let Some(builtin) = requested.iter().find(|b| !config.layout.supports(**b)) {
            return Err(RuntimeError::BuiltinNotInLayout {
                builtin: *builtin,
                layout: config.layout,
            });
        }

        let mut words = vec![
            MemoryValue::from(BOOTSTRAP_CALL),
            MemoryValue::from(BOOTSTRAP_LEN + entry.offset),
            MemoryValue::from(BOOTSTRAP_LOOP),
            MemoryValue::from(0u64),
        ];
        words.extend(program.bytecode.iter().copied().map(MemoryValue::Felt));

        let mut memory = Memory::new();
        let program_base = memory.allocate_segment_with(&words)?;
        let exec_base = memory.allocate_segment();

        let builtins: Vec<BuiltinRunner> = config
            .layout
            .builtins()
            .iter()
            .filter(|b| requested.contains(*b))
            .map(|b| BuiltinRunner::new(*b, &mut memory))
            .collect();

        let mut stack: Vec<MemoryValue> = requested
            .iter()
            .filter_map(|b| builtins.iter().find(|runner| runner.builtin == *b))
            .map(BuiltinRunner::initial_stack)
            .collect();
        for arg in args {
            match arg {
                CairoArg::Single(value) => stack.push(MemoryValue::Felt(*value)),
                CairoArg::Array(values) => {
                    let values: Vec<MemoryValue> =
                        values.iter().copied().map(MemoryValue::Felt).collect();
                    let start = memory.allocate_segment_with(&values)?;
                    stack.push(MemoryValue::Address(start));
                    stack.push(MemoryValue::Address(start.add_offset(values.len() as u64)?));
                }
            }
        }
        let frame = memory.load_data(exec_base, &stack)?;

        tracing::debug!(
            entry = entry.offset,
            builtins = builtins.len(),
            args = args.len(),
            "program loaded"
        );

        Ok(Self {
            memory,
            registers: Registers::new(program_base, frame, frame),
            scopes: ScopeManager::new(),
            builtins,
            trace: Vec::new(),
            program_base,
            program_len: words.len() as u64,
            code_base: program_base.add_offset(BOOTSTRAP_LEN)?,
            halt_pc: Some(program_base.add_offset(BOOTSTRAP_RETURN_OFFSET)?),
            config,
            steps: 0,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn scopes(&self) -> &ScopeManager {
        &self.scopes
    }

    pub fn builtins(&self) -> &[BuiltinRunner] {
        &self.builtins
    }

    pub fn trace(&self) -> &[Registers] {
        &self.trace
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn code_base(&self) -> MemoryAddress {
        self.code_base
    }

    /// Address at which `run` stops
    pub fn halt_pc(&self) -> MemoryAddress {
        self.halt_pc.unwrap_or(MemoryAddress::new(
            self.program_base.segment_index,
            self.program_base.offset + self.program_len,
        ))
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute one instruction, running the hints at its pc first
    pub fn step(&mut self, hints: &mut dyn HintRunner) -> Result<()> {
        let pc = self.registers.pc;
        if pc.segment_index == self.program_base.segment_index
            && pc.offset >= self.program_base.offset + self.program_len
        {
            return Err(RuntimeError::PcOutOfProgram(pc));
        }

        let mut ctx = HintContext {
            memory: &mut self.memory,
            registers: &self.registers,
            scopes: &mut self.scopes,
            code_base: self.code_base,
        };
        hints
            .on_before_step(pc, &mut ctx)
            .map_err(|source| RuntimeError::Hint { pc, source })?;

        let fail = |instruction, source: StepError| RuntimeError::Step {
            pc,
            instruction,
            source,
        };
        let word = self
            .memory
            .read_felt(pc)
            .map_err(|err| fail(None, err.into()))?;
        let instruction = Instruction::decode(&word).map_err(|err| fail(None, err.into()))?;
        let outcome = execute_step(&mut self.memory, &self.registers, &instruction)
            .map_err(|err| fail(Some(instruction), err))?;

        tracing::trace!(
            step = self.steps,
            pc = %pc,
            ap = %self.registers.ap,
            fp = %self.registers.fp,
            instruction = %instruction,
        );

        self.trace.push(self.registers);
        self.registers = outcome.next;
        self.steps += 1;
        Ok(())
    }

    /// Step until pc equals `target`
    pub fn run_until_pc(&mut self, target: MemoryAddress, hints: &mut dyn HintRunner) -> Result<()> {
        while self.registers.pc != target {
            if self.steps >= self.config.max_steps {
                return Err(RuntimeError::StepLimitExceeded(self.config.max_steps));
            }
            self.step(hints)?;
        }
        Ok(())
    }

    /// Run to completion and collect the relocated result
    pub fn run(&mut self, hints: &mut dyn HintRunner) -> Result<ExecutionResult> {
        self.run_until_pc(self.halt_pc(), hints)?;
        let halt_reason = match self.halt_pc {
            Some(_) => HaltReason::Returned,
            None => HaltReason::ReachedPc,
        };

        if self.config.proof_mode {
            let target = proof_mode_steps(self.steps);
            while self.steps < target {
                if self.steps >= self.config.max_steps {
                    return Err(RuntimeError::StepLimitExceeded(self.config.max_steps));
                }
                self.step(hints)?;
            }
        }

        tracing::info!(steps = self.steps, "execution finished");
        self.finish(halt_reason)
    }

    fn finish(&self, halt_reason: HaltReason) -> Result<ExecutionResult> {
        let mut outputs = Vec::new();
        for builtin in &self.builtins {
            builtin.validate(&self.memory)?;
            outputs.extend(builtin.outputs(&self.memory)?);
        }
        Ok(ExecutionResult {
            steps: self.steps,
            halt_reason,
            trace: self.relocated_trace()?,
            memory: self.memory.relocated_writes()?,
            relocation_table: self.memory.relocation_table(),
            outputs,
        })
    }

    pub fn relocated_trace(&self) -> Result<Vec<RelocatedTraceEntry>> {
        let table = self.memory.relocation_table();
        let relocate = |address| self.memory.relocate_address(&table, address);
        self.trace
            .iter()
            .map(|regs| -> Result<RelocatedTraceEntry> {
                Ok(RelocatedTraceEntry::new(
                    relocate(regs.pc)?,
                    relocate(regs.ap)?,
                    relocate(regs.fp)?,
                ))
            })
            .collect()
    }
}

/// Load, run with the core hints, and return the result
pub fn run_program(
    program: &Program,
    args: &[CairoArg],
    config: VmConfig,
) -> Result<ExecutionResult> {
    let mut hints = CoreHintRunner::from_program(program).map_err(RuntimeError::HintSetup)?;
    let mut vm = Vm::from_program(program, args, config)?;
    vm.run(&mut hints)
}
