//! Hint execution
//!
//! Hints run before the instruction at their pc. A [`HintRunner`] receives a
//! [`HintContext`] that lends it memory, the scope stack and a read-only view
//! of the registers for the duration of one call.

use crate::error::HintError;
use crate::memory::Memory;
use crate::state::Registers;
use casm_spec::{
    CellRef, CoreHint, DerefOrImmediate, Felt, MathError, MemoryAddress, MemoryValue, Operation,
    Program, ResOperand,
};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Scope variable holding the next free cell of the constant-size segment
pub const CONSTANT_SIZE_SEGMENT: &str = "constant_size_segment";

// ============================================================================
// Scopes
// ============================================================================

pub type Scope = HashMap<String, Box<dyn Any>>;

/// Stack of hint variable scopes; the bottom one is the main scope
pub struct ScopeManager {
    scopes: Vec<Scope>,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn enter_scope(&mut self, initial: Scope) {
        self.scopes.push(initial);
    }

    pub fn exit_scope(&mut self) -> Result<(), HintError> {
        if self.scopes.len() <= 1 {
            return Err(HintError::CannotExitMainScope);
        }
        self.scopes.pop();
        Ok(())
    }

    /// Bind `name` in the innermost scope
    pub fn assign<T: Any>(&mut self, name: &str, value: T) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Box::new(value));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    fn find(&self, name: &str) -> Result<&dyn Any, HintError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(|value| value.as_ref())
            .ok_or_else(|| HintError::ScopeVariableNotFound(name.to_string()))
    }

    pub fn get_ref<T: Any>(&self, name: &str) -> Result<&T, HintError> {
        self.find(name)?
            .downcast_ref::<T>()
            .ok_or_else(|| HintError::ScopeVariableTypeMismatch(name.to_string()))
    }

    pub fn get_mut<T: Any>(&mut self, name: &str) -> Result<&mut T, HintError> {
        let value = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
            .ok_or_else(|| HintError::ScopeVariableNotFound(name.to_string()))?;
        value
            .downcast_mut::<T>()
            .ok_or_else(|| HintError::ScopeVariableTypeMismatch(name.to_string()))
    }

    pub fn get<T: Any + Clone>(&self, name: &str) -> Result<T, HintError> {
        self.get_ref::<T>(name).cloned()
    }
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScopeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.scopes.iter().map(|scope| {
                let mut names: Vec<&String> = scope.keys().collect();
                names.sort();
                names
            }))
            .finish()
    }
}

// ============================================================================
// Hint context
// ============================================================================

pub struct HintContext<'a> {
    pub memory: &'a mut Memory,
    pub registers: &'a Registers,
    pub scopes: &'a mut ScopeManager,
    /// Address of program offset 0; hint pcs are relative to it
    pub code_base: MemoryAddress,
}

impl HintContext<'_> {
    pub fn cell_address(&self, cell: &CellRef) -> Result<MemoryAddress, HintError> {
        Ok(self
            .registers
            .get(cell.register)
            .add_signed(cell.offset.into())?)
    }

    pub fn read_cell(&self, cell: &CellRef) -> Result<MemoryValue, HintError> {
        Ok(self.memory.read(self.cell_address(cell)?)?)
    }

    pub fn write_cell(&mut self, cell: &CellRef, value: MemoryValue) -> Result<(), HintError> {
        let address = self.cell_address(cell)?;
        Ok(self.memory.write(address, value)?)
    }

    pub fn resolve(&self, operand: &ResOperand) -> Result<MemoryValue, HintError> {
        match operand {
            ResOperand::Deref(cell) => self.read_cell(cell),
            ResOperand::DoubleDeref(cell, offset) => {
                let base = self.read_cell(cell)?.as_address()?;
                Ok(self.memory.read(base.add_signed((*offset).into())?)?)
            }
            ResOperand::Immediate(value) => Ok(MemoryValue::Felt(*value)),
            ResOperand::BinOp(binop) => {
                let lhs = self.read_cell(&binop.a)?;
                let rhs = match &binop.b {
                    DerefOrImmediate::Deref(cell) => self.read_cell(cell)?,
                    DerefOrImmediate::Immediate(value) => MemoryValue::Felt(*value),
                };
                Ok(match binop.op {
                    Operation::Add => lhs.add(&rhs)?,
                    Operation::Mul => lhs.mul(&rhs)?,
                })
            }
        }
    }

    pub fn resolve_felt(&self, operand: &ResOperand) -> Result<Felt, HintError> {
        Ok(self.resolve(operand)?.as_felt()?)
    }

    /// Program-relative offset of `pc`, if it lies in the code segment
    pub fn relative_pc(&self, pc: MemoryAddress) -> Option<u64> {
        if pc.segment_index != self.code_base.segment_index {
            return None;
        }
        pc.offset.checked_sub(self.code_base.offset)
    }
}

// ============================================================================
// Runners
// ============================================================================

/// Hook invoked before every step
pub trait HintRunner {
    fn on_before_step(
        &mut self,
        pc: MemoryAddress,
        ctx: &mut HintContext<'_>,
    ) -> Result<(), HintError>;
}

/// Runner that executes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHintRunner;

impl HintRunner for NoHintRunner {
    fn on_before_step(&mut self, _: MemoryAddress, _: &mut HintContext<'_>) -> Result<(), HintError> {
        Ok(())
    }
}

/// Runner for the hints of [`CoreHint`]
#[derive(Debug, Clone, Default)]
pub struct CoreHintRunner {
    hints: HashMap<u64, Vec<CoreHint>>,
}

impl CoreHintRunner {
    pub fn new(hints: HashMap<u64, Vec<CoreHint>>) -> Self {
        Self { hints }
    }

    /// Parse the hints table of a program; unknown hints fail here
    pub fn from_program(program: &Program) -> Result<Self, HintError> {
        let mut hints = HashMap::new();
        for (pc, batch) in &program.hints {
            let parsed = batch
                .iter()
                .map(CoreHint::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            hints.insert(*pc, parsed);
        }
        Ok(Self { hints })
    }

    pub fn len(&self) -> usize {
        self.hints.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HintRunner for CoreHintRunner {
    fn on_before_step(
        &mut self,
        pc: MemoryAddress,
        ctx: &mut HintContext<'_>,
    ) -> Result<(), HintError> {
        let Some(offset) = ctx.relative_pc(pc) else {
            return Ok(());
        };
        let Some(batch) = self.hints.get(&offset) else {
            return Ok(());
        };
        tracing::debug!(pc = %pc, count = batch.len(), "running hints");
        for hint in batch {
            execute_hint(hint, ctx)?;
        }
        Ok(())
    }
}

// ============================================================================
// Core hints
// ============================================================================

fn bounded(hint: &'static str, value: Felt, bits: u32) -> Result<BigUint, HintError> {
    if value.bits() > bits {
        return Err(HintError::ValueOutOfRange { hint, value, bits });
    }
    Ok(value.to_biguint())
}

fn felt_of(value: &BigUint) -> Result<MemoryValue, HintError> {
    Ok(MemoryValue::Felt(
        Felt::from_biguint(value).map_err(MathError::from)?,
    ))
}

fn flag(condition: bool) -> MemoryValue {
    MemoryValue::from(u64::from(condition))
}

pub fn execute_hint(hint: &CoreHint, ctx: &mut HintContext<'_>) -> Result<(), HintError> {
    match hint {
        CoreHint::AllocSegment { dst } => {
            let segment = ctx.memory.allocate_segment();
            ctx.write_cell(dst, MemoryValue::Address(segment))
        }
        CoreHint::TestLessThan { lhs, rhs, dst } => {
            let (lhs, rhs) = (ctx.resolve_felt(lhs)?, ctx.resolve_felt(rhs)?);
            ctx.write_cell(dst, flag(lhs < rhs))
        }
        CoreHint::TestLessThanOrEqual { lhs, rhs, dst } => {
            let (lhs, rhs) = (ctx.resolve_felt(lhs)?, ctx.resolve_felt(rhs)?);
            ctx.write_cell(dst, flag(lhs <= rhs))
        }
        CoreHint::DivMod {
            lhs,
            rhs,
            quotient,
            remainder,
        } => {
            let lhs = ctx.resolve_felt(lhs)?.to_biguint();
            let rhs = ctx.resolve_felt(rhs)?.to_biguint();
            if rhs.is_zero() {
                return Err(HintError::DivisionByZero("DivMod"));
            }
            ctx.write_cell(quotient, felt_of(&(&lhs / &rhs))?)?;
            ctx.write_cell(remainder, felt_of(&(&lhs % &rhs))?)
        }
        CoreHint::SquareRoot { value, dst } => {
            let value = bounded("SquareRoot", ctx.resolve_felt(value)?, 128)?;
            ctx.write_cell(dst, felt_of(&value.sqrt())?)
        }
        CoreHint::LinearSplit {
            value,
            scalar,
            max_x,
            x,
            y,
        } => {
            let value = ctx.resolve_felt(value)?.to_biguint();
            let scalar = ctx.resolve_felt(scalar)?.to_biguint();
            let max_x = ctx.resolve_felt(max_x)?.to_biguint();
            if scalar.is_zero() {
                return Err(HintError::DivisionByZero("LinearSplit"));
            }
            let x_value = (&value / &scalar).min(max_x);
            let y_value = &value - &x_value * &scalar;
            ctx.write_cell(x, felt_of(&x_value)?)?;
            ctx.write_cell(y, felt_of(&y_value)?)
        }
        CoreHint::WideMul128 {
            lhs,
            rhs,
            high,
            low,
        } => {
            let lhs = bounded("WideMul128", ctx.resolve_felt(lhs)?, 128)?;
            let rhs = bounded("WideMul128", ctx.resolve_felt(rhs)?, 128)?;
            let product = lhs * rhs;
            let mask = (BigUint::one() << 128u32) - BigUint::one();
            ctx.write_cell(high, felt_of(&(&product >> 128u32))?)?;
            ctx.write_cell(low, felt_of(&(&product & &mask))?)
        }
        CoreHint::AllocConstantSize { size, dst } => {
            let size_felt = ctx.resolve_felt(size)?;
            let size = size_felt.to_u64().ok_or(HintError::ValueOutOfRange {
                hint: "AllocConstantSize",
                value: size_felt,
                bits: 64,
            })?;
            let next = match ctx.scopes.get::<MemoryAddress>(CONSTANT_SIZE_SEGMENT) {
                Ok(next) => next,
                Err(HintError::ScopeVariableNotFound(_)) => ctx.memory.allocate_segment(),
                Err(err) => return Err(err),
            };
            ctx.write_cell(dst, MemoryValue::Address(next))?;
            ctx.scopes
                .assign(CONSTANT_SIZE_SEGMENT, next.add_offset(size)?);
            Ok(())
        }
        CoreHint::EnterScope => {
            ctx.scopes.enter_scope(Scope::new());
            Ok(())
        }
        CoreHint::ExitScope => ctx.scopes.exit_scope(),
        CoreHint::DebugPrint { start, end } => {
            let start = ctx.resolve(start)?.as_address()?;
            let end = ctx.resolve(end)?.as_address()?;
            if start.segment_index != end.segment_index {
                return Err(MathError::CrossSegmentSubtraction(Box::new((end, start))).into());
            }
            for offset in start.offset..end.offset {
                let value = ctx
                    .memory
                    .read(MemoryAddress::new(start.segment_index, offset))?;
                tracing::info!("[DEBUG] {}", value);
            }
            Ok(())
        }
    }
}
