//! Single-step execution of a decoded Cairo instruction
//!
//! A step never mutates anything until it is known to succeed: operands are
//! resolved and deduced against a shared borrow of memory, the new register
//! values are computed, and only then are the deduced cells committed.
//!
//! Operand reads are lazy. An operand is only addressed and read when the
//! instruction consumes it, so e.g. `jmp rel 0` never touches `[fp - 1]`.

use crate::builtins::deduce_memory_cell;
use crate::error::StepError;
use crate::memory::Memory;
use crate::state::Registers;
use casm_spec::{
    ApUpdate, Felt, Instruction, MemoryAddress, MemoryValue, Op1Source, Opcode, PcUpdate,
    ResLogic,
};

/// Everything a step resolved, plus the registers it moves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub next: Registers,
    pub dst_addr: MemoryAddress,
    pub op0_addr: MemoryAddress,
    pub op1_addr: MemoryAddress,
    pub dst: Option<MemoryValue>,
    pub op0: Option<MemoryValue>,
    pub op1: Option<MemoryValue>,
    pub res: Option<MemoryValue>,
    /// Cells filled in by deduction, committed after the step succeeds
    pub deduced: Vec<(MemoryAddress, MemoryValue)>,
}

// ============================================================================
// Operand usage
// ============================================================================

fn needs_res(inst: &Instruction) -> bool {
    matches!(inst.pc_update, PcUpdate::JumpAbs | PcUpdate::JumpRel)
        || inst.ap_update == ApUpdate::AddRes
        || matches!(inst.opcode, Opcode::AssertEq | Opcode::Ret)
}

fn needs_dst(inst: &Instruction) -> bool {
    matches!(inst.opcode, Opcode::AssertEq | Opcode::Call | Opcode::Ret)
        || inst.pc_update == PcUpdate::Jnz
}

fn needs_op1(inst: &Instruction) -> bool {
    needs_res(inst) || inst.pc_update == PcUpdate::Jnz
}

fn needs_op0(inst: &Instruction) -> bool {
    (inst.op1_source == Op1Source::Op0 && needs_op1(inst))
        || (matches!(inst.res_logic, ResLogic::Add | ResLogic::Mul) && needs_res(inst))
        || inst.opcode == Opcode::Call
}

/// Read a cell, falling back to the deduction rule of its builtin segment
fn lookup(
    memory: &Memory,
    address: MemoryAddress,
    deduced: &mut Vec<(MemoryAddress, MemoryValue)>,
) -> Result<Option<MemoryValue>, StepError> {
    if let Some(value) = memory.get(address) {
        return Ok(Some(value));
    }
    let value = deduce_memory_cell(memory, address)?;
    if let Some(value) = value {
        deduced.push((address, value));
    }
    Ok(value)
}

fn felt_div(numerator: &MemoryValue, denominator: &MemoryValue) -> Option<MemoryValue> {
    match (numerator, denominator) {
        (MemoryValue::Felt(n), MemoryValue::Felt(d)) if !d.is_zero() => {
            n.field_div(d).ok().map(MemoryValue::Felt)
        }
        _ => None,
    }
}

// ============================================================================
// Deduction rules
// ============================================================================

fn deduce_op0(
    inst: &Instruction,
    return_pc: MemoryAddress,
    dst: Option<&MemoryValue>,
    op1: Option<&MemoryValue>,
) -> Result<Option<MemoryValue>, StepError> {
    match inst.opcode {
        Opcode::Call => Ok(Some(MemoryValue::Address(return_pc))),
        Opcode::AssertEq => match (inst.res_logic, dst, op1) {
            (ResLogic::Add, Some(dst), Some(op1)) => Ok(Some(dst.sub(op1)?)),
            (ResLogic::Mul, Some(dst), Some(op1)) => Ok(felt_div(dst, op1)),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

fn deduce_op1(
    inst: &Instruction,
    dst: Option<&MemoryValue>,
    op0: Option<&MemoryValue>,
) -> Result<Option<MemoryValue>, StepError> {
    if inst.opcode != Opcode::AssertEq {
        return Ok(None);
    }
    match (inst.res_logic, dst, op0) {
        (ResLogic::Op1, Some(dst), _) => Ok(Some(*dst)),
        (ResLogic::Add, Some(dst), Some(op0)) => Ok(Some(dst.sub(op0)?)),
        (ResLogic::Mul, Some(dst), Some(op0)) => Ok(felt_div(dst, op0)),
        _ => Ok(None),
    }
}

fn compute_res(
    inst: &Instruction,
    op0: Option<&MemoryValue>,
    op1: Option<&MemoryValue>,
) -> Result<Option<MemoryValue>, StepError> {
    match (inst.res_logic, op0, op1) {
        (ResLogic::Op1, _, Some(op1)) => Ok(Some(*op1)),
        (ResLogic::Add, Some(op0), Some(op1)) => Ok(Some(op0.add(op1)?)),
        (ResLogic::Mul, Some(op0), Some(op1)) => Ok(Some(op0.mul(op1)?)),
        (ResLogic::Unconstrained, _, _) => Err(StepError::UnconstrainedResUsed),
        _ => Ok(None),
    }
}

// ============================================================================
// Register updates
// ============================================================================

fn next_pc(
    inst: &Instruction,
    regs: &Registers,
    dst_addr: MemoryAddress,
    dst: Option<&MemoryValue>,
    op1: Option<&MemoryValue>,
    res: Option<&MemoryValue>,
) -> Result<MemoryAddress, StepError> {
    let fallthrough = regs.pc.add_offset(inst.size())?;
    match inst.pc_update {
        PcUpdate::Next => Ok(fallthrough),
        PcUpdate::JumpAbs => match res {
            Some(MemoryValue::Address(target)) => Ok(*target),
            Some(MemoryValue::Felt(target)) => target
                .to_u64()
                .map(|offset| MemoryAddress::new(regs.pc.segment_index, offset))
                .ok_or(StepError::JumpTargetNotAddress(*target)),
            None => Err(StepError::UnconstrainedResUsed),
        },
        PcUpdate::JumpRel => {
            let res = res.ok_or(StepError::UnconstrainedResUsed)?;
            Ok(regs.pc.add_felt(&res.as_felt()?)?)
        }
        PcUpdate::Jnz => match dst {
            Some(MemoryValue::Felt(cond)) if cond.is_zero() => Ok(fallthrough),
            Some(MemoryValue::Felt(_)) => {
                let step = op1.map(MemoryValue::as_felt).transpose()?;
                Ok(regs.pc.add_felt(&step.unwrap_or(Felt::ZERO))?)
            }
            _ => Err(StepError::JnzOnAddress(dst_addr)),
        },
    }
}

fn next_ap(
    inst: &Instruction,
    regs: &Registers,
    res: Option<&MemoryValue>,
) -> Result<MemoryAddress, StepError> {
    match inst.ap_update {
        ApUpdate::Same => Ok(regs.ap),
        ApUpdate::AddRes => {
            let res = res.ok_or(StepError::UnconstrainedResUsed)?;
            Ok(regs.ap.add_felt(&res.as_felt()?)?)
        }
        ApUpdate::Add1 => Ok(regs.ap.add_offset(1)?),
        ApUpdate::Add2 => Ok(regs.ap.add_offset(2)?),
    }
}

fn next_fp(
    inst: &Instruction,
    regs: &Registers,
    dst: Option<&MemoryValue>,
) -> Result<MemoryAddress, StepError> {
    match inst.opcode {
        Opcode::Call => Ok(regs.ap.add_offset(2)?),
        Opcode::Ret => match dst {
            Some(value) => Ok(value.as_address()?),
            None => Ok(regs.fp),
        },
        _ => Ok(regs.fp),
    }
}

// ============================================================================
// Step
// ============================================================================

/// Resolve, deduce and check one instruction without touching memory
pub fn compute_step(
    memory: &Memory,
    regs: &Registers,
    inst: &Instruction,
) -> Result<StepOutcome, StepError> {
    if !matches!(inst.opcode, Opcode::Call | Opcode::Ret)
        && (regs.ap.segment_index != regs.fp.segment_index || regs.ap.offset < regs.fp.offset)
    {
        return Err(StepError::ApBelowFp {
            ap: regs.ap,
            fp: regs.fp,
        });
    }

    let (use_dst, use_op0, use_op1, use_res) =
        (needs_dst(inst), needs_op0(inst), needs_op1(inst), needs_res(inst));
    let return_pc = regs.pc.add_offset(inst.size())?;
    let mut deduced = Vec::new();

    let dst_addr = if use_dst {
        regs.get(inst.dst_register).add_signed(inst.off_dst.into())?
    } else {
        MemoryAddress::UNKNOWN
    };
    let op0_addr = if use_op0 {
        regs.get(inst.op0_register).add_signed(inst.off_op0.into())?
    } else {
        MemoryAddress::UNKNOWN
    };

    let mut dst = if use_dst {
        lookup(memory, dst_addr, &mut deduced)?
    } else {
        None
    };
    let mut op0 = if use_op0 {
        lookup(memory, op0_addr, &mut deduced)?
    } else {
        None
    };

    // op1 addresses that do not depend on op0 are read before op0 deduction
    let mut op1_addr = MemoryAddress::UNKNOWN;
    let mut op1 = None;
    if use_op1 && inst.op1_source != Op1Source::Op0 {
        let base = match inst.op1_source {
            Op1Source::Imm => regs.pc,
            Op1Source::Fp => regs.fp,
            _ => regs.ap,
        };
        op1_addr = base.add_signed(inst.off_op1.into())?;
        op1 = lookup(memory, op1_addr, &mut deduced)?;
    }

    if use_op0 && op0.is_none() {
        op0 = deduce_op0(inst, return_pc, dst.as_ref(), op1.as_ref())?;
        if let Some(value) = op0 {
            deduced.push((op0_addr, value));
        }
    }

    if use_op1 && inst.op1_source == Op1Source::Op0 {
        if let Some(base) = op0 {
            op1_addr = base.as_address()?.add_signed(inst.off_op1.into())?;
            op1 = lookup(memory, op1_addr, &mut deduced)?;
        }
    }

    if use_op1 && op1.is_none() && !op1_addr.is_unknown() {
        op1 = deduce_op1(inst, dst.as_ref(), op0.as_ref())?;
        if let Some(value) = op1 {
            deduced.push((op1_addr, value));
        }
    }

    let res = if use_res {
        compute_res(inst, op0.as_ref(), op1.as_ref())?
    } else {
        None
    };

    if use_dst && dst.is_none() {
        dst = match inst.opcode {
            Opcode::AssertEq => res,
            Opcode::Call => Some(MemoryValue::Address(regs.fp)),
            _ => None,
        };
        if let Some(value) = dst {
            deduced.push((dst_addr, value));
        }
    }

    if (use_dst && dst.is_none())
        || (use_op0 && op0.is_none())
        || (use_op1 && op1.is_none())
        || (use_res && res.is_none())
    {
        return Err(StepError::UnderdeterminedOperands {
            dst: dst_addr,
            op0: op0_addr,
            op1: op1_addr,
        });
    }

    match inst.opcode {
        Opcode::AssertEq => {
            if let (Some(dst), Some(res)) = (dst, res) {
                if dst != res {
                    return Err(StepError::AssertEqFailed { dst, res });
                }
            }
        }
        Opcode::Call => {
            let ap_next = regs.ap.add_offset(1)?;
            if dst_addr != regs.ap || op0_addr != ap_next {
                return Err(StepError::InvalidCallOperands {
                    dst: dst_addr,
                    op0: op0_addr,
                    ap: regs.ap,
                });
            }
            check_frame_cell("[ap]", MemoryValue::Address(regs.fp), dst)?;
            check_frame_cell("[ap + 1]", MemoryValue::Address(return_pc), op0)?;
        }
        Opcode::Ret | Opcode::Nop => {}
    }

    let next = Registers::new(
        next_pc(inst, regs, dst_addr, dst.as_ref(), op1.as_ref(), res.as_ref())?,
        next_ap(inst, regs, res.as_ref())?,
        next_fp(inst, regs, dst.as_ref())?,
    );

    Ok(StepOutcome {
        next,
        dst_addr,
        op0_addr,
        op1_addr,
        dst,
        op0,
        op1,
        res,
        deduced,
    })
}

fn check_frame_cell(
    cell: &'static str,
    expected: MemoryValue,
    found: Option<MemoryValue>,
) -> Result<(), StepError> {
    match found {
        Some(found) if found != expected => Err(StepError::CallFrameMismatch {
            cell,
            expected,
            found,
        }),
        _ => Ok(()),
    }
}

/// Compute a step and commit its deduced cells
pub fn execute_step(
    memory: &mut Memory,
    regs: &Registers,
    inst: &Instruction,
) -> Result<StepOutcome, StepError> {
    let outcome = compute_step(memory, regs, inst)?;
    for (address, value) in &outcome.deduced {
        memory.write(*address, *value)?;
    }
    Ok(outcome)
}
