//! Instruction encoder
//!
//! Lowers parsed statements to [`Instruction`]s and packs them with
//! [`casm_spec::encoding`]. Operands an instruction does not use get the
//! canonical `[fp - 1]`; an immediate always sits at `off_op1 = 1`.

use crate::error::{AssemblerError, Result};
use crate::parser::{BinOp, Deref, Expr, JumpKind, Operand, ParsedInstruction, Statement};
use casm_spec::{
    ApUpdate, Felt, Instruction, Op1Source, Opcode, PcUpdate, Register, ResLogic,
};

const UNUSED: Deref = Deref {
    register: Register::Fp,
    offset: -1,
};

/// Operand part of an instruction computed from a `res` expression
struct ResParts {
    op0: Deref,
    op1_source: Op1Source,
    off_op1: i16,
    res_logic: ResLogic,
    immediate: Option<Felt>,
}

fn op1_from_deref(d: Deref) -> (Op1Source, i16) {
    match d.register {
        Register::Ap => (Op1Source::Ap, d.offset),
        Register::Fp => (Op1Source::Fp, d.offset),
    }
}

fn lower_expr(expr: &Expr) -> ResParts {
    let plain = |op1_source, off_op1, immediate| ResParts {
        op0: UNUSED,
        op1_source,
        off_op1,
        res_logic: ResLogic::Op1,
        immediate,
    };
    match *expr {
        Expr::Deref(d) => {
            let (source, offset) = op1_from_deref(d);
            plain(source, offset, None)
        }
        Expr::Immediate(value) => plain(Op1Source::Imm, 1, Some(value)),
        Expr::DoubleDeref(base, offset) => ResParts {
            op0: base,
            op1_source: Op1Source::Op0,
            off_op1: offset,
            res_logic: ResLogic::Op1,
            immediate: None,
        },
        Expr::BinOp { op, lhs, rhs } => {
            let (op1_source, off_op1, immediate) = match rhs {
                Operand::Deref(d) => {
                    let (source, offset) = op1_from_deref(d);
                    (source, offset, None)
                }
                Operand::Immediate(value) => (Op1Source::Imm, 1, Some(value)),
            };
            ResParts {
                op0: lhs,
                op1_source,
                off_op1,
                res_logic: match op {
                    BinOp::Add => ResLogic::Add,
                    BinOp::Mul => ResLogic::Mul,
                },
                immediate,
            }
        }
    }
}

fn build(
    dst: Deref,
    parts: &ResParts,
    pc_update: PcUpdate,
    ap_update: ApUpdate,
    opcode: Opcode,
) -> Instruction {
    Instruction {
        off_dst: dst.offset,
        off_op0: parts.op0.offset,
        off_op1: parts.off_op1,
        dst_register: dst.register,
        op0_register: parts.op0.register,
        op1_source: parts.op1_source,
        res_logic: parts.res_logic,
        pc_update,
        ap_update,
        opcode,
    }
}

/// Machine form of one statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lowered {
    Instruction {
        instruction: Instruction,
        immediate: Option<Felt>,
    },
    Data(Felt),
}

/// Lower a parsed instruction to its logical form
pub fn lower(parsed: &ParsedInstruction) -> Result<Lowered> {
    let invalid = |reason: &str| AssemblerError::InvalidCombination {
        line: parsed.line,
        column: parsed.column,
        reason: reason.to_string(),
    };
    let ap_step = if parsed.ap_increment {
        ApUpdate::Add1
    } else {
        ApUpdate::Same
    };

    let (instruction, immediate) = match &parsed.statement {
        Statement::Data(value) => {
            if parsed.ap_increment {
                return Err(invalid("'dw' cannot take ap++"));
            }
            return Ok(Lowered::Data(*value));
        }
        Statement::AssertEq { dst, value } => {
            let parts = lower_expr(value);
            (
                build(*dst, &parts, PcUpdate::Next, ap_step, Opcode::AssertEq),
                parts.immediate,
            )
        }
        Statement::Jump { kind, target } => {
            let parts = lower_expr(target);
            let pc_update = match kind {
                JumpKind::Abs => PcUpdate::JumpAbs,
                JumpKind::Rel => PcUpdate::JumpRel,
            };
            (
                build(UNUSED, &parts, pc_update, ap_step, Opcode::Nop),
                parts.immediate,
            )
        }
        Statement::Jnz { target, condition } => {
            let mut parts = lower_expr(target);
            parts.res_logic = ResLogic::Unconstrained;
            (
                build(*condition, &parts, PcUpdate::Jnz, ap_step, Opcode::Nop),
                parts.immediate,
            )
        }
        Statement::Call { kind, target } => {
            if parsed.ap_increment {
                return Err(invalid("call cannot take ap++"));
            }
            let mut parts = lower_expr(target);
            parts.op0 = Deref::new(Register::Ap, 1);
            let pc_update = match kind {
                JumpKind::Abs => PcUpdate::JumpAbs,
                JumpKind::Rel => PcUpdate::JumpRel,
            };
            (
                build(
                    Deref::new(Register::Ap, 0),
                    &parts,
                    pc_update,
                    ApUpdate::Add2,
                    Opcode::Call,
                ),
                parts.immediate,
            )
        }
        Statement::Ret => {
            if parsed.ap_increment {
                return Err(invalid("ret cannot take ap++"));
            }
            let parts = lower_expr(&Expr::Deref(UNUSED));
            (
                build(
                    Deref::new(Register::Fp, -2),
                    &parts,
                    PcUpdate::JumpAbs,
                    ApUpdate::Same,
                    Opcode::Ret,
                ),
                None,
            )
        }
        Statement::ApAdd(value) => {
            if parsed.ap_increment {
                return Err(invalid("ap += cannot be combined with ap++"));
            }
            let parts = lower_expr(value);
            (
                build(UNUSED, &parts, PcUpdate::Next, ApUpdate::AddRes, Opcode::Nop),
                parts.immediate,
            )
        }
    };

    Ok(Lowered::Instruction {
        instruction,
        immediate,
    })
}

/// Encode a parsed instruction into its bytecode words
pub fn encode(parsed: &ParsedInstruction) -> Result<Vec<Felt>> {
    match lower(parsed)? {
        Lowered::Data(value) => Ok(vec![value]),
        Lowered::Instruction {
            instruction,
            immediate,
        } => {
            let word = instruction
                .encode()
                .map_err(|err| AssemblerError::InvalidCombination {
                    line: parsed.line,
                    column: parsed.column,
                    reason: err.to_string(),
                })?;
            let mut words = vec![Felt::from(word)];
            words.extend(immediate);
            Ok(words)
        }
    }
}
