//! Instruction formatting to assembly text

use casm_spec::{ApUpdate, Felt, Instruction, Op1Source, Opcode, PcUpdate, Register, ResLogic};

/// Format `[reg + off]`
pub fn format_deref(register: Register, offset: i16) -> String {
    let offset = i32::from(offset);
    match offset {
        0 => format!("[{}]", register),
        o if o > 0 => format!("[{} + {}]", register, o),
        o => format!("[{} - {}]", register, -o),
    }
}

/// Immediates print in the signed view
pub fn format_immediate(value: &Felt) -> String {
    value.to_bigint().to_string()
}

fn format_op1(inst: &Instruction, immediate: Option<&Felt>) -> String {
    match inst.op1_source {
        Op1Source::Imm => immediate.map(format_immediate).unwrap_or_default(),
        Op1Source::Fp => format_deref(Register::Fp, inst.off_op1),
        Op1Source::Ap => format_deref(Register::Ap, inst.off_op1),
        Op1Source::Op0 => {
            let base = format_deref(inst.op0_register, inst.off_op0);
            let offset = i32::from(inst.off_op1);
            match offset {
                0 => format!("[{}]", base),
                o if o > 0 => format!("[{} + {}]", base, o),
                o => format!("[{} - {}]", base, -o),
            }
        }
    }
}

fn format_res(inst: &Instruction, immediate: Option<&Felt>) -> String {
    let op1 = format_op1(inst, immediate);
    let op0 = || format_deref(inst.op0_register, inst.off_op0);
    match inst.res_logic {
        ResLogic::Op1 | ResLogic::Unconstrained => op1,
        ResLogic::Add => format!("{} + {}", op0(), op1),
        ResLogic::Mul => format!("{} * {}", op0(), op1),
    }
}

fn jump_kind(pc_update: PcUpdate) -> &'static str {
    match pc_update {
        PcUpdate::JumpAbs => "abs",
        _ => "rel",
    }
}

/// Format an instruction as one statement, without the trailing `;`
///
/// The instruction must have a surface form (see
/// [`crate::decoder::is_expressible`]).
pub fn format(inst: &Instruction, immediate: Option<&Felt>) -> String {
    let dst = format_deref(inst.dst_register, inst.off_dst);
    let mut text = match (inst.opcode, inst.pc_update) {
        (Opcode::Ret, _) => "ret".to_string(),
        (Opcode::Call, pc) => format!("call {} {}", jump_kind(pc), format_op1(inst, immediate)),
        (Opcode::AssertEq, _) => format!("{} = {}", dst, format_res(inst, immediate)),
        (Opcode::Nop, PcUpdate::Jnz) => {
            format!("jmp rel {} if {} != 0", format_op1(inst, immediate), dst)
        }
        (Opcode::Nop, PcUpdate::Next) => format!("ap += {}", format_res(inst, immediate)),
        (Opcode::Nop, pc) => format!("jmp {} {}", jump_kind(pc), format_res(inst, immediate)),
    };
    if inst.ap_update == ApUpdate::Add1 {
        text.push_str(", ap++");
    }
    text
}

/// Format a raw data word
pub fn format_data(value: &Felt) -> String {
    format!("dw {:#x}", value)
}

/// `// div n` note for a multiplication by the inverse of a small integer
pub fn div_comment(inst: &Instruction, immediate: Option<&Felt>) -> Option<String> {
    if inst.opcode != Opcode::AssertEq || inst.res_logic != ResLogic::Mul {
        return None;
    }
    let value = immediate?;
    if value.bits() <= 64 {
        return None;
    }
    let divisor = value.inverse()?.to_u64()?;
    Some(format!("div {}", divisor))
}
