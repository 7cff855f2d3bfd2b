//! Main disassembler logic
//!
//! Three passes: decode, collect jump and call targets, format. Labels are
//! comments, so the listing assembles back to the same bytecode.

use crate::decoder::{decode, Decoded, DecodedItem};
use crate::error::Result;
use crate::formatter::{div_comment, format, format_data};
use casm_spec::{Felt, Instruction, Op1Source, Opcode, PcUpdate, Program, ResLogic};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TargetKind {
    Jump,
    Call,
}

/// Static target of a control-flow instruction with an immediate operand
fn target_of(offset: u64, inst: &Instruction, immediate: Option<&Felt>) -> Option<(u64, TargetKind)> {
    if inst.op1_source != Op1Source::Imm
        || !matches!(inst.res_logic, ResLogic::Op1 | ResLogic::Unconstrained)
    {
        return None;
    }
    let value = immediate?;
    let kind = if inst.opcode == Opcode::Call {
        TargetKind::Call
    } else {
        TargetKind::Jump
    };
    let target = match inst.pc_update {
        PcUpdate::JumpAbs => value.to_u64()?,
        PcUpdate::JumpRel | PcUpdate::Jnz => {
            let relative = value.to_i64()?;
            u64::try_from(i128::from(offset) + i128::from(relative)).ok()?
        }
        PcUpdate::Next => return None,
    };
    Some((target, kind))
}

/// Label names by target offset
fn assign_labels(items: &[DecodedItem], end: u64) -> BTreeMap<u64, String> {
    let boundaries: BTreeSet<u64> = items
        .iter()
        .map(|item| item.offset)
        .chain(std::iter::once(end))
        .collect();

    let mut targets: BTreeMap<u64, TargetKind> = BTreeMap::new();
    for item in items {
        if let Decoded::Instruction {
            instruction,
            immediate,
        } = &item.decoded
        {
            if let Some((target, kind)) = target_of(item.offset, instruction, immediate.as_ref()) {
                if boundaries.contains(&target) {
                    let entry = targets.entry(target).or_insert(kind);
                    *entry = (*entry).max(kind);
                }
            }
        }
    }

    let (mut jumps, mut calls) = (0usize, 0usize);
    targets
        .into_iter()
        .map(|(target, kind)| {
            let name = match kind {
                TargetKind::Jump => {
                    jumps += 1;
                    format!("L{}", jumps - 1)
                }
                TargetKind::Call => {
                    calls += 1;
                    format!("F{}", calls - 1)
                }
            };
            (target, name)
        })
        .collect()
}

/// Disassemble bytecode into assembly text
pub fn disassemble_bytecode(bytecode: &[Felt]) -> Result<String> {
    let items = decode(bytecode);
    let end = bytecode.len() as u64;
    let labels = assign_labels(&items, end);
    let mut output = String::new();

    writeln!(output, "// Cairo disassembly: {} words", bytecode.len())?;

    for item in &items {
        if let Some(label) = labels.get(&item.offset) {
            writeln!(output, "// {}:", label)?;
        }
        match &item.decoded {
            Decoded::Data(value) => writeln!(output, "    {};", format_data(value))?,
            Decoded::Instruction {
                instruction,
                immediate,
            } => {
                let immediate = immediate.as_ref();
                let text = format(instruction, immediate);
                let note = div_comment(instruction, immediate).or_else(|| {
                    target_of(item.offset, instruction, immediate)
                        .and_then(|(target, _)| labels.get(&target))
                        .map(|label| format!("-> {}", label))
                });
                match note {
                    Some(note) => writeln!(output, "    {}; // {}", text, note)?,
                    None => writeln!(output, "    {};", text)?,
                }
            }
        }
    }
    if let Some(label) = labels.get(&end) {
        writeln!(output, "// {}:", label)?;
    }

    Ok(output)
}

/// Disassemble a program into assembly text
pub fn disassemble(program: &Program) -> Result<String> {
    disassemble_bytecode(&program.bytecode)
}

/// Load a JSON program file and disassemble it
pub fn disassemble_file(path: impl AsRef<Path>) -> Result<String> {
    disassemble(&Program::from_file(path)?)
}
