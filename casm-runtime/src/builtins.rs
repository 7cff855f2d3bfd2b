//! Builtin runners
//!
//! Every builtin owns one tagged memory segment. The output builtin only
//! collects values; range checks validate their cells after the run; bitwise
//! fills its output cells from the two inputs of the same instance. The
//! cryptographic builtins get a segment and nothing else.

use crate::error::{BuiltinError, MemoryError};
use crate::memory::Memory;
use casm_spec::{Builtin, Felt, MemoryAddress, MemoryValue};
use num_bigint::BigUint;

/// Inputs to the bitwise builtin must fit in this many bits
pub const BITWISE_INPUT_BITS: u32 = 251;

/// Range bound, in bits, for the range-check flavours
pub fn range_check_bits(builtin: Builtin) -> Option<u32> {
    match builtin {
        Builtin::RangeCheck => Some(casm_spec::RANGE_CHECK_BOUND_BITS),
        Builtin::RangeCheck96 => Some(96),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinRunner {
    pub builtin: Builtin,
    pub base: MemoryAddress,
}

impl BuiltinRunner {
    pub fn new(builtin: Builtin, memory: &mut Memory) -> Self {
        let base = memory.allocate_builtin_segment(builtin);
        Self { builtin, base }
    }

    /// Value pushed on the initial stack for this builtin
    pub fn initial_stack(&self) -> MemoryValue {
        MemoryValue::Address(self.base)
    }

    /// Check every written cell after the run
    pub fn validate(&self, memory: &Memory) -> Result<(), BuiltinError> {
        let Some(bits) = range_check_bits(self.builtin) else {
            return Ok(());
        };
        let Ok(segment) = memory.segment(self.base.segment_index) else {
            return Ok(());
        };
        for (offset, value) in segment.iter() {
            let address = MemoryAddress::new(self.base.segment_index, offset);
            match value {
                MemoryValue::Felt(felt) if felt.bits() <= bits => {}
                MemoryValue::Felt(felt) => {
                    return Err(BuiltinError::RangeCheckOutOfBounds {
                        address,
                        value: *felt,
                        bits,
                    })
                }
                MemoryValue::Address(_) => return Err(BuiltinError::RangeCheckNotFelt(address)),
            }
        }
        Ok(())
    }

    /// Values written to the output segment; holes read as zero
    pub fn outputs(&self, memory: &Memory) -> Result<Vec<Felt>, MemoryError> {
        if self.builtin != Builtin::Output {
            return Ok(Vec::new());
        }
        let segment = memory.segment(self.base.segment_index)?;
        let table = memory.relocation_table();
        let mut outputs = vec![Felt::ZERO; segment.len() as usize];
        for (offset, value) in segment.iter() {
            outputs[offset as usize] = memory.relocate_value(&table, value)?;
        }
        Ok(outputs)
    }
}

/// Try to fill an unknown cell from the rule of the builtin owning it
///
/// Returns `Ok(None)` when the cell is not in a deducing segment or the
/// inputs are not there yet.
pub fn deduce_memory_cell(
    memory: &Memory,
    address: MemoryAddress,
) -> Result<Option<MemoryValue>, BuiltinError> {
    match memory.builtin_of(address.segment_index) {
        Some(Builtin::Bitwise) => deduce_bitwise(memory, address),
        _ => Ok(None),
    }
}

fn bitwise_input(memory: &Memory, address: MemoryAddress) -> Result<Option<BigUint>, BuiltinError> {
    match memory.get(address) {
        None => Ok(None),
        Some(MemoryValue::Address(_)) => Err(BuiltinError::BitwiseInputNotFelt(address)),
        Some(MemoryValue::Felt(felt)) if felt.bits() > BITWISE_INPUT_BITS => {
            Err(BuiltinError::BitwiseInputTooLarge {
                address,
                value: felt,
            })
        }
        Some(MemoryValue::Felt(felt)) => Ok(Some(felt.to_biguint())),
    }
}

fn deduce_bitwise(
    memory: &Memory,
    address: MemoryAddress,
) -> Result<Option<MemoryValue>, BuiltinError> {
    let cells = Builtin::Bitwise.cells_per_instance();
    let index = address.offset % cells;
    if index < 2 {
        return Ok(None);
    }
    let x_addr = MemoryAddress::new(address.segment_index, address.offset - index);
    let y_addr = MemoryAddress::new(address.segment_index, address.offset - index + 1);
    let (Some(x), Some(y)) = (bitwise_input(memory, x_addr)?, bitwise_input(memory, y_addr)?)
    else {
        return Ok(None);
    };
    let result = match index {
        2 => &x & &y,
        3 => &x ^ &y,
        _ => &x | &y,
    };
    // Inputs below 2^251 keep the result below p
    Ok(Felt::from_biguint(&result).ok().map(MemoryValue::Felt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitwise_deduction() {
        let mut memory = Memory::new();
        let runner = BuiltinRunner::new(Builtin::Bitwise, &mut memory);
        memory.write(runner.base, MemoryValue::from(12u64)).unwrap();
        memory
            .write(runner.base.add_offset(1).unwrap(), MemoryValue::from(10u64))
            .unwrap();

        let at = |k| runner.base.add_offset(k).unwrap();
        assert_eq!(deduce_memory_cell(&memory, at(2)).unwrap(), Some(MemoryValue::from(8u64)));
        assert_eq!(deduce_memory_cell(&memory, at(3)).unwrap(), Some(MemoryValue::from(6u64)));
        assert_eq!(deduce_memory_cell(&memory, at(4)).unwrap(), Some(MemoryValue::from(14u64)));
        assert_eq!(deduce_memory_cell(&memory, at(0)).unwrap(), None);
        // Second instance has no inputs yet
        assert_eq!(deduce_memory_cell(&memory, at(7)).unwrap(), None);
    }

    #[test]
    fn test_bitwise_rejects_large_input() {
        let mut memory = Memory::new();
        let runner = BuiltinRunner::new(Builtin::Bitwise, &mut memory);
        memory.write(runner.base, MemoryValue::from(-1i64)).unwrap();
        memory
            .write(runner.base.add_offset(1).unwrap(), MemoryValue::from(1u64))
            .unwrap();
        let err = deduce_memory_cell(&memory, runner.base.add_offset(2).unwrap()).unwrap_err();
        assert!(matches!(err, BuiltinError::BitwiseInputTooLarge { .. }));
    }

    #[test]
    fn test_non_deducing_segment() {
        let mut memory = Memory::new();
        let plain = memory.allocate_segment();
        let pedersen = BuiltinRunner::new(Builtin::Pedersen, &mut memory);
        assert_eq!(deduce_memory_cell(&memory, plain).unwrap(), None);
        assert_eq!(deduce_memory_cell(&memory, pedersen.base.add_offset(2).unwrap()).unwrap(), None);
    }

    #[test]
    fn test_range_check_validation() {
        let mut memory = Memory::new();
        let runner = BuiltinRunner::new(Builtin::RangeCheck, &mut memory);
        memory.write(runner.base, MemoryValue::from(u64::MAX)).unwrap();
        assert!(runner.validate(&memory).is_ok());

        memory
            .write(runner.base.add_offset(1).unwrap(), MemoryValue::from(-1i64))
            .unwrap();
        let err = runner.validate(&memory).unwrap_err();
        assert!(matches!(err, BuiltinError::RangeCheckOutOfBounds { bits: 128, .. }));
    }

    #[test]
    fn test_range_check96_bound() {
        let mut memory = Memory::new();
        let runner = BuiltinRunner::new(Builtin::RangeCheck96, &mut memory);
        let too_big = Felt::from(1u128 << 96);
        memory.write(runner.base, MemoryValue::Felt(too_big)).unwrap();
        assert!(runner.validate(&memory).is_err());
    }

    #[test]
    fn test_range_check_rejects_address() {
        let mut memory = Memory::new();
        let runner = BuiltinRunner::new(Builtin::RangeCheck, &mut memory);
        memory.write(runner.base, MemoryValue::Address(runner.base)).unwrap();
        assert_eq!(
            runner.validate(&memory),
            Err(BuiltinError::RangeCheckNotFelt(runner.base))
        );
    }

    #[test]
    fn test_outputs_fill_holes() {
        let mut memory = Memory::new();
        let runner = BuiltinRunner::new(Builtin::Output, &mut memory);
        memory
            .write(runner.base.add_offset(1).unwrap(), MemoryValue::from(7u64))
            .unwrap();
        assert_eq!(
            runner.outputs(&memory).unwrap(),
            vec![Felt::ZERO, Felt::from(7u64)]
        );
        assert_eq!(runner.initial_stack(), MemoryValue::Address(runner.base));
    }

    #[test]
    fn test_outputs_relocate_addresses() {
        let mut memory = Memory::new();
        let runner = BuiltinRunner::new(Builtin::Output, &mut memory);
        let other = memory.allocate_segment_with(&[MemoryValue::from(1u64)]).unwrap();
        memory
            .write(runner.base, MemoryValue::Address(other.add_offset(1).unwrap()))
            .unwrap();
        // output segment holds one cell at base 1, the other segment starts at 2
        assert_eq!(runner.outputs(&memory).unwrap(), vec![Felt::from(3u64)]);
    }

    #[test]
    fn test_outputs_missing_segment_fails() {
        let runner = BuiltinRunner {
            builtin: Builtin::Output,
            base: MemoryAddress::new(3, 0),
        };
        assert!(matches!(
            runner.outputs(&Memory::new()),
            Err(MemoryError::UnallocatedSegment { segment: 3, .. })
        ));
    }
}
