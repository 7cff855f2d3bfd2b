//! Segmented write-once memory
//!
//! Memory is an ordered list of segments. Each segment is an append-only
//! vector of optional cells. A cell can be written once; writing the same
//! value again is a no-op and writing a different one is an error. The order
//! in which cells are first written is recorded for the memory file.
//!
//! After a run every segment is assigned a base in one linear address space
//! (segment 0 starts at 1, address 0 is reserved) and addresses stored in
//! cells are rewritten to linear indices.

use crate::error::MemoryError;
use casm_spec::{Builtin, Felt, MemoryAddress, MemoryValue};

/// Largest offset a segment may grow to
pub const MAX_SEGMENT_LEN: u64 = 1 << 24;

/// Linear address of the first cell of segment 0
pub const FIRST_SEGMENT_BASE: u64 = 1;

#[derive(Debug, Clone, Default)]
pub struct Segment {
    cells: Vec<Option<MemoryValue>>,
    builtin: Option<Builtin>,
}

impl Segment {
    /// Highest written offset + 1
    pub fn len(&self) -> u64 {
        self.cells.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn builtin(&self) -> Option<Builtin> {
        self.builtin
    }

    /// Written cells with their offsets
    pub fn iter(&self) -> impl Iterator<Item = (u64, &MemoryValue)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(offset, cell)| cell.as_ref().map(|value| (offset as u64, value)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Memory {
    segments: Vec<Segment>,
    write_order: Vec<MemoryAddress>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Segments
    // ========================================================================

    pub fn allocate_segment(&mut self) -> MemoryAddress {
        self.segments.push(Segment::default());
        MemoryAddress::new(self.segments.len() - 1, 0)
    }

    /// Allocate a segment and fill it from offset 0
    pub fn allocate_segment_with(
        &mut self,
        values: &[MemoryValue],
    ) -> Result<MemoryAddress, MemoryError> {
        let base = self.allocate_segment();
        self.load_data(base, values)?;
        Ok(base)
    }

    pub fn allocate_builtin_segment(&mut self, builtin: Builtin) -> MemoryAddress {
        self.segments.push(Segment {
            cells: Vec::new(),
            builtin: Some(builtin),
        });
        MemoryAddress::new(self.segments.len() - 1, 0)
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, index: usize) -> Result<&Segment, MemoryError> {
        self.segments
            .get(index)
            .ok_or(MemoryError::UnallocatedSegment {
                segment: index,
                allocated: self.segments.len(),
            })
    }

    pub fn segment_len(&self, index: usize) -> Result<u64, MemoryError> {
        Ok(self.segment(index)?.len())
    }

    pub fn builtin_of(&self, index: usize) -> Option<Builtin> {
        self.segments.get(index).and_then(|segment| segment.builtin)
    }

    // ========================================================================
    // Cells
    // ========================================================================

    /// Probe a cell without failing on unwritten or unallocated addresses
    pub fn get(&self, address: MemoryAddress) -> Option<MemoryValue> {
        let segment = self.segments.get(address.segment_index)?;
        let offset = usize::try_from(address.offset).ok()?;
        segment.cells.get(offset).copied().flatten()
    }

    pub fn read(&self, address: MemoryAddress) -> Result<MemoryValue, MemoryError> {
        self.segment(address.segment_index)?;
        self.get(address)
            .ok_or(MemoryError::UninitialisedRead(address))
    }

    pub fn read_felt(&self, address: MemoryAddress) -> Result<Felt, MemoryError> {
        self.read(address)?
            .as_felt()
            .map_err(|source| MemoryError::TypeMismatch { address, source })
    }

    pub fn read_address(&self, address: MemoryAddress) -> Result<MemoryAddress, MemoryError> {
        self.read(address)?
            .as_address()
            .map_err(|source| MemoryError::TypeMismatch { address, source })
    }

    /// Write-once store; rewriting an equal value succeeds
    pub fn write(&mut self, address: MemoryAddress, value: MemoryValue) -> Result<(), MemoryError> {
        if address.is_unknown() || matches!(value, MemoryValue::Address(a) if a.is_unknown()) {
            return Err(MemoryError::UnknownAddressWrite);
        }
        if address.offset >= MAX_SEGMENT_LEN {
            return Err(MemoryError::SegmentTooLarge(address.offset));
        }
        let allocated = self.segments.len();
        let segment = self
            .segments
            .get_mut(address.segment_index)
            .ok_or(MemoryError::UnallocatedSegment {
                segment: address.segment_index,
                allocated,
            })?;

        let offset = address.offset as usize;
        if offset >= segment.cells.len() {
            segment.cells.resize(offset + 1, None);
        }
        match segment.cells[offset] {
            Some(existing) if existing == value => Ok(()),
            Some(existing) => Err(MemoryError::InconsistentWrite(Box::new((
                address, existing, value,
            )))),
            None => {
                segment.cells[offset] = Some(value);
                self.write_order.push(address);
                Ok(())
            }
        }
    }

    /// Write consecutive values starting at `ptr`; returns the next free address
    pub fn load_data(
        &mut self,
        ptr: MemoryAddress,
        values: &[MemoryValue],
    ) -> Result<MemoryAddress, MemoryError> {
        for (i, value) in values.iter().enumerate() {
            self.write(ptr.add_offset(i as u64)?, *value)?;
        }
        Ok(ptr.add_offset(values.len() as u64)?)
    }

    /// Addresses in the order they were first written
    pub fn write_order(&self) -> &[MemoryAddress] {
        &self.write_order
    }

    // ========================================================================
    // Relocation
    // ========================================================================

    /// Linear base of every segment
    pub fn relocation_table(&self) -> Vec<u64> {
        let mut table = Vec::with_capacity(self.segments.len());
        let mut next = FIRST_SEGMENT_BASE;
        for segment in &self.segments {
            table.push(next);
            next += segment.len();
        }
        table
    }

    pub fn relocate_address(
        &self,
        table: &[u64],
        address: MemoryAddress,
    ) -> Result<u64, MemoryError> {
        let base = table
            .get(address.segment_index)
            .ok_or(MemoryError::UnallocatedSegment {
                segment: address.segment_index,
                allocated: table.len(),
            })?;
        base.checked_add(address.offset)
            .ok_or(MemoryError::RelocationOverflow(address))
    }

    pub fn relocate_value(&self, table: &[u64], value: &MemoryValue) -> Result<Felt, MemoryError> {
        match value {
            MemoryValue::Felt(felt) => Ok(*felt),
            MemoryValue::Address(address) => {
                Ok(Felt::from(self.relocate_address(table, *address)?))
            }
        }
    }

    /// Flatten into one array indexed by linear address; gaps become zero
    pub fn relocate(&self) -> Result<Vec<Felt>, MemoryError> {
        let table = self.relocation_table();
        let total = FIRST_SEGMENT_BASE + self.segments.iter().map(Segment::len).sum::<u64>();
        let mut linear = vec![Felt::ZERO; total as usize];
        for (index, segment) in self.segments.iter().enumerate() {
            for (offset, value) in segment.iter() {
                linear[(table[index] + offset) as usize] = self.relocate_value(&table, value)?;
            }
        }
        Ok(linear)
    }

    /// Every written cell, relocated, in first-write order
    pub fn relocated_writes(&self) -> Result<Vec<(u64, Felt)>, MemoryError> {
        let table = self.relocation_table();
        self.write_order
            .iter()
            .map(|address| -> Result<(u64, Felt), MemoryError> {
                let value = self.read(*address)?;
                Ok((
                    self.relocate_address(&table, *address)?,
                    self.relocate_value(&table, &value)?,
                ))
            })
            .collect()
    }
}
