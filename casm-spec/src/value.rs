//! # Memory addresses and memory values
//!
//! Memory is split into segments whose final position in the linear address
//! space is only known after the run (see relocation in the runtime). Until
//! then an address is a `(segment_index, offset)` pair, and a memory cell
//! holds either a field element or such an address.

#[cfg(test)]
use proptest::prelude::*;

use crate::error::MathError;
use crate::field::Felt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relocatable address: a segment index plus an offset inside it
#[derive(Eq, Ord, Hash, PartialEq, PartialOrd, Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct MemoryAddress {
    pub segment_index: usize,
    pub offset: u64,
}

impl MemoryAddress {
    /// Sentinel for registers that have not been initialised yet
    pub const UNKNOWN: Self = MemoryAddress {
        segment_index: usize::MAX,
        offset: u64::MAX,
    };

    #[inline]
    pub const fn new(segment_index: usize, offset: u64) -> Self {
        Self {
            segment_index,
            offset,
        }
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    pub fn add_offset(&self, delta: u64) -> Result<Self, MathError> {
        let offset = self
            .offset
            .checked_add(delta)
            .ok_or_else(|| MathError::OffsetOverflow(Box::new((*self, delta.to_string()))))?;
        Ok(Self::new(self.segment_index, offset))
    }

    pub fn sub_offset(&self, delta: u64) -> Result<Self, MathError> {
        let offset = self
            .offset
            .checked_sub(delta)
            .ok_or_else(|| MathError::OffsetOverflow(Box::new((*self, format!("-{delta}")))))?;
        Ok(Self::new(self.segment_index, offset))
    }

    /// Move by a signed distance, as used for `reg + off` operand addressing
    pub fn add_signed(&self, delta: i64) -> Result<Self, MathError> {
        let offset = self
            .offset
            .checked_add_signed(delta)
            .ok_or_else(|| MathError::OffsetOverflow(Box::new((*self, delta.to_string()))))?;
        Ok(Self::new(self.segment_index, offset))
    }

    /// Move by a field element read in its signed view
    pub fn add_felt(&self, delta: &Felt) -> Result<Self, MathError> {
        match delta.to_i64() {
            Some(delta) => self.add_signed(delta),
            None => Err(MathError::OffsetOverflow(Box::new((
                *self,
                delta.to_bigint().to_string(),
            )))),
        }
    }

    /// Distance between two addresses of the same segment
    pub fn sub_address(&self, other: &MemoryAddress) -> Result<Felt, MathError> {
        if self.segment_index != other.segment_index {
            return Err(MathError::CrossSegmentSubtraction(Box::new((*self, *other))));
        }
        Ok(Felt::from(self.offset) - Felt::from(other.offset))
    }
}

impl fmt::Display for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "?:?")
        } else {
            write!(f, "{}:{}", self.segment_index, self.offset)
        }
    }
}

#[cfg(test)]
impl Arbitrary for MemoryAddress {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (0..64usize, 0..(1u64 << 32))
            .prop_map(|(segment_index, offset)| Self::new(segment_index, offset))
            .boxed()
    }
}

/// Content of a memory cell
#[derive(Eq, Ord, Hash, PartialEq, PartialOrd, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum MemoryValue {
    Felt(Felt),
    Address(MemoryAddress),
}

impl MemoryValue {
    pub fn as_felt(&self) -> Result<Felt, MathError> {
        match self {
            MemoryValue::Felt(felt) => Ok(*felt),
            MemoryValue::Address(address) => Err(MathError::ExpectedFelt(*address)),
        }
    }

    pub fn as_address(&self) -> Result<MemoryAddress, MathError> {
        match self {
            MemoryValue::Address(address) => Ok(*address),
            MemoryValue::Felt(felt) => Err(MathError::ExpectedAddress(*felt)),
        }
    }

    pub fn is_felt(&self) -> bool {
        matches!(self, MemoryValue::Felt(_))
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, MemoryValue::Felt(felt) if felt.is_zero())
    }

    pub fn add(&self, rhs: &MemoryValue) -> Result<MemoryValue, MathError> {
        match (self, rhs) {
            (MemoryValue::Felt(a), MemoryValue::Felt(b)) => Ok(MemoryValue::Felt(*a + *b)),
            (MemoryValue::Address(a), MemoryValue::Felt(b))
            | (MemoryValue::Felt(b), MemoryValue::Address(a)) => {
                Ok(MemoryValue::Address(a.add_felt(b)?))
            }
            (MemoryValue::Address(a), MemoryValue::Address(b)) => {
                Err(MathError::AddressAddition(Box::new((*a, *b))))
            }
        }
    }

    pub fn sub(&self, rhs: &MemoryValue) -> Result<MemoryValue, MathError> {
        match (self, rhs) {
            (MemoryValue::Felt(a), MemoryValue::Felt(b)) => Ok(MemoryValue::Felt(*a - *b)),
            (MemoryValue::Address(a), MemoryValue::Felt(b)) => {
                Ok(MemoryValue::Address(a.add_felt(&-*b)?))
            }
            (MemoryValue::Address(a), MemoryValue::Address(b)) => {
                Ok(MemoryValue::Felt(a.sub_address(b)?))
            }
            (MemoryValue::Felt(a), MemoryValue::Address(b)) => {
                Err(MathError::FeltMinusAddress(Box::new((*a, *b))))
            }
        }
    }

    pub fn mul(&self, rhs: &MemoryValue) -> Result<MemoryValue, MathError> {
        match (self, rhs) {
            (MemoryValue::Felt(a), MemoryValue::Felt(b)) => Ok(MemoryValue::Felt(*a * *b)),
            _ => Err(MathError::InvalidMul(Box::new((*self, *rhs)))),
        }
    }
}

impl From<Felt> for MemoryValue {
    fn from(felt: Felt) -> Self {
        MemoryValue::Felt(felt)
    }
}

impl From<MemoryAddress> for MemoryValue {
    fn from(address: MemoryAddress) -> Self {
        MemoryValue::Address(address)
    }
}

impl From<u64> for MemoryValue {
    fn from(value: u64) -> Self {
        MemoryValue::Felt(Felt::from(value))
    }
}

impl From<i64> for MemoryValue {
    fn from(value: i64) -> Self {
        MemoryValue::Felt(Felt::from(value))
    }
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryValue::Felt(felt) => write!(f, "{}", felt),
            MemoryValue::Address(address) => write!(f, "{}", address),
        }
    }
}

#[cfg(test)]
impl Arbitrary for MemoryValue {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            any::<u64>().prop_map(|n| Self::Felt(Felt::from(n))),
            any::<MemoryAddress>().prop_map(Self::Address),
        ]
        .boxed()
    }
}
