//! Stark field arithmetic
//!
//! p = 2^251 + 17 * 2^192 + 1
//!
//! Every value the machine manipulates (instruction words, immediates, memory
//! contents) is an element of this field. Elements are always kept reduced
//! to `[0, p)`. The "signed view" reads values above `(p - 1) / 2` as
//! negative numbers, which is how offsets, immediates and jump distances are
//! presented to humans.

use ark_ff::fields::{Fp256, MontBackend, MontConfig};
use ark_ff::{AdditiveGroup, BigInteger, Field, PrimeField};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Decimal representation of the Stark prime
pub const STARK_PRIME_DEC: &str =
    "3618502788666131213697322783095070105623107215331596699973092056135872020481";

/// Hex representation of the Stark prime
pub const STARK_PRIME_HEX: &str =
    "0x800000000000011000000000000000000000000000000000000000000000001";

#[derive(MontConfig)]
#[modulus = "3618502788666131213697322783095070105623107215331596699973092056135872020481"]
#[generator = "3"]
pub struct StarkFieldConfig;

/// Montgomery representation backing [`Felt`]
pub type StarkField = Fp256<MontBackend<StarkFieldConfig, 4>>;

/// Errors raised while parsing or converting field elements
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeltError {
    #[error("Invalid field element literal: {0:?}")]
    InvalidLiteral(String),

    #[error("Value {0} is not below the Stark prime")]
    OutOfRange(String),

    #[error("Division by zero")]
    DivisionByZero,
}

/// Element of the Stark prime field
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Felt(StarkField);

impl Felt {
    pub const ZERO: Self = Felt(StarkField::ZERO);
    pub const ONE: Self = Felt(StarkField::ONE);

    /// The field modulus as an arbitrary precision integer
    pub fn prime() -> BigUint {
        <StarkField as PrimeField>::MODULUS.into()
    }

    /// Reduce an arbitrary little-endian byte string modulo p
    pub fn from_bytes_le_reduced(bytes: &[u8]) -> Self {
        Felt(StarkField::from_le_bytes_mod_order(bytes))
    }

    /// Reduce an arbitrary big-endian byte string modulo p
    pub fn from_bytes_be_reduced(bytes: &[u8]) -> Self {
        Felt(StarkField::from_be_bytes_mod_order(bytes))
    }

    /// Parse a canonical 32-byte little-endian encoding
    pub fn from_bytes_le(bytes: &[u8; 32]) -> Result<Self, FeltError> {
        Self::from_biguint(&BigUint::from_bytes_le(bytes))
    }

    /// Parse a canonical 32-byte big-endian encoding
    pub fn from_bytes_be(bytes: &[u8; 32]) -> Result<Self, FeltError> {
        Self::from_biguint(&BigUint::from_bytes_be(bytes))
    }

    /// Convert an integer in `[0, p)`; larger values are rejected
    pub fn from_biguint(value: &BigUint) -> Result<Self, FeltError> {
        if *value >= Self::prime() {
            return Err(FeltError::OutOfRange(value.to_string()));
        }
        Ok(Self::from_bytes_le_reduced(&value.to_bytes_le()))
    }

    /// Convert a signed integer, reducing negative values modulo p
    pub fn from_bigint(value: &BigInt) -> Result<Self, FeltError> {
        let magnitude = Self::from_biguint(value.magnitude())?;
        Ok(match value.sign() {
            Sign::Minus => -magnitude,
            _ => magnitude,
        })
    }

    pub fn to_bytes_le(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0.into_bigint().to_bytes_le());
        out
    }

    pub fn to_bytes_be(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0.into_bigint().to_bytes_be());
        out
    }

    pub fn to_biguint(&self) -> BigUint {
        self.0.into_bigint().into()
    }

    /// Integer value in the signed view: `(p - 1) / 2 < x` maps to `x - p`
    pub fn to_bigint(&self) -> BigInt {
        if self.is_negative() {
            -BigInt::from((-*self).to_biguint())
        } else {
            BigInt::from(self.to_biguint())
        }
    }

    /// Canonical value if it fits in 64 bits
    pub fn to_u64(&self) -> Option<u64> {
        let limbs = self.0.into_bigint().0;
        if limbs[1..].iter().all(|limb| *limb == 0) {
            Some(limbs[0])
        } else {
            None
        }
    }

    /// Canonical value if it fits in 128 bits
    pub fn to_u128(&self) -> Option<u128> {
        let limbs = self.0.into_bigint().0;
        if limbs[2..].iter().all(|limb| *limb == 0) {
            Some(((limbs[1] as u128) << 64) | limbs[0] as u128)
        } else {
            None
        }
    }

    /// Signed view as an `i64`, if it fits
    pub fn to_i64(&self) -> Option<i64> {
        if self.is_negative() {
            let magnitude = (-*self).to_u64()?;
            if magnitude <= i64::MAX as u64 + 1 {
                Some((magnitude as i64).wrapping_neg())
            } else {
                None
            }
        } else {
            self.to_u64().and_then(|v| i64::try_from(v).ok())
        }
    }

    /// Signed view as an `i128`, if it fits
    pub fn to_i128(&self) -> Option<i128> {
        if self.is_negative() {
            let magnitude = (-*self).to_u128()?;
            if magnitude <= i128::MAX as u128 + 1 {
                Some((magnitude as i128).wrapping_neg())
            } else {
                None
            }
        } else {
            self.to_u128().and_then(|v| i128::try_from(v).ok())
        }
    }

    /// True when the signed view of this element is negative
    pub fn is_negative(&self) -> bool {
        self.0.into_bigint() > <StarkField as PrimeField>::MODULUS_MINUS_ONE_DIV_TWO
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == StarkField::ZERO
    }

    /// Number of significant bits of the canonical representative
    pub fn bits(&self) -> u32 {
        self.0.into_bigint().num_bits()
    }

    pub fn inverse(&self) -> Option<Self> {
        self.0.inverse().map(Felt)
    }

    /// Field division; fails on a zero divisor
    pub fn field_div(&self, rhs: &Felt) -> Result<Self, FeltError> {
        let inv = rhs.inverse().ok_or(FeltError::DivisionByZero)?;
        Ok(*self * inv)
    }

    pub fn pow(&self, exponent: u64) -> Self {
        Felt(self.0.pow([exponent]))
    }

    /// Exponentiation by a full field element interpreted as an integer
    pub fn pow_felt(&self, exponent: &Felt) -> Self {
        Felt(self.0.pow(exponent.0.into_bigint()))
    }

    /// Square root, choosing the smaller of the two roots
    pub fn sqrt(&self) -> Option<Self> {
        let root = Felt(self.0.sqrt()?);
        let other = -root;
        Some(if root.to_biguint() <= other.to_biguint() {
            root
        } else {
            other
        })
    }

    /// Legendre symbol: 0 for zero, 1 for a quadratic residue, -1 otherwise
    pub fn legendre(&self) -> i8 {
        let symbol = self.0.legendre();
        if symbol.is_zero() {
            0
        } else if symbol.is_qr() {
            1
        } else {
            -1
        }
    }

    /// Integer division of canonical representatives
    pub fn div_rem(&self, rhs: &Felt) -> Result<(Felt, Felt), FeltError> {
        if rhs.is_zero() {
            return Err(FeltError::DivisionByZero);
        }
        let lhs = self.to_biguint();
        let rhs = rhs.to_biguint();
        let quotient = Self::from_bytes_le_reduced(&(&lhs / &rhs).to_bytes_le());
        let remainder = Self::from_bytes_le_reduced(&(&lhs % &rhs).to_bytes_le());
        Ok((quotient, remainder))
    }

    fn parse_unsigned(literal: &str, original: &str) -> Result<BigUint, FeltError> {
        let invalid = || FeltError::InvalidLiteral(original.to_string());
        let (digits, radix) = match literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
        {
            Some(hex) => (hex, 16),
            None => (literal, 10),
        };
        if digits.is_empty() {
            return Err(invalid());
        }
        BigUint::parse_bytes(digits.as_bytes(), radix).ok_or_else(invalid)
    }
}

impl FromStr for Felt {
    type Err = FeltError;

    /// Accepts decimal, `0x` hex and a leading `-` for negatives
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.strip_prefix('-') {
            Some(rest) => Ok(-Felt::from_biguint(&Felt::parse_unsigned(rest, s)?)?),
            None => Felt::from_biguint(&Felt::parse_unsigned(trimmed, s)?),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Felt {
                #[inline]
                fn from(value: $t) -> Self {
                    Felt(StarkField::from(value))
                }
            }
        )*
    };
}

impl_from_primitive!(bool, u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

impl From<usize> for Felt {
    fn from(value: usize) -> Self {
        Felt::from(value as u64)
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

impl Add for Felt {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Felt(self.0 + rhs.0)
    }
}

impl AddAssign for Felt {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Felt {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Felt(self.0 - rhs.0)
    }
}

impl SubAssign for Felt {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul for Felt {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Felt(self.0 * rhs.0)
    }
}

impl MulAssign for Felt {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        self.0 *= rhs.0;
    }
}

impl Neg for Felt {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Felt(-self.0)
    }
}

impl Zero for Felt {
    fn zero() -> Self {
        Felt::ZERO
    }

    fn is_zero(&self) -> bool {
        Felt::is_zero(self)
    }
}

impl One for Felt {
    fn one() -> Self {
        Felt::ONE
    }
}

impl PartialOrd for Felt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by canonical representative
impl Ord for Felt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.into_bigint().cmp(&other.0.into_bigint())
    }
}

// ============================================================================
// Formatting
// ============================================================================

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Felt({})", self.to_bigint())
    }
}

impl fmt::LowerHex for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.to_biguint(), f)
    }
}

// ============================================================================
// Serde
// ============================================================================

impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", self))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeltRepr {
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for Felt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match FeltRepr::deserialize(deserializer)? {
            FeltRepr::Unsigned(v) => Ok(Felt::from(v)),
            FeltRepr::Signed(v) => Ok(Felt::from(v)),
            FeltRepr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
