//! Numeric scalar payload.
//!
//! Numerics are arbitrary-precision decimals. The codec treats them as opaque
//! comparable, hashable values and stores them in one of two ways:
//!
//! - **small integer**: an integral value with no fractional digits (a
//!   positive exponent such as `1e2` counts) and a magnitude of at most `u32::MAX >> 1` is packed as a single varbyte word
//!   `(magnitude << 1) | negative`.
//! - **numeric**: anything else is stored as its decimal text.

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Largest magnitude the small-integer form can hold.
const SMALL_MAGNITUDE_MAX: u32 = u32::MAX >> 1;

/// An arbitrary-precision decimal number.
///
/// Equality and ordering are by numeric value, so `1.0 == 1`.
#[derive(Clone)]
pub struct Numeric(BigDecimal);

impl Numeric {
    pub fn new(value: BigDecimal) -> Self {
        Numeric(value)
    }

    pub fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }

    pub fn into_decimal(self) -> BigDecimal {
        self.0
    }

    /// The packed small-integer word for this value, if it has one.
    pub fn small_integer(&self) -> Option<u32> {
        let (digits, scale) = self.0.as_bigint_and_exponent();
        if scale > 0 {
            return None;
        }
        if digits.sign() == Sign::NoSign {
            return Some(0);
        }
        // Ten or more trailing zeros is already past the small range.
        if scale < -9 {
            return None;
        }
        let (digits, _) = self.0.with_scale(0).into_bigint_and_exponent();
        let magnitude = digits.magnitude().to_u32()?;
        if magnitude > SMALL_MAGNITUDE_MAX {
            return None;
        }
        let negative = digits.sign() == Sign::Minus;
        Some((magnitude << 1) | negative as u32)
    }

    /// Rebuild a value from its packed small-integer word.
    pub fn from_small_integer(word: u32) -> Self {
        let magnitude = i64::from(word >> 1);
        let value = if word & 1 == 1 { -magnitude } else { magnitude };
        Numeric(BigDecimal::from(value))
    }

    /// The full payload: the decimal text of the value.
    pub fn payload(&self) -> String {
        self.0.to_string()
    }

    pub fn from_payload(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::malformed("numeric payload is not valid UTF-8"))?;
        text.parse()
    }

    /// Hash of the numeric value, independent of trailing zeros.
    pub fn hash_value(&self) -> u32 {
        let canonical = self.0.normalized().to_string();
        xxhash_rust::xxh32::xxh32(canonical.as_bytes(), 0)
    }
}

impl FromStr for Numeric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BigDecimal::from_str(s)
            .map(Numeric)
            .map_err(|e| Error::malformed(format!("invalid numeric {:?}: {}", s, e)))
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Numeric {}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<BigDecimal> for Numeric {
    fn from(n: BigDecimal) -> Self {
        Numeric(n)
    }
}

impl From<BigInt> for Numeric {
    fn from(n: BigInt) -> Self {
        Numeric(BigDecimal::from(n))
    }
}

impl From<i64> for Numeric {
    fn from(n: i64) -> Self {
        Numeric(BigDecimal::from(n))
    }
}

impl From<u64> for Numeric {
    fn from(n: u64) -> Self {
        Numeric(BigDecimal::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> Numeric {
        s.parse().unwrap()
    }

    #[test]
    fn small_integer_path() {
        assert_eq!(num("0").small_integer(), Some(0));
        assert_eq!(num("1").small_integer(), Some(2));
        assert_eq!(num("-1").small_integer(), Some(3));
        assert_eq!(num("2147483647").small_integer(), Some(u32::MAX - 1));
        assert_eq!(num("-2147483647").small_integer(), Some(u32::MAX));
    }

    #[test]
    fn exponent_integers_take_the_small_path() {
        assert_eq!(num("1e2").small_integer(), Some(200));
        assert_eq!(num("-5E+3").small_integer(), Some((5000 << 1) | 1));
        assert_eq!(num("0e7").small_integer(), Some(0));
        assert_eq!(num("2e9").small_integer(), Some(4_000_000_000));
        assert_eq!(num("3e9").small_integer(), None);
        assert_eq!(num("1e10").small_integer(), None);
        assert_eq!(num("1e-2").small_integer(), None);
    }

    #[test]
    fn large_or_fractional_use_full_payload() {
        assert_eq!(num("2147483648").small_integer(), None);
        assert_eq!(num("-2147483648").small_integer(), None);
        assert_eq!(num("1.5").small_integer(), None);
        assert_eq!(num("1.0").small_integer(), None);
        assert_eq!(num("123456789012345678901234567890").small_integer(), None);
    }

    #[test]
    fn small_integer_roundtrip() {
        for s in ["0", "7", "-7", "2147483647", "-2147483647"] {
            let n = num(s);
            let word = n.small_integer().unwrap();
            assert_eq!(Numeric::from_small_integer(word), n, "{}", s);
        }
    }

    #[test]
    fn payload_keeps_digits() {
        let n = num("3.140");
        assert_eq!(n.payload(), "3.140");
        assert_eq!(Numeric::from_payload(n.payload().as_bytes()).unwrap(), n);
    }

    #[test]
    fn payload_rejects_garbage() {
        assert!(Numeric::from_payload(b"abc").is_err());
        assert!(Numeric::from_payload(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn value_equality_and_hash_ignore_trailing_zeros() {
        assert_eq!(num("1.0"), num("1"));
        assert_eq!(num("1.0").hash_value(), num("1").hash_value());
        assert_ne!(num("1").hash_value(), num("2").hash_value());
    }

    #[test]
    fn ordering_is_numeric() {
        assert!(num("-10") < num("2"));
        assert!(num("2") < num("10"));
        assert!(num("0.5") < num("1"));
    }
}
