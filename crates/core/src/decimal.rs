//! Fixed-point decimal values.
//!
//! A `Decimal` is an `i128` mantissa scaled by a power of ten. Two decimals
//! that denote the same number compare and hash equal regardless of scale
//! (`1.50 == 1.5`).

use crate::error::{Error, Result};
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::str::FromStr;

/// Largest supported scale (digits after the decimal point).
pub const MAX_SCALE: u8 = 28;

/// A fixed-point decimal number: `mantissa * 10^-scale`.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

impl Decimal {
    /// Zero with scale 0.
    pub const ZERO: Decimal = Decimal { mantissa: 0, scale: 0 };

    /// Creates a decimal from a mantissa and scale.
    pub fn new(mantissa: i128, scale: u8) -> Result<Self> {
        if scale > MAX_SCALE {
            return Err(Error::invalid_operation("decimal scale exceeds 28"));
        }
        Ok(Self { mantissa, scale })
    }

    /// Creates an integral decimal.
    #[inline]
    pub fn from_i64(value: i64) -> Self {
        Self {
            mantissa: value as i128,
            scale: 0,
        }
    }

    /// Returns the unscaled mantissa.
    #[inline]
    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Returns the scale.
    #[inline]
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Returns the same number with trailing fractional zeros removed.
    pub fn normalize(&self) -> Self {
        let mut mantissa = self.mantissa;
        let mut scale = self.scale;
        while scale > 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        Self { mantissa, scale }
    }

    /// Lossy conversion to `f64`.
    pub fn to_f64(&self) -> f64 {
        let mut divisor = 1f64;
        for _ in 0..self.scale {
            divisor *= 10.0;
        }
        self.mantissa as f64 / divisor
    }

    /// Rescales `self` to `scale`, if it fits without overflow.
    fn rescaled(&self, scale: u8) -> Option<i128> {
        let mut mantissa = self.mantissa;
        for _ in self.scale..scale {
            mantissa = mantissa.checked_mul(10)?;
        }
        Some(mantissa)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.normalize(), other.normalize());
        a.mantissa == b.mantissa && a.scale == b.scale
    }
}

impl Eq for Decimal {}

impl Hash for Decimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let n = self.normalize();
        n.mantissa.hash(state);
        n.scale.hash(state);
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        match (self.rescaled(scale), other.rescaled(scale)) {
            (Some(a), Some(b)) => a.cmp(&b),
            // Only reachable near i128::MAX; fall back to the float view.
            _ => self
                .to_f64()
                .partial_cmp(&other.to_f64())
                .unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let mut divisor: u128 = 1;
        for _ in 0..self.scale {
            divisor *= 10;
        }
        let abs = self.mantissa.unsigned_abs();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            abs / divisor,
            abs % divisor,
            width = self.scale as usize
        )
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_operation("malformed decimal literal");
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if frac_part.len() > MAX_SCALE as usize {
            return Err(invalid());
        }
        let mut mantissa: i128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c.to_digit(10).ok_or_else(invalid)?;
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(d as i128))
                .ok_or_else(invalid)?;
        }
        if negative {
            mantissa = -mantissa;
        }
        Decimal::new(mantissa, frac_part.len() as u8)
    }
}

impl From<i64> for Decimal {
    fn from(v: i64) -> Self {
        Decimal::from_i64(v)
    }
}
