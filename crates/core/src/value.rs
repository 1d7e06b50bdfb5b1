//! Value type definitions for ripple tables.
//!
//! This module defines the `Value` enum which represents any value that can be
//! stored in a table cell, and the `FromValue` trait used for typed reads.

use crate::decimal::Decimal;
use crate::error::{Error, Result};
use crate::types::DataType;
use alloc::string::{String, ToString};
use core::cmp::Ordering;
use core::hash::{Hash, Hasher};
use uuid::Uuid;

/// A value that can be stored in a table cell.
///
/// There is no null variant: a cell always holds a value of its column's
/// type, and unset cells hold the type default.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Boolean value
    Boolean(bool),
    /// Unsigned byte
    Byte(u8),
    /// Unicode scalar value
    Char(char),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// Fixed-point decimal
    Decimal(Decimal),
    /// UTF-8 string
    String(String),
    /// Unix timestamp in milliseconds
    Timestamp(i64),
    /// Duration in milliseconds
    Duration(i64),
    /// Globally unique identifier
    Guid(Uuid),
}

impl Value {
    /// Returns the data type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Boolean,
            Value::Byte(_) => DataType::Byte,
            Value::Char(_) => DataType::Char,
            Value::Int16(_) => DataType::Int16,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float32(_) => DataType::Float32,
            Value::Float64(_) => DataType::Float64,
            Value::Decimal(_) => DataType::Decimal,
            Value::String(_) => DataType::String,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Duration(_) => DataType::Duration,
            Value::Guid(_) => DataType::Guid,
        }
    }

    /// Creates the default value for the given data type.
    pub fn default_for_type(dt: DataType) -> Self {
        match dt {
            DataType::Boolean => Value::Boolean(false),
            DataType::Byte => Value::Byte(0),
            DataType::Char => Value::Char('\0'),
            DataType::Int16 => Value::Int16(0),
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::Float32 => Value::Float32(0.0),
            DataType::Float64 => Value::Float64(0.0),
            DataType::Decimal => Value::Decimal(Decimal::ZERO),
            DataType::String => Value::String(String::new()),
            DataType::Timestamp => Value::Timestamp(0),
            DataType::Duration => Value::Duration(0),
            DataType::Guid => Value::Guid(Uuid::nil()),
        }
    }

    /// Returns true if this value equals the default of its type.
    pub fn is_default(&self) -> bool {
        *self == Value::default_for_type(self.data_type())
    }

    /// Returns the boolean value if this is a Boolean, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i32 value if this is an Int32, None otherwise.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value widened to i64 for any integer variant.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value widened to f64 for either float variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a String, None otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Checks that this value has the given type.
    pub fn expect_type(&self, expected: DataType) -> Result<()> {
        let got = self.data_type();
        if got == expected {
            Ok(())
        } else {
            Err(Error::type_mismatch(expected, got))
        }
    }

    fn type_order(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Byte(_) => 1,
            Value::Char(_) => 2,
            Value::Int16(_) => 3,
            Value::Int32(_) => 4,
            Value::Int64(_) => 5,
            Value::Float32(_) => 6,
            Value::Float64(_) => 7,
            Value::Decimal(_) => 8,
            Value::String(_) => 9,
            Value::Timestamp(_) => 10,
            Value::Duration(_) => 11,
            Value::Guid(_) => 12,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            // Bitwise so that Eq and Hash agree (NaN == NaN).
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Guid(a), Value::Guid(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Boolean(b) => b.hash(state),
            Value::Byte(b) => b.hash(state),
            Value::Char(c) => c.hash(state),
            Value::Int16(i) => i.hash(state),
            Value::Int32(i) => i.hash(state),
            Value::Int64(i) => i.hash(state),
            Value::Float32(f) => f.to_bits().hash(state),
            Value::Float64(f) => f.to_bits().hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::String(s) => s.hash(state),
            Value::Timestamp(t) => t.hash(state),
            Value::Duration(d) => d.hash(state),
            Value::Guid(g) => g.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Byte(a), Value::Byte(b)) => a.cmp(b),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            (Value::Int16(a), Value::Int16(b)) => a.cmp(b),
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float32(a), Value::Float32(b)) => a.total_cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.total_cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Duration(a), Value::Duration(b)) => a.cmp(b),
            (Value::Guid(a), Value::Guid(b)) => a.cmp(b),
            // Different types: order by type discriminant
            _ => self.type_order().cmp(&other.type_order()),
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}ms", v),
            Value::Duration(v) => write!(f, "{}ms", v),
            Value::Guid(v) => write!(f, "{}", v),
        }
    }
}

/// Conversion from a stored `Value` into a concrete Rust type.
///
/// Implemented for every native type a column can hold; used by typed reads
/// such as `Table::get::<i64>`.
pub trait FromValue: Sized {
    /// The column type this Rust type reads from.
    const DATA_TYPE: DataType;

    /// Extracts the native value, failing with a type mismatch.
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }

            impl FromValue for $ty {
                const DATA_TYPE: DataType = DataType::$variant;

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(Error::type_mismatch(DataType::$variant, other.data_type())),
                    }
                }
            }
        )*
    };
}

impl_value_conversions! {
    bool => Boolean,
    u8 => Byte,
    char => Char,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
    String => String,
    Uuid => Guid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[test]
    fn test_value_type_check() {
        assert_eq!(Value::Int64(42).data_type(), DataType::Int64);
        assert_eq!(Value::Guid(Uuid::nil()).data_type(), DataType::Guid);
        assert!(Value::Int32(1).expect_type(DataType::Int32).is_ok());
        assert!(Value::Int32(1).expect_type(DataType::Int64).is_err());
    }

    #[test]
    fn test_default_for_every_type() {
        for dt in DataType::ALL {
            let v = Value::default_for_type(dt);
            assert_eq!(v.data_type(), dt);
            assert!(v.is_default());
        }
        assert!(!Value::Int32(3).is_default());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Int32(42).as_i32(), Some(42));
        assert_eq!(Value::Int16(-4).as_i64(), Some(-4));
        assert_eq!(Value::Byte(200).as_i64(), Some(200));
        assert_eq!(Value::Float32(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(Value::String("hello".into()).as_i64(), None);
    }

    #[test]
    fn test_value_equality_and_hash() {
        assert_eq!(Value::Int32(42), Value::Int32(42));
        assert_ne!(Value::Int32(42), Value::Int64(42));
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));

        let a = Value::Decimal(Decimal::new(100, 2).unwrap());
        let b = Value::Decimal(Decimal::new(1, 0).unwrap());
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::Int32(1) < Value::Int32(2));
        assert!(Value::String("a".into()) < Value::String("b".into()));
        assert!(Value::Boolean(true) < Value::Int32(0));
    }

    #[test]
    fn test_from_value() {
        assert_eq!(i64::from_value(Value::Int64(9)).unwrap(), 9);
        assert_eq!(String::from_value("x".into()).unwrap(), "x");
        assert!(i32::from_value(Value::Int64(9)).is_err());
        assert_eq!(<u8 as FromValue>::DATA_TYPE, DataType::Byte);
    }
}
