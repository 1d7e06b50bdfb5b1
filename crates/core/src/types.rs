//! Data type definitions for ripple tables.
//!
//! This module defines the closed set of column value types. Every codec and
//! conversion matches on it exhaustively.

/// Supported column data types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// Unsigned 8-bit integer
    Byte,
    /// Unicode scalar value
    Char,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit floating point number
    Float32,
    /// 64-bit floating point number
    Float64,
    /// Fixed-point decimal
    Decimal,
    /// UTF-8 string
    String,
    /// Point in time stored as Unix timestamp (milliseconds)
    Timestamp,
    /// Signed span of time (milliseconds)
    Duration,
    /// 128-bit globally unique identifier
    Guid,
}

impl DataType {
    /// All data types, in declaration order.
    pub const ALL: [DataType; 13] = [
        DataType::Boolean,
        DataType::Byte,
        DataType::Char,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Float32,
        DataType::Float64,
        DataType::Decimal,
        DataType::String,
        DataType::Timestamp,
        DataType::Duration,
        DataType::Guid,
    ];

    /// Returns whether values of this type can be used as a join key.
    ///
    /// Floating point columns are excluded: NaN and signed zero make
    /// equality unreliable as a grouping criterion.
    pub fn is_hashable(&self) -> bool {
        !matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Returns whether this type is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Byte | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_equality() {
        assert_eq!(DataType::Int32, DataType::Int32);
        assert_ne!(DataType::Int32, DataType::Int64);
    }

    #[test]
    fn test_hashable() {
        assert!(DataType::Int64.is_hashable());
        assert!(DataType::String.is_hashable());
        assert!(DataType::Guid.is_hashable());
        assert!(DataType::Decimal.is_hashable());
        assert!(!DataType::Float32.is_hashable());
        assert!(!DataType::Float64.is_hashable());
    }

    #[test]
    fn test_all_is_complete() {
        assert_eq!(DataType::ALL.len(), 13);
        assert!(DataType::ALL.iter().filter(|t| t.is_integer()).count() == 4);
    }
}
