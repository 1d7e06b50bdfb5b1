//! Error types for ripple tables.

use crate::types::DataType;
use alloc::string::String;

/// Result type alias for ripple operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for table and schema operations.
///
/// Schema and row errors are programmer errors: the operation that raises
/// them has no effect, and callers are not expected to retry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Type mismatch error.
    #[error("Type mismatch: expected {expected:?}, got {got:?}")]
    TypeMismatch { expected: DataType, got: DataType },
    /// Column not found.
    #[error("Column {column} not found in table {table}")]
    ColumnNotFound { table: String, column: String },
    /// Column id defined twice.
    #[error("Column {column} already exists in table {table}")]
    DuplicateColumn { table: String, column: String },
    /// Row id not live in the table.
    #[error("Row {row} not found in table {table}")]
    RowNotFound { table: String, row: usize },
    /// Invalid schema definition.
    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },
    /// Invalid operation.
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl Error {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: DataType, got: DataType) -> Self {
        Error::TypeMismatch { expected, got }
    }

    /// Creates a column not found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a duplicate column error.
    pub fn duplicate_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::DuplicateColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a row not found error.
    pub fn row_not_found(table: impl Into<String>, row: usize) -> Self {
        Error::RowNotFound {
            table: table.into(),
            row,
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::type_mismatch(DataType::Int32, DataType::String);
        assert!(err.to_string().contains("Type mismatch"));

        let err = Error::column_not_found("users", "name");
        assert!(err.to_string().contains("name"));
        assert!(err.to_string().contains("users"));

        let err = Error::row_not_found("users", 7);
        assert_eq!(err.to_string(), "Row 7 not found in table users");
    }

    #[test]
    fn test_error_constructors() {
        let err = Error::duplicate_column("t", "id");
        match err {
            Error::DuplicateColumn { column, .. } => assert_eq!(column, "id"),
            _ => panic!("Wrong error type"),
        }
    }
}
