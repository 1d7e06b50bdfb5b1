//! Codec errors.

use alloc::string::String;

/// Framing errors of a delta stream.
///
/// A framing error means record boundaries can no longer be found, so the
/// stream cannot continue. Problems confined to a single field are not
/// errors; the field is skipped and counted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The input ended inside a record.
    #[error("delta stream truncated")]
    Truncated,

    /// A varint ran past 10 bytes or past 64 bits.
    #[error("varint overflows 64 bits")]
    VarintOverflow,

    /// An end-group marker without a matching start.
    #[error("unexpected end of group {field}")]
    UnexpectedEndGroup { field: u32 },

    /// A wire type the format does not define.
    #[error("invalid wire type {0}")]
    InvalidWireType(u8),

    /// A tag with field number 0 or above the field number range.
    #[error("invalid field number {0}")]
    InvalidField(u64),
}

/// Errors building a column-id <-> field-id table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldMapError {
    /// Field 0, the reserved row id field, or a number outside the tag range.
    #[error("field id {0} is reserved or out of range")]
    ReservedField(u32),

    #[error("field id {0} is mapped twice")]
    DuplicateField(u32),

    #[error("column {0} is mapped twice")]
    DuplicateColumn(String),
}
