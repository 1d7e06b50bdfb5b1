//! Schema module for ripple tables.
//!
//! A schema is an explicit, ordered list of `(column id, data type)` pairs
//! assembled with `SchemaBuilder`.

mod column;
mod definition;

pub use column::{ColumnDef, ColumnId};
pub use definition::{Schema, SchemaBuilder};
