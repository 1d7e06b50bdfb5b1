//! Ripple Core - Core value types and schema definitions for ripple reactive tables.
//!
//! This crate provides the foundational types shared by every ripple crate:
//!
//! - `DataType`: Supported column types (integers, floats, decimal, string, timestamp, duration, guid, ...)
//! - `Value`: Runtime values stored in table cells
//! - `Decimal`: Fixed-point decimal numbers
//! - `schema`: Explicit schema definitions (`ColumnDef`, `Schema`, `SchemaBuilder`)
//! - `Error`: Error types for table operations
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{DataType, Value};
//! use ripple_core::schema::SchemaBuilder;
//!
//! let schema = SchemaBuilder::new("orders")
//!     .unwrap()
//!     .add_column("orders.id", DataType::Int64)
//!     .unwrap()
//!     .add_column("orders.customer", DataType::String)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let id = schema.column("orders.id").unwrap();
//! assert_eq!(id.get_default_value(), Value::Int64(0));
//! ```

#![no_std]

extern crate alloc;

mod decimal;
mod error;
pub mod schema;
mod types;
mod value;

pub use decimal::{Decimal, MAX_SCALE};
pub use error::{Error, Result};
pub use schema::{ColumnDef, ColumnId};
pub use types::DataType;
pub use uuid::Uuid;
pub use value::{FromValue, Value};

/// Index of a row within a table.
///
/// Row indices are assigned by the owning table and stay stable for the
/// row's lifetime.
pub type RowIndex = usize;
