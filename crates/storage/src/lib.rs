//! Ripple Storage - Columnar reactive tables.
//!
//! This crate provides the table primitive every other ripple component
//! observes:
//!
//! - `Column`: Row-indexed, type-checked value store with a change notification point
//! - `Table`: Owns the columns and the row-id space, emits one ordered `TableUpdate` stream
//! - `ReactiveTable`: Read and subscribe interface shared by base and derived tables
//! - `ComputedColumns`: Lazily evaluated derived columns with dependency-driven re-emission
//! - `TableReplica`: Applies remote row operations through a `remote -> local` row mapping
//!
//! # Example
//!
//! ```rust
//! use ripple_core::schema::SchemaBuilder;
//! use ripple_core::{DataType, Value};
//! use ripple_storage::{ReactiveTable, ReactiveTableExt, Table};
//!
//! let schema = SchemaBuilder::new("orders")
//!     .unwrap()
//!     .add_column("qty", DataType::Int32)
//!     .unwrap()
//!     .add_column("price", DataType::Float64)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! let orders = Table::new(schema);
//! orders
//!     .add_computed_column("notional", DataType::Float64, &["qty", "price"], |v| {
//!         let qty = v[0].as_i64().unwrap_or(0) as f64;
//!         let price = v[1].as_f64().unwrap_or(0.0);
//!         Value::Float64(qty * price)
//!     })
//!     .unwrap();
//!
//! let row = orders.add_row();
//! orders.set_value("qty", row, 3).unwrap();
//! orders.set_value("price", row, 2.5).unwrap();
//!
//! assert_eq!(orders.row_count(), 1);
//! assert_eq!(orders.get::<f64>("notional", row).unwrap(), 7.5);
//! ```

#![no_std]

extern crate alloc;

pub mod column;
pub mod computed;
pub mod replica;
pub mod source;
pub mod table;

pub use column::Column;
pub use computed::{ComputeFn, ComputedColumn, ComputedColumns};
pub use replica::{RemoteRowId, TableReplica};
pub use source::{ReactiveTable, ReactiveTableExt};
pub use table::{Table, WeakTable};
