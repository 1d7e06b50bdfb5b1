//! Ripple Incremental - Incrementally maintained joins.
//!
//! This crate keeps the result of a two-table equi-join up to date as either
//! source is mutated, without recomputation. Only the pairings touched by a
//! write are revisited.
//!
//! # Core Concepts
//!
//! - `JoinType`: Inner, LeftOuter, RightOuter or FullOuter
//! - `JoinEngine`: Key groups, pairings and joined row ids; emits `JoinChange`s
//! - `JoinedTable`: Read-only `ReactiveTable` facade over the engine and both sources
//! - `JoinBuilder`: Validates key columns and configures the gap values of outer joins
//!
//! Joined row ids are recycled: ids freed by deleted joined rows are reused,
//! lowest first, before new ids are handed out.
//!
//! # Example
//!
//! ```rust
//! use ripple_core::schema::SchemaBuilder;
//! use ripple_core::DataType;
//! use ripple_incremental::{join, JoinType};
//! use ripple_storage::{ReactiveTable, ReactiveTableExt, Table};
//!
//! let trades = Table::new(
//!     SchemaBuilder::new("trades").unwrap()
//!         .add_column("trades.symbol", DataType::String).unwrap()
//!         .add_column("trades.qty", DataType::Int32).unwrap()
//!         .build().unwrap(),
//! );
//! let quotes = Table::new(
//!     SchemaBuilder::new("quotes").unwrap()
//!         .add_column("quotes.symbol", DataType::String).unwrap()
//!         .add_column("quotes.bid", DataType::Float64).unwrap()
//!         .build().unwrap(),
//! );
//! let joined = join(trades.clone(), "trades.symbol", quotes.clone(), "quotes.symbol", JoinType::LeftOuter)
//!     .unwrap();
//!
//! let t = trades.add_row();
//! trades.set_value("trades.symbol", t, "ABC").unwrap();
//! assert_eq!(joined.row_count(), 1);
//! assert_eq!(joined.get::<f64>("quotes.bid", 0).unwrap(), 0.0);
//!
//! let q = quotes.add_row();
//! quotes.set_value("quotes.bid", q, 9.5).unwrap();
//! quotes.set_value("quotes.symbol", q, "ABC").unwrap();
//! assert_eq!(joined.row_count(), 1);
//! assert_eq!(joined.get::<f64>("quotes.bid", 0).unwrap(), 9.5);
//! ```

#![no_std]

extern crate alloc;

pub mod join;
pub mod joined_table;

pub use join::{JoinChange, JoinEngine, JoinSide, JoinType, RowIdPool};
pub use joined_table::{join, GapValueFn, JoinBuilder, JoinedTable};
