//! Ripple Binary - Delta protocol for table replication.
//!
//! Each table change becomes one self-delimited record. Records are groups of
//! tagged fields; see [`wire`] for the tag layout.
//!
//! # Record Format
//!
//! ```text
//! +-----------------------------+
//! | op tag (start group)        |  ADD_FIELD=1 / UPDATE_FIELD=2 / DELETE_FIELD=3
//! +-----------------------------+
//! | ROW_ID_FIELD (8191) varint  |  sender's row id
//! +-----------------------------+
//! | field tag | value           |  Update only, one per mapped column
//! | ...                         |
//! +-----------------------------+
//! | op tag (end group)          |
//! +-----------------------------+
//! ```
//!
//! # Value Encoding
//!
//! ```text
//! Boolean, Byte, Char          varint
//! Int16, Int32, Int64          zigzag varint
//! Timestamp, Duration          zigzag varint (milliseconds)
//! Float32                      fixed32, IEEE 754 bits
//! Float64                      fixed64, IEEE 754 bits
//! String                       length-delimited UTF-8
//! Decimal                      length-delimited, 16 byte LE mantissa + scale
//! Guid                         length-delimited, 16 bytes
//! ```
//!
//! Column ids map to field numbers through a [`FieldMap`] that both ends
//! agree on out of band. The receiver interprets each field by its local
//! column type, so integer widths may differ between ends as long as values
//! fit.
//!
//! # Example
//!
//! ```rust
//! use ripple_binary::{decode_all, DeltaApplier, DeltaEncoder, FieldMap};
//! use ripple_core::schema::SchemaBuilder;
//! use ripple_core::DataType;
//! use ripple_storage::{ReactiveTableExt, Table};
//!
//! let schema = || {
//!     SchemaBuilder::new("quotes")
//!         .unwrap()
//!         .add_column("symbol", DataType::String)
//!         .unwrap()
//!         .add_column("bid", DataType::Float64)
//!         .unwrap()
//!         .build()
//!         .unwrap()
//! };
//! let source = Table::new(schema());
//! let row = source.add_row();
//! source.set_value("symbol", row, "ABC").unwrap();
//! source.set_value("bid", row, 101.5).unwrap();
//!
//! let fields = FieldMap::sequential(["symbol", "bid"]).unwrap();
//! let mut encoder = DeltaEncoder::new(fields.clone());
//! encoder.encode_replay(&source).unwrap();
//!
//! let mut applier = DeltaApplier::new(Table::new(schema()), fields);
//! for record in decode_all(&encoder.take()).unwrap() {
//!     applier.apply(&record).unwrap();
//! }
//! let local = applier.replica().local_row(row as u64).unwrap();
//! assert_eq!(applier.table().get::<f64>("bid", local).unwrap(), 101.5);
//! ```

#![no_std]

extern crate alloc;

mod applier;
mod decoder;
mod encoder;
mod error;
mod field_map;
pub mod wire;

pub use applier::{Applied, DeltaApplier};
pub use decoder::{decode_all, DeltaDecoder, DeltaOp, DeltaRecord};
pub use encoder::DeltaEncoder;
pub use error::{DecodeError, FieldMapError};
pub use field_map::FieldMap;
pub use wire::WireValue;
