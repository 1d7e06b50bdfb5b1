//! Ripple Replicate - Change propagation across threads and processes.
//!
//! A [`ReplicationPipeline`] observes a table on its own thread, snapshots
//! each change with its values and hands [`ChangeBatch`]es to a
//! [`Marshaller`]:
//!
//! - `Immediate`: one batch per observed update, dispatched inline
//! - `Batched`: changes queue under a lock and a flush thread dispatches them
//!   every interval; `flush` dispatches on demand
//!
//! Columns in last-value mode collapse repeated queued updates of one cell.
//! The queue is unbounded; keeping up with the producer is the caller's
//! concern.
//!
//! For another process, a [`DeltaPublisher`] used as the marshaller encodes
//! batches with `ripple-binary` and a [`TcpDeltaServer`] serves them. A
//! [`TcpDeltaClient`] decodes the stream on a reader thread.
//!
//! # Example
//!
//! ```rust
//! use ripple_core::schema::SchemaBuilder;
//! use ripple_core::DataType;
//! use ripple_replicate::{channel, PipelineConfig, ReplicationPipeline};
//! use ripple_storage::{ReactiveTableExt, Table, TableReplica};
//!
//! let schema = || {
//!     SchemaBuilder::new("quotes")
//!         .unwrap()
//!         .add_column("px", DataType::Float64)
//!         .unwrap()
//!         .build()
//!         .unwrap()
//! };
//! let source = Table::new(schema());
//! let (marshaller, rx) = channel();
//! let _pipeline =
//!     ReplicationPipeline::attach(source.clone(), &PipelineConfig::immediate(), marshaller)
//!         .unwrap();
//!
//! let row = source.add_row();
//! source.set_value("px", row, 10.25).unwrap();
//!
//! let mut replica = TableReplica::new(Table::new(schema()));
//! for batch in rx.try_iter() {
//!     batch.apply(&mut replica).unwrap();
//! }
//! let local = replica.local_row(row as u64).unwrap();
//! assert_eq!(replica.table().get::<f64>("px", local).unwrap(), 10.25);
//! ```

mod change;
mod config;
mod error;
mod marshal;
mod pipeline;
mod queue;
mod tcp;

pub use change::{Change, ChangeBatch};
pub use config::{BatchMode, ConnectionConfig, PipelineConfig};
pub use error::{ReplicationError, Result};
pub use marshal::{channel, ChannelMarshaller, Marshaller};
pub use pipeline::ReplicationPipeline;
pub use queue::ChangeQueue;
pub use tcp::{DeltaPublisher, StreamEvent, TcpDeltaClient, TcpDeltaServer};
