//! Incrementally maintained equi-joins.

mod engine;
mod join_type;
mod row_ids;

pub use engine::{JoinChange, JoinEngine};
pub use join_type::{JoinSide, JoinType};
pub use row_ids::RowIdPool;
