//! Value snapshots of table changes.
//!
//! A `TableUpdate` only names the touched columns; the values live in the
//! source table, which cannot leave its thread. `Change` carries the value
//! read at observation time so it can cross threads.

use ripple_binary::DeltaEncoder;
use ripple_core::{ColumnId, Value};
use ripple_storage::{RemoteRowId, TableReplica};

/// One row-level change with its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Add {
        row: RemoteRowId,
    },
    Update {
        row: RemoteRowId,
        column: ColumnId,
        value: Value,
    },
    Delete {
        row: RemoteRowId,
    },
}

impl Change {
    #[inline]
    pub fn row(&self) -> RemoteRowId {
        match self {
            Change::Add { row } | Change::Update { row, .. } | Change::Delete { row } => *row,
        }
    }
}

/// Changes dispatched together, in observation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    changes: Vec<Change>,
}

impl ChangeBatch {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    #[inline]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Applies the batch to a replica of the source table.
    ///
    /// Returns the number of changes that found their row. Changes for rows
    /// the replica never saw are dropped.
    pub fn apply(&self, replica: &mut TableReplica) -> ripple_core::Result<usize> {
        let mut applied = 0;
        for change in &self.changes {
            let hit = match change {
                Change::Add { row } => {
                    replica.apply_add(*row);
                    true
                }
                Change::Update { row, column, value } => {
                    replica.apply_update(*row, column, value.clone())?
                }
                Change::Delete { row } => replica.apply_delete(*row)?,
            };
            if hit {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Encodes the batch as delta records.
    ///
    /// Consecutive updates of one row share a record.
    pub fn encode(&self, encoder: &mut DeltaEncoder) {
        let mut pending: Option<(RemoteRowId, Vec<(ColumnId, Value)>)> = None;
        for change in &self.changes {
            if let Change::Update { row, column, value } = change {
                match pending.as_mut() {
                    Some((r, values)) if *r == *row => values.push((column.clone(), value.clone())),
                    _ => {
                        flush_pending(encoder, pending.take());
                        pending = Some((*row, vec![(column.clone(), value.clone())]));
                    }
                }
                continue;
            }
            flush_pending(encoder, pending.take());
            match change {
                Change::Add { row } => encoder.encode_add(*row as usize),
                Change::Delete { row } => encoder.encode_delete(*row as usize),
                Change::Update { .. } => {}
            }
        }
        flush_pending(encoder, pending);
    }
}

fn flush_pending(encoder: &mut DeltaEncoder, pending: Option<(RemoteRowId, Vec<(ColumnId, Value)>)>) {
    if let Some((row, values)) = pending {
        encoder.encode_update(row as usize, &values);
    }
}

impl IntoIterator for ChangeBatch {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
