//! Replica application.
//!
//! A `TableReplica` applies the operations of a remote table to a local
//! `Table`. Row ids of the two tables are unrelated; the replica keeps the
//! `remote -> local` mapping for every row it created.

use hashbrown::HashMap;
use ripple_core::{Result, RowIndex, Value};
use tracing::warn;

use crate::source::ReactiveTable;
use crate::table::Table;

/// Remote row identifier as carried by a delta stream.
pub type RemoteRowId = u64;

/// Applies remote row operations to a local table.
pub struct TableReplica {
    table: Table,
    rows: HashMap<RemoteRowId, RowIndex>,
}

impl TableReplica {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            rows: HashMap::new(),
        }
    }

    /// Returns the local table.
    #[inline]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Returns the local row mapped to `remote`.
    pub fn local_row(&self, remote: RemoteRowId) -> Option<RowIndex> {
        self.rows.get(&remote).copied()
    }

    /// Returns the number of mapped rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Adds a local row for `remote`.
    ///
    /// A repeated `Add` for a row that is already mapped keeps the existing
    /// local row.
    pub fn apply_add(&mut self, remote: RemoteRowId) -> RowIndex {
        if let Some(local) = self.local_row(remote) {
            warn!(table = self.table.name(), remote, "duplicate add for mapped row");
            return local;
        }
        let local = self.table.add_row();
        self.rows.insert(remote, local);
        local
    }

    /// Writes one column of the local row mapped to `remote`.
    ///
    /// Returns `Ok(false)` when `remote` is not mapped; the write is dropped.
    pub fn apply_update(&mut self, remote: RemoteRowId, column: &str, value: Value) -> Result<bool> {
        match self.local_row(remote) {
            Some(local) => {
                self.table.set_value(column, local, value)?;
                Ok(true)
            }
            None => {
                warn!(table = self.table.name(), remote, column, "update for unknown row");
                Ok(false)
            }
        }
    }

    /// Deletes the local row mapped to `remote` and forgets the mapping.
    ///
    /// Returns `Ok(false)` when `remote` is not mapped.
    pub fn apply_delete(&mut self, remote: RemoteRowId) -> Result<bool> {
        match self.rows.remove(&remote) {
            Some(local) => {
                self.table.delete_row(local)?;
                Ok(true)
            }
            None => {
                warn!(table = self.table.name(), remote, "delete for unknown row");
                Ok(false)
            }
        }
    }
}

impl core::fmt::Debug for TableReplica {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TableReplica")
            .field("table", &self.table.name())
            .field("rows", &self.rows.len())
            .finish()
    }
}
