//! Table update records.
//!
//! A `TableUpdate` describes one logical change to one row. For a given row,
//! `Add` precedes every `Update` referencing it and `Delete` is terminal.

use alloc::vec;
use alloc::vec::Vec;
use ripple_core::{ColumnId, RowIndex};

/// The kind of change a `TableUpdate` describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableAction {
    /// A row was created; all columns hold their defaults.
    Add,
    /// One or more columns of a live row were written.
    Update,
    /// A row was removed.
    Delete,
}

/// An immutable record of one change to a table row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableUpdate {
    action: TableAction,
    row_index: RowIndex,
    /// Touched columns; empty for `Add` and `Delete`. The first entry is the
    /// primary column of an `Update`.
    columns: Vec<ColumnId>,
}

impl TableUpdate {
    /// Creates an `Add` update.
    #[inline]
    pub fn add(row_index: RowIndex) -> Self {
        Self {
            action: TableAction::Add,
            row_index,
            columns: Vec::new(),
        }
    }

    /// Creates a `Delete` update.
    #[inline]
    pub fn delete(row_index: RowIndex) -> Self {
        Self {
            action: TableAction::Delete,
            row_index,
            columns: Vec::new(),
        }
    }

    /// Creates an `Update` for a single column.
    #[inline]
    pub fn update(row_index: RowIndex, column: ColumnId) -> Self {
        Self {
            action: TableAction::Update,
            row_index,
            columns: vec![column],
        }
    }

    /// Creates an `Update` touching several columns together.
    ///
    /// Used to seed observers right after an `Add`. An empty column list
    /// yields an update that touches nothing.
    pub fn update_columns(row_index: RowIndex, columns: Vec<ColumnId>) -> Self {
        Self {
            action: TableAction::Update,
            row_index,
            columns,
        }
    }

    /// Returns the action.
    #[inline]
    pub fn action(&self) -> TableAction {
        self.action
    }

    /// Returns the row index.
    #[inline]
    pub fn row_index(&self) -> RowIndex {
        self.row_index
    }

    /// Returns the primary column of an `Update`.
    #[inline]
    pub fn column(&self) -> Option<&ColumnId> {
        self.columns.first()
    }

    /// Returns every column touched by this update.
    #[inline]
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    /// Returns true if this update touches `column`.
    pub fn touches(&self, column: &str) -> bool {
        self.columns.iter().any(|c| &**c == column)
    }

    #[inline]
    pub fn is_add(&self) -> bool {
        self.action == TableAction::Add
    }

    #[inline]
    pub fn is_update(&self) -> bool {
        self.action == TableAction::Update
    }

    #[inline]
    pub fn is_delete(&self) -> bool {
        self.action == TableAction::Delete
    }
}
