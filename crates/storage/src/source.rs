//! The observable table interface.
//!
//! Base tables and derived tables (joins) expose the same read surface and
//! the same update stream through `ReactiveTable`, so consumers never need to
//! know which one they hold.

use alloc::rc::Rc;
use alloc::vec::Vec;
use ripple_core::{ColumnId, DataType, FromValue, Result, RowIndex, Value};
use ripple_reactive::{Observer, Subscription, TableUpdate};

/// Object-safe read and subscribe interface shared by every table kind.
pub trait ReactiveTable {
    /// Returns the table name.
    fn name(&self) -> &str;

    /// Returns every column id, stored columns first, then computed columns.
    fn column_ids(&self) -> Vec<ColumnId>;

    /// Returns the type of a column, failing with `ColumnNotFound`.
    fn column_type(&self, column: &str) -> Result<DataType>;

    /// Returns the number of live rows.
    fn row_count(&self) -> usize;

    /// Returns the indices of all live rows in ascending order.
    fn row_indices(&self) -> Vec<RowIndex>;

    /// Returns true if `row` is live.
    fn contains_row(&self, row: RowIndex) -> bool;

    /// Reads one cell.
    fn get_value(&self, column: &str, row: RowIndex) -> Result<Value>;

    /// Registers an observer of the update stream.
    fn subscribe_observer(&self, observer: Observer<TableUpdate>) -> Subscription;

    /// Emits a synthetic `Add` followed by a full-column `Update` for every
    /// live row, in row order, to `observer` only.
    fn replay_rows(&self, observer: &dyn Fn(&TableUpdate)) {
        let columns = self.column_ids();
        for row in self.row_indices() {
            observer(&TableUpdate::add(row));
            observer(&TableUpdate::update_columns(row, columns.clone()));
        }
    }
}

/// Convenience methods available on every `ReactiveTable`.
pub trait ReactiveTableExt: ReactiveTable {
    /// Subscribes a closure to the update stream.
    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&TableUpdate) + 'static,
    {
        self.subscribe_observer(Rc::new(callback))
    }

    /// Replays the current rows to `callback`, then keeps it subscribed to
    /// live updates.
    fn subscribe_with_replay<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&TableUpdate) + 'static,
    {
        let observer: Observer<TableUpdate> = Rc::new(callback);
        self.replay_rows(&*observer);
        self.subscribe_observer(observer)
    }

    /// Typed read of one cell.
    fn get<T: FromValue>(&self, column: &str, row: RowIndex) -> Result<T> {
        T::from_value(self.get_value(column, row)?)
    }
}

impl<T: ReactiveTable + ?Sized> ReactiveTableExt for T {}
