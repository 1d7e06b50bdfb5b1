//! Base tables.
//!
//! A `Table` owns one `Column` per schema column and the row-id space. Every
//! mutation is stored first and announced afterwards, once all interior
//! borrows are released, so observers may read the table (or mutate it) from
//! inside their callback.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;

use ripple_core::schema::Schema;
use ripple_core::{ColumnDef, ColumnId, DataType, Error, Result, RowIndex, Value};
use ripple_reactive::{Observer, Subject, Subscription, TableUpdate};
use tracing::trace;

use crate::column::Column;
use crate::computed::{ComputeFn, ComputedColumns};
use crate::source::ReactiveTable;

struct TableState {
    columns: Vec<Column>,
    /// Liveness per row slot; slots are never reused.
    live: Vec<bool>,
    row_count: usize,
    computed: ComputedColumns,
}

impl TableState {
    fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| &**c.id() == id)
    }

    fn column_mut(&mut self, id: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| &**c.id() == id)
    }

    fn is_live(&self, row: RowIndex) -> bool {
        self.live.get(row).copied().unwrap_or(false)
    }
}

struct TableInner {
    schema: Schema,
    state: RefCell<TableState>,
    updates: Subject<TableUpdate>,
}

/// A columnar table emitting a single ordered `TableUpdate` stream.
///
/// `Table` is a cheap handle; clones refer to the same table. It is not
/// thread-safe: all access happens on the thread that owns it.
#[derive(Clone)]
pub struct Table {
    inner: Rc<TableInner>,
}

/// Non-owning handle to a `Table`, for observers that must not keep the
/// table alive.
#[derive(Clone)]
pub struct WeakTable {
    inner: Weak<TableInner>,
}

impl WeakTable {
    pub fn upgrade(&self) -> Option<Table> {
        self.inner.upgrade().map(|inner| Table { inner })
    }
}

impl Table {
    /// Creates an empty table with the given schema.
    pub fn new(schema: Schema) -> Self {
        let columns = schema.columns().iter().cloned().map(Column::new).collect();
        Self {
            inner: Rc::new(TableInner {
                schema,
                state: RefCell::new(TableState {
                    columns,
                    live: Vec::new(),
                    row_count: 0,
                    computed: ComputedColumns::new(),
                }),
                updates: Subject::new(),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakTable {
        WeakTable {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns the schema of the stored columns.
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Returns true if both handles refer to the same table.
    pub fn ptr_eq(&self, other: &Table) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Appends a row holding every column's default and emits `Add`.
    pub fn add_row(&self) -> RowIndex {
        let row = {
            let mut state = self.inner.state.borrow_mut();
            let row = state.live.len();
            for column in state.columns.iter_mut() {
                column.push_default();
            }
            state.live.push(true);
            state.row_count += 1;
            row
        };
        trace!(table = self.name(), row, "row added");
        self.inner.updates.notify(&TableUpdate::add(row));
        row
    }

    /// Writes one cell and emits `Update` for the column, followed by one
    /// `Update` per computed column depending on it.
    pub fn set_value(&self, column: &str, row: RowIndex, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (id, changed, dependents) = {
            let mut state = self.inner.state.borrow_mut();
            if !state.is_live(row) {
                return Err(Error::row_not_found(self.name(), row));
            }
            if state.computed.get(column).is_some() {
                return Err(Error::invalid_operation("computed columns are read-only"));
            }
            let target = state
                .column_mut(column)
                .ok_or_else(|| Error::column_not_found(self.name(), column))?;
            target.set(row, value)?;
            let id = target.id().clone();
            let changed = target.changed();
            let dependents = state.computed.dependents_of(core::slice::from_ref(&id));
            (id, changed, dependents)
        };
        changed.notify(&row);
        self.inner.updates.notify(&TableUpdate::update(row, id));
        for dependent in dependents {
            self.inner.updates.notify(&TableUpdate::update(row, dependent));
        }
        Ok(())
    }

    /// Deletes a row and emits `Delete`. The row id is never reused.
    pub fn delete_row(&self, row: RowIndex) -> Result<()> {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.is_live(row) {
                return Err(Error::row_not_found(self.name(), row));
            }
            for column in state.columns.iter_mut() {
                column.clear(row);
            }
            state.live[row] = false;
            state.row_count -= 1;
        }
        trace!(table = self.name(), row, "row deleted");
        self.inner.updates.notify(&TableUpdate::delete(row));
        Ok(())
    }

    /// Registers a computed column evaluated from `dependencies` on every
    /// read.
    ///
    /// Dependencies may be stored columns or previously registered computed
    /// columns. Rows that already exist read the computed value immediately.
    pub fn add_computed_column<F>(
        &self,
        id: &str,
        data_type: DataType,
        dependencies: &[&str],
        compute: F,
    ) -> Result<()>
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        let compute: ComputeFn = Rc::new(compute);
        let mut state = self.inner.state.borrow_mut();
        let TableState {
            columns, computed, ..
        } = &mut *state;
        computed.add(
            self.name(),
            ColumnDef::new(id, data_type),
            dependencies.iter().map(|d| ColumnId::from(*d)).collect(),
            compute,
            |c| {
                columns
                    .iter()
                    .find(|col| &**col.id() == c)
                    .map(|col| col.data_type())
            },
        )
    }

    /// Subscribes to writes of a single column.
    ///
    /// The callback receives the row index after the value is stored.
    pub fn subscribe_column<F>(&self, column: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(&RowIndex) + 'static,
    {
        let state = self.inner.state.borrow();
        if let Some(stored) = state.column(column) {
            return Ok(stored.subscribe(callback));
        }
        let computed = state
            .computed
            .get(column)
            .map(|c| c.def().id().clone())
            .ok_or_else(|| Error::column_not_found(self.name(), column))?;
        drop(state);
        Ok(self.inner.updates.subscribe(move |update: &TableUpdate| {
            if update.is_update() && update.touches(&computed) {
                callback(&update.row_index());
            }
        }))
    }

    /// Returns the number of subscribers of the table update stream.
    pub fn subscriber_count(&self) -> usize {
        self.inner.updates.subscriber_count()
    }
}

impl ReactiveTable for Table {
    fn name(&self) -> &str {
        self.inner.schema.name()
    }

    fn column_ids(&self) -> Vec<ColumnId> {
        let mut ids = self.inner.schema.column_ids();
        ids.extend(self.inner.state.borrow().computed.column_ids());
        ids
    }

    fn column_type(&self, column: &str) -> Result<DataType> {
        if let Some(def) = self.inner.schema.get_column(column) {
            return Ok(def.data_type());
        }
        self.inner
            .state
            .borrow()
            .computed
            .get(column)
            .map(|c| c.def().data_type())
            .ok_or_else(|| Error::column_not_found(self.name(), column))
    }

    fn row_count(&self) -> usize {
        self.inner.state.borrow().row_count
    }

    fn row_indices(&self) -> Vec<RowIndex> {
        let state = self.inner.state.borrow();
        state
            .live
            .iter()
            .enumerate()
            .filter(|(_, live)| **live)
            .map(|(row, _)| row)
            .collect()
    }

    fn contains_row(&self, row: RowIndex) -> bool {
        self.inner.state.borrow().is_live(row)
    }

    fn get_value(&self, column: &str, row: RowIndex) -> Result<Value> {
        let computed = {
            let state = self.inner.state.borrow();
            if !state.is_live(row) {
                return Err(Error::row_not_found(self.name(), row));
            }
            if let Some(stored) = state.column(column) {
                return stored
                    .get(row)
                    .cloned()
                    .ok_or_else(|| Error::row_not_found(self.name(), row));
            }
            state
                .computed
                .get(column)
                .cloned()
                .ok_or_else(|| Error::column_not_found(self.name(), column))?
        };
        computed.evaluate(row, &|c, r| self.get_value(c, r))
    }

    fn subscribe_observer(&self, observer: Observer<TableUpdate>) -> Subscription {
        self.inner.updates.subscribe_observer(observer)
    }
}

impl core::fmt::Debug for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Table")
            .field("name", &self.name())
            .field("columns", &state.columns)
            .field("computed", &state.computed.len())
            .field("row_count", &state.row_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ReactiveTableExt;
    use alloc::string::String;
    use alloc::vec;
    use core::cell::Cell;
    use ripple_core::schema::SchemaBuilder;
    use ripple_reactive::TableAction;

    fn people() -> Table {
        let schema = SchemaBuilder::new("people")
            .unwrap()
            .add_column("id", DataType::Int32)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_column_with_default("age", DataType::Int32, Value::Int32(18))
            .unwrap()
            .build()
            .unwrap();
        Table::new(schema)
    }

    fn record(table: &Table) -> (Rc<RefCell<Vec<TableUpdate>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        let token = table.subscribe(move |u: &TableUpdate| log_clone.borrow_mut().push(u.clone()));
        (log, token)
    }

    #[test]
    fn test_add_row_appends_defaults() {
        let table = people();
        let (log, _token) = record(&table);

        let row = table.add_row();
        assert_eq!(row, 0);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.get_value("name", row).unwrap(), Value::from(""));
        assert_eq!(table.get::<i32>("age", row).unwrap(), 18);
        assert_eq!(*log.borrow(), vec![TableUpdate::add(0)]);
    }

    #[test]
    fn test_set_value_visible_inside_callback() {
        let table = people();
        let row = table.add_row();
        let seen = Rc::new(RefCell::new(String::new()));

        let reader = table.downgrade();
        let seen_clone = seen.clone();
        let _token = table.subscribe(move |u: &TableUpdate| {
            if u.is_update() && u.touches("name") {
                let table = reader.upgrade().unwrap();
                *seen_clone.borrow_mut() = table.get::<String>("name", u.row_index()).unwrap();
            }
        });

        table.set_value("name", row, "Ada").unwrap();
        assert_eq!(&*seen.borrow(), "Ada");
    }

    #[test]
    fn test_set_value_errors_leave_state_untouched() {
        let table = people();
        let row = table.add_row();
        let (log, _token) = record(&table);

        assert!(matches!(
            table.set_value("missing", row, 1),
            Err(Error::ColumnNotFound { .. })
        ));
        assert!(matches!(
            table.set_value("id", row, "text"),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            table.set_value("id", 9, 1),
            Err(Error::RowNotFound { .. })
        ));
        assert_eq!(table.get::<i32>("id", row).unwrap(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_delete_never_reuses_ids() {
        let table = people();
        let a = table.add_row();
        let b = table.add_row();
        let (log, _token) = record(&table);

        table.delete_row(a).unwrap();
        assert_eq!(table.row_count(), 1);
        assert!(!table.contains_row(a));
        assert_eq!(table.row_indices(), vec![b]);
        assert!(matches!(table.delete_row(a), Err(Error::RowNotFound { .. })));

        let c = table.add_row();
        assert_eq!(c, 2);
        assert_eq!(table.row_indices(), vec![b, c]);
        assert_eq!(
            log.borrow().iter().map(|u| u.action()).collect::<Vec<_>>(),
            vec![TableAction::Delete, TableAction::Add]
        );
    }

    #[test]
    fn test_multiple_subscribers_see_same_order() {
        let table = people();
        let (first, _a) = record(&table);
        let (second, _b) = record(&table);

        let row = table.add_row();
        table.set_value("id", row, 5).unwrap();
        table.delete_row(row).unwrap();

        assert_eq!(first.borrow().len(), 3);
        assert_eq!(*first.borrow(), *second.borrow());
    }

    #[test]
    fn test_dropping_token_unsubscribes() {
        let table = people();
        let (log, token) = record(&table);
        table.add_row();
        drop(token);
        table.add_row();
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(table.subscriber_count(), 0);
    }

    #[test]
    fn test_computed_column_same_before_and_after_rows() {
        let early = people();
        early
            .add_computed_column("next_age", DataType::Int32, &["age"], |v| {
                Value::Int32(v[0].as_i32().unwrap_or(0) + 1)
            })
            .unwrap();
        let row = early.add_row();
        early.set_value("age", row, 40).unwrap();

        let late = people();
        let row_late = late.add_row();
        late.set_value("age", row_late, 40).unwrap();
        late.add_computed_column("next_age", DataType::Int32, &["age"], |v| {
            Value::Int32(v[0].as_i32().unwrap_or(0) + 1)
        })
        .unwrap();

        assert_eq!(early.get::<i32>("next_age", row).unwrap(), 41);
        assert_eq!(late.get::<i32>("next_age", row_late).unwrap(), 41);
        assert_eq!(late.column_ids().last().map(|c| &**c), Some("next_age"));
    }

    #[test]
    fn test_computed_columns_chain_and_re_emit() {
        let table = people();
        table
            .add_computed_column("double", DataType::Int32, &["age"], |v| {
                Value::Int32(v[0].as_i32().unwrap_or(0) * 2)
            })
            .unwrap();
        table
            .add_computed_column("label", DataType::String, &["name", "double"], |v| {
                let name = v[0].as_str().unwrap_or("");
                Value::String(alloc::format!("{}:{}", name, v[1]))
            })
            .unwrap();
        let row = table.add_row();
        table.set_value("name", row, "Bo").unwrap();
        let (log, _token) = record(&table);

        table.set_value("age", row, 21).unwrap();

        let touched: Vec<ColumnId> = log
            .borrow()
            .iter()
            .filter_map(|u| u.column().cloned())
            .collect();
        assert_eq!(touched, vec![ColumnId::from("age"), "double".into(), "label".into()]);
        assert_eq!(table.get::<String>("label", row).unwrap(), "Bo:42");
        assert!(matches!(
            table.set_value("double", row, 1),
            Err(Error::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_subscribe_column() {
        let table = people();
        table
            .add_computed_column("older", DataType::Int32, &["age"], |v| {
                Value::Int32(v[0].as_i32().unwrap_or(0) + 10)
            })
            .unwrap();
        let row = table.add_row();
        let stored_hits = Rc::new(Cell::new(0));
        let computed_hits = Rc::new(Cell::new(0));

        let s = stored_hits.clone();
        let _a = table
            .subscribe_column("age", move |_| s.set(s.get() + 1))
            .unwrap();
        let c = computed_hits.clone();
        let _b = table
            .subscribe_column("older", move |_| c.set(c.get() + 1))
            .unwrap();

        table.set_value("age", row, 3).unwrap();
        table.set_value("name", row, "x").unwrap();
        assert_eq!(stored_hits.get(), 1);
        assert_eq!(computed_hits.get(), 1);
        assert!(table.subscribe_column("nope", |_| {}).is_err());
    }

    #[test]
    fn test_subscribe_with_replay() {
        let table = people();
        let a = table.add_row();
        let b = table.add_row();
        table.delete_row(a).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        let _token =
            table.subscribe_with_replay(move |u: &TableUpdate| log_clone.borrow_mut().push(u.clone()));

        assert_eq!(log.borrow().len(), 2);
        assert_eq!(log.borrow()[0], TableUpdate::add(b));
        assert_eq!(log.borrow()[1].columns().len(), 3);

        table.add_row();
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_weak_table_does_not_keep_alive() {
        let table = people();
        let weak = table.downgrade();
        assert!(weak.upgrade().is_some());
        drop(table);
        assert!(weak.upgrade().is_none());
    }
}
