//! The joined table facade.
//!
//! A `JoinedTable` presents the result of a `JoinEngine` as a read-only
//! `ReactiveTable`. Reads of a source column are redirected to the mapped
//! source row; an unmatched side reads the gap value of the column's type.
//! Because it is itself a `ReactiveTable`, a joined table can feed another
//! join or a replication pipeline.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use hashbrown::HashMap;
use ripple_core::{ColumnDef, ColumnId, DataType, Error, Result, RowIndex, Value};
use ripple_reactive::{Observer, Subject, Subscription, SubscriptionSet, TableAction, TableUpdate};
use ripple_storage::{ComputeFn, ComputedColumns, ReactiveTable};
use tracing::{debug, warn};

use crate::join::{JoinChange, JoinEngine, JoinSide, JoinType};

/// Produces the value read from an unmatched side of an outer join.
pub type GapValueFn = Rc<dyn Fn(&str, DataType) -> Value>;

/// Builder for a `JoinedTable`.
pub struct JoinBuilder {
    left: Rc<dyn ReactiveTable>,
    left_key: ColumnId,
    right: Rc<dyn ReactiveTable>,
    right_key: ColumnId,
    join_type: JoinType,
    name: Option<String>,
    gap_value: GapValueFn,
}

impl JoinBuilder {
    /// Starts an inner join of `left.left_key = right.right_key`.
    pub fn new<L, R>(left: L, left_key: &str, right: R, right_key: &str) -> Self
    where
        L: ReactiveTable + 'static,
        R: ReactiveTable + 'static,
    {
        Self {
            left: Rc::new(left),
            left_key: left_key.into(),
            right: Rc::new(right),
            right_key: right_key.into(),
            join_type: JoinType::Inner,
            name: None,
            gap_value: Rc::new(|_, data_type| Value::default_for_type(data_type)),
        }
    }

    pub fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    /// Names the joined table. Defaults to `<left>_<right>`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the value read from an unmatched side. Defaults to the type's
    /// default value.
    pub fn gap_value<F>(mut self, gap_value: F) -> Self
    where
        F: Fn(&str, DataType) -> Value + 'static,
    {
        self.gap_value = Rc::new(gap_value);
        self
    }

    /// Validates the join, links the rows both sources already hold and
    /// subscribes to both sources.
    pub fn build(self) -> Result<JoinedTable> {
        let name = self
            .name
            .unwrap_or_else(|| format!("{}_{}", self.left.name(), self.right.name()));

        let left_type = self.left.column_type(&self.left_key)?;
        let right_type = self.right.column_type(&self.right_key)?;
        if !left_type.is_hashable() || !right_type.is_hashable() {
            return Err(Error::invalid_schema(format!(
                "join {}: key columns must be hashable, got {:?} and {:?}",
                name, left_type, right_type
            )));
        }
        if left_type != right_type {
            return Err(Error::invalid_schema(format!(
                "join {}: key types differ, {:?} and {:?}",
                name, left_type, right_type
            )));
        }

        let left_columns = self.left.column_ids();
        let right_columns = self.right.column_ids();
        let mut columns = HashMap::new();
        for (side, ids, source) in [
            (JoinSide::Left, &left_columns, &self.left),
            (JoinSide::Right, &right_columns, &self.right),
        ] {
            for id in ids.iter() {
                let data_type = source.column_type(id)?;
                if columns.insert(id.clone(), (side, data_type)).is_some() {
                    return Err(Error::duplicate_column(name.as_str(), &**id));
                }
            }
        }

        let mut engine = JoinEngine::new(self.join_type);
        for (side, source, key) in [
            (JoinSide::Left, &self.left, &self.left_key),
            (JoinSide::Right, &self.right, &self.right_key),
        ] {
            for row in source.row_indices() {
                engine.link(side, row, source.get_value(key, row)?);
            }
        }
        debug!(
            join = name.as_str(),
            join_type = ?self.join_type,
            rows = engine.row_count(),
            "join built"
        );

        let inner = Rc::new(JoinedInner {
            name,
            left: self.left,
            left_key: self.left_key,
            left_columns,
            right: self.right,
            right_key: self.right_key,
            right_columns,
            columns,
            gap_value: self.gap_value,
            engine: RefCell::new(engine),
            computed: RefCell::new(ComputedColumns::new()),
            updates: Subject::new(),
            sources: RefCell::new(SubscriptionSet::new()),
        });

        for side in [JoinSide::Left, JoinSide::Right] {
            let weak = Rc::downgrade(&inner);
            let observer: Observer<TableUpdate> = Rc::new(move |update: &TableUpdate| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_source_update(side, update);
                }
            });
            let token = inner.source(side).subscribe_observer(observer);
            inner.sources.borrow_mut().push(token);
        }

        Ok(JoinedTable { inner })
    }
}

/// Joins two tables with the default options for `join_type`.
pub fn join<L, R>(
    left: L,
    left_key: &str,
    right: R,
    right_key: &str,
    join_type: JoinType,
) -> Result<JoinedTable>
where
    L: ReactiveTable + 'static,
    R: ReactiveTable + 'static,
{
    JoinBuilder::new(left, left_key, right, right_key)
        .join_type(join_type)
        .build()
}

struct JoinedInner {
    name: String,
    left: Rc<dyn ReactiveTable>,
    left_key: ColumnId,
    left_columns: Vec<ColumnId>,
    right: Rc<dyn ReactiveTable>,
    right_key: ColumnId,
    right_columns: Vec<ColumnId>,
    /// Source column -> owning side and type.
    columns: HashMap<ColumnId, (JoinSide, DataType)>,
    gap_value: GapValueFn,
    engine: RefCell<JoinEngine>,
    computed: RefCell<ComputedColumns>,
    updates: Subject<TableUpdate>,
    /// Tokens of the two source subscriptions.
    sources: RefCell<SubscriptionSet>,
}

impl JoinedInner {
    fn source(&self, side: JoinSide) -> &Rc<dyn ReactiveTable> {
        match side {
            JoinSide::Left => &self.left,
            JoinSide::Right => &self.right,
        }
    }

    fn key(&self, side: JoinSide) -> &ColumnId {
        match side {
            JoinSide::Left => &self.left_key,
            JoinSide::Right => &self.right_key,
        }
    }

    fn side_columns(&self, side: JoinSide) -> &[ColumnId] {
        match side {
            JoinSide::Left => &self.left_columns,
            JoinSide::Right => &self.right_columns,
        }
    }

    fn column_ids(&self) -> Vec<ColumnId> {
        let mut ids = self.left_columns.clone();
        ids.extend(self.right_columns.iter().cloned());
        ids.extend(self.computed.borrow().column_ids());
        ids
    }

    fn on_source_update(&self, side: JoinSide, update: &TableUpdate) {
        let source = update.row_index();
        match update.action() {
            TableAction::Add => {
                self.relink(side, source);
            }
            TableAction::Delete => {
                let changes = self.engine.borrow_mut().unlink(side, source);
                self.publish(&changes);
            }
            TableAction::Update => {
                let key_column = self.key(side);
                // Joined rows whose side columns `publish` already emitted.
                let emitted = if update.touches(key_column) {
                    self.relink(side, source)
                } else {
                    Vec::new()
                };

                let known = self.side_columns(side);
                let touched: Vec<ColumnId> = update
                    .columns()
                    .iter()
                    .filter(|c| *c != key_column && known.contains(*c))
                    .cloned()
                    .collect();
                if touched.is_empty() {
                    return;
                }
                let rows = self.engine.borrow().joined_rows_of(side, source);
                for row in rows.into_iter().filter(|r| !emitted.contains(r)) {
                    self.emit_columns(row, touched.clone());
                }
            }
        }
    }

    /// Links `source` under its current key and publishes the result.
    /// Returns the joined rows whose `side` columns were emitted.
    fn relink(&self, side: JoinSide, source: RowIndex) -> Vec<RowIndex> {
        let key = match self.source(side).get_value(self.key(side), source) {
            Ok(key) => key,
            Err(error) => {
                warn!(join = self.name.as_str(), ?side, source, %error, "failed to read join key");
                return Vec::new();
            }
        };
        let changes = self.engine.borrow_mut().link(side, source, key);
        self.publish(&changes);
        changes
            .iter()
            .filter_map(|change| match *change {
                JoinChange::Added(row) => Some(row),
                JoinChange::Updated(row, s) if s == side => Some(row),
                _ => None,
            })
            .collect()
    }

    fn publish(&self, changes: &[JoinChange]) {
        if changes.is_empty() {
            return;
        }
        let all = self.column_ids();
        for change in changes {
            match *change {
                JoinChange::Added(row) => {
                    self.updates.notify(&TableUpdate::add(row));
                    self.updates
                        .notify(&TableUpdate::update_columns(row, all.clone()));
                }
                JoinChange::Updated(row, side) => {
                    self.emit_columns(row, self.side_columns(side).to_vec());
                }
                JoinChange::Deleted(row) => {
                    self.updates.notify(&TableUpdate::delete(row));
                }
            }
        }
    }

    /// Emits an `Update` for `columns`, then one per dependent computed
    /// column.
    fn emit_columns(&self, row: RowIndex, columns: Vec<ColumnId>) {
        let dependents = self.computed.borrow().dependents_of(&columns);
        self.updates.notify(&TableUpdate::update_columns(row, columns));
        for dependent in dependents {
            self.updates.notify(&TableUpdate::update(row, dependent));
        }
    }

    fn get_value(&self, column: &str, row: RowIndex) -> Result<Value> {
        if !self.engine.borrow().contains_row(row) {
            return Err(Error::row_not_found(self.name.as_str(), row));
        }
        if let Some((side, data_type)) = self.columns.get(column).copied() {
            let source = self.engine.borrow().source_row(side, row);
            return match source {
                Some(source) => self.source(side).get_value(column, source),
                None => {
                    let value = (self.gap_value)(column, data_type);
                    value.expect_type(data_type)?;
                    Ok(value)
                }
            };
        }
        let computed = self
            .computed
            .borrow()
            .get(column)
            .cloned()
            .ok_or_else(|| Error::column_not_found(self.name.as_str(), column))?;
        computed.evaluate(row, &|c, r| self.get_value(c, r))
    }
}

/// A read-only, incrementally maintained join of two tables.
///
/// Joined row ids are reused: an id freed by a deleted joined row is handed
/// to the next joined row created, lowest first. Dropping every handle
/// unsubscribes from both sources.
#[derive(Clone)]
pub struct JoinedTable {
    inner: Rc<JoinedInner>,
}

impl JoinedTable {
    #[inline]
    pub fn join_type(&self) -> JoinType {
        self.inner.engine.borrow().join_type()
    }

    /// Returns the left source.
    pub fn left(&self) -> &Rc<dyn ReactiveTable> {
        &self.inner.left
    }

    /// Returns the right source.
    pub fn right(&self) -> &Rc<dyn ReactiveTable> {
        &self.inner.right
    }

    /// Returns the left source row of joined row `row`, or `None` when the
    /// left side is unmatched.
    pub fn left_row(&self, row: RowIndex) -> Option<RowIndex> {
        self.inner.engine.borrow().left_row(row)
    }

    /// Returns the right source row of joined row `row`, or `None` when the
    /// right side is unmatched.
    pub fn right_row(&self, row: RowIndex) -> Option<RowIndex> {
        self.inner.engine.borrow().right_row(row)
    }

    /// Resolves the source row backing `column` in joined row `row`.
    ///
    /// `Ok(None)` means the column's side is unmatched and reads return the
    /// gap value.
    pub fn source_row(&self, column: &str, row: RowIndex) -> Result<Option<RowIndex>> {
        let (side, _) = self
            .inner
            .columns
            .get(column)
            .copied()
            .ok_or_else(|| Error::column_not_found(self.inner.name.as_str(), column))?;
        Ok(self.inner.engine.borrow().source_row(side, row))
    }

    /// Registers a computed column over source and computed columns.
    ///
    /// Values are evaluated on read; writes to a dependency re-emit an
    /// `Update` for the computed column.
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
        let columns = &self.inner.columns;
        self.inner.computed.borrow_mut().add(
            self.inner.name.as_str(),
            ColumnDef::new(id, data_type),
            dependencies.iter().map(|d| ColumnId::from(*d)).collect(),
            compute,
            |c| columns.get(c).map(|(_, data_type)| *data_type),
        )
    }

    /// Returns the number of subscribers of the joined update stream.
    pub fn subscriber_count(&self) -> usize {
        self.inner.updates.subscriber_count()
    }
}

impl ReactiveTable for JoinedTable {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn column_ids(&self) -> Vec<ColumnId> {
        self.inner.column_ids()
    }

    fn column_type(&self, column: &str) -> Result<DataType> {
        if let Some((_, data_type)) = self.inner.columns.get(column) {
            return Ok(*data_type);
        }
        self.inner
            .computed
            .borrow()
            .get(column)
            .map(|c| c.def().data_type())
            .ok_or_else(|| Error::column_not_found(self.inner.name.as_str(), column))
    }

    fn row_count(&self) -> usize {
        self.inner.engine.borrow().row_count()
    }

    fn row_indices(&self) -> Vec<RowIndex> {
        self.inner.engine.borrow().row_indices()
    }

    fn contains_row(&self, row: RowIndex) -> bool {
        self.inner.engine.borrow().contains_row(row)
    }

    fn get_value(&self, column: &str, row: RowIndex) -> Result<Value> {
        self.inner.get_value(column, row)
    }

    fn subscribe_observer(&self, observer: Observer<TableUpdate>) -> Subscription {
        self.inner.updates.subscribe_observer(observer)
    }
}

impl core::fmt::Debug for JoinedTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JoinedTable")
            .field("name", &self.inner.name)
            .field("join_type", &self.join_type())
            .field("left", &self.inner.left.name())
            .field("right", &self.inner.right.name())
            .field("row_count", &self.row_count())
            .finish()
    }
}
