//! Computed (derived) columns.
//!
//! A computed column is a pure function of other columns of the same row.
//! Values are never cached: every read re-evaluates the function against the
//! current dependency values, so a column registered after rows exist reads
//! exactly like one registered before. Writes to a dependency re-emit an
//! `Update` for every computed column that transitively depends on it.

use alloc::rc::Rc;
use alloc::vec::Vec;
use ripple_core::{ColumnDef, ColumnId, DataType, Error, Result, RowIndex, Value};

/// Function computing a derived value from its dependency values, in the
/// order the dependencies were declared.
pub type ComputeFn = Rc<dyn Fn(&[Value]) -> Value>;

/// A registered computed column.
#[derive(Clone)]
pub struct ComputedColumn {
    def: ColumnDef,
    dependencies: Vec<ColumnId>,
    compute: ComputeFn,
}

impl ComputedColumn {
    #[inline]
    pub fn def(&self) -> &ColumnDef {
        &self.def
    }

    #[inline]
    pub fn dependencies(&self) -> &[ColumnId] {
        &self.dependencies
    }

    /// Evaluates this column for `row`, reading dependencies through `read`.
    pub fn evaluate(
        &self,
        row: RowIndex,
        read: &dyn Fn(&str, RowIndex) -> Result<Value>,
    ) -> Result<Value> {
        let inputs = self
            .dependencies
            .iter()
            .map(|dep| read(&**dep, row))
            .collect::<Result<Vec<_>>>()?;
        let value = (self.compute)(&inputs);
        value.expect_type(self.def.data_type())?;
        Ok(value)
    }

    fn depends_on_any(&self, columns: &[ColumnId]) -> bool {
        self.dependencies.iter().any(|d| columns.contains(d))
    }
}

/// The computed columns of one table, in registration order.
///
/// Dependencies must exist when a column is registered, so registration
/// order is a topological order of the dependency graph.
#[derive(Clone, Default)]
pub struct ComputedColumns {
    columns: Vec<ComputedColumn>,
}

impl ComputedColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a computed column.
    ///
    /// `lookup` resolves the type of a stored column of the owning table;
    /// computed columns registered earlier are resolved here.
    pub fn add(
        &mut self,
        table: &str,
        def: ColumnDef,
        dependencies: Vec<ColumnId>,
        compute: ComputeFn,
        lookup: impl Fn(&str) -> Option<DataType>,
    ) -> Result<()> {
        if lookup(&**def.id()).is_some() || self.get(def.id()).is_some() {
            return Err(Error::duplicate_column(table, &**def.id()));
        }
        for dep in &dependencies {
            if lookup(&**dep).is_none() && self.get(dep).is_none() {
                return Err(Error::column_not_found(table, &**dep));
            }
        }
        self.columns.push(ComputedColumn {
            def,
            dependencies,
            compute,
        });
        Ok(())
    }

    /// Gets a computed column by id.
    pub fn get(&self, id: &str) -> Option<&ComputedColumn> {
        self.columns.iter().find(|c| &**c.def.id() == id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the ids of all computed columns.
    pub fn column_ids(&self) -> Vec<ColumnId> {
        self.columns.iter().map(|c| c.def.id().clone()).collect()
    }

    /// Returns, in registration order, every computed column that depends
    /// directly or transitively on any of `touched`.
    pub fn dependents_of(&self, touched: &[ColumnId]) -> Vec<ColumnId> {
        let mut affected: Vec<ColumnId> = Vec::new();
        for column in &self.columns {
            if column.depends_on_any(touched) || column.depends_on_any(&affected) {
                affected.push(column.def.id().clone());
            }
        }
        affected
    }

    /// Evaluates computed column `id` for `row`.
    ///
    /// `read` resolves dependency values and is expected to recurse back into
    /// `evaluate` for computed dependencies.
    pub fn evaluate(
        &self,
        id: &str,
        row: RowIndex,
        read: &dyn Fn(&str, RowIndex) -> Result<Value>,
    ) -> Option<Result<Value>> {
        self.get(id).map(|column| column.evaluate(row, read))
    }
}
