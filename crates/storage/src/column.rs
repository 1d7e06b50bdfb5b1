//! Column storage.
//!
//! A `Column` is the value store for one field of a table. Slots are
//! addressed by row index and are never renumbered; the slot of a deleted
//! row is reset to the default value and left unused.

use alloc::vec::Vec;
use ripple_core::{ColumnDef, ColumnId, DataType, Error, Result, RowIndex, Value};
use ripple_reactive::{Subject, Subscription};

/// Row-indexed, type-checked value store for a single column.
pub struct Column {
    def: ColumnDef,
    values: Vec<Value>,
    /// Fires with the row index after a value has been written.
    changed: Subject<RowIndex>,
}

impl Column {
    /// Creates an empty column.
    pub fn new(def: ColumnDef) -> Self {
        Self {
            def,
            values: Vec::new(),
            changed: Subject::new(),
        }
    }

    /// Returns the column definition.
    #[inline]
    pub fn def(&self) -> &ColumnDef {
        &self.def
    }

    #[inline]
    pub fn id(&self) -> &ColumnId {
        self.def.id()
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.def.data_type()
    }

    /// Returns the number of slots, live or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends a slot holding the column default.
    pub fn push_default(&mut self) {
        self.values.push(self.def.get_default_value());
    }

    /// Returns the value stored at `row`.
    #[inline]
    pub fn get(&self, row: RowIndex) -> Option<&Value> {
        self.values.get(row)
    }

    /// Writes `value` at `row`.
    ///
    /// Does not notify; the owning table notifies once every borrow of the
    /// column has been released.
    pub fn set(&mut self, row: RowIndex, value: Value) -> Result<()> {
        value.expect_type(self.def.data_type())?;
        let slot = self
            .values
            .get_mut(row)
            .ok_or_else(|| Error::invalid_operation("column slot out of range"))?;
        *slot = value;
        Ok(())
    }

    /// Resets the slot at `row` to the default, releasing owned data.
    pub fn clear(&mut self, row: RowIndex) {
        if let Some(slot) = self.values.get_mut(row) {
            *slot = self.def.get_default_value();
        }
    }

    /// Returns a handle to this column's change notification point.
    #[inline]
    pub fn changed(&self) -> Subject<RowIndex> {
        self.changed.clone()
    }

    /// Subscribes to per-row value changes of this column.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RowIndex) + 'static,
    {
        self.changed.subscribe(callback)
    }
}

impl core::fmt::Debug for Column {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Column")
            .field("id", self.id())
            .field("data_type", &self.data_type())
            .field("len", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::Cell;

    #[test]
    fn test_column_push_and_set() {
        let mut col = Column::new(ColumnDef::new("n", DataType::Int32));
        col.push_default();
        col.push_default();
        assert_eq!(col.len(), 2);
        assert_eq!(col.get(1), Some(&Value::Int32(0)));

        col.set(1, Value::Int32(7)).unwrap();
        assert_eq!(col.get(1), Some(&Value::Int32(7)));
    }

    #[test]
    fn test_column_rejects_wrong_type() {
        let mut col = Column::new(ColumnDef::new("n", DataType::Int32));
        col.push_default();
        assert!(matches!(
            col.set(0, Value::Int64(1)),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_column_clear_resets_default() {
        let mut col = Column::new(ColumnDef::new("s", DataType::String));
        col.push_default();
        col.set(0, Value::from("hello")).unwrap();
        col.clear(0);
        assert_eq!(col.get(0), Some(&Value::String("".into())));
    }

    #[test]
    fn test_column_subscribe() {
        let col = Column::new(ColumnDef::new("s", DataType::String));
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        let _token = col.subscribe(move |row| hits_clone.set(hits_clone.get() + *row));
        col.changed().notify(&5);
        assert_eq!(hits.get(), 5);
    }
}
