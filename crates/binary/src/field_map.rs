//! Column-id <-> field-id table.
//!
//! Both ends of a stream hold the same `FieldMap`, agreed out of band. A
//! column absent from the map is not replicated.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use ripple_core::ColumnId;

use crate::error::FieldMapError;
use crate::wire::{MAX_FIELD, ROW_ID_FIELD};

/// Bidirectional mapping between column ids and wire field numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "BTreeMap<String, u32>", into = "BTreeMap<String, u32>")
)]
pub struct FieldMap {
    by_column: BTreeMap<ColumnId, u32>,
    by_field: BTreeMap<u32, ColumnId>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns fields 1, 2, 3, ... to `columns` in order.
    pub fn sequential<I, S>(columns: I) -> Result<Self, FieldMapError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for (i, column) in columns.into_iter().enumerate() {
            map.insert(column.as_ref(), i as u32 + 1)?;
        }
        Ok(map)
    }

    /// Maps `column` to `field`.
    ///
    /// Column fields live inside a record group, so numbers that collide with
    /// the top-level operation fields are allowed. Only 0 and `ROW_ID_FIELD`
    /// are reserved.
    pub fn insert(&mut self, column: &str, field: u32) -> Result<&mut Self, FieldMapError> {
        if field == 0 || field == ROW_ID_FIELD || field > MAX_FIELD {
            return Err(FieldMapError::ReservedField(field));
        }
        if self.by_field.contains_key(&field) {
            return Err(FieldMapError::DuplicateField(field));
        }
        if self.by_column.contains_key(column) {
            return Err(FieldMapError::DuplicateColumn(column.to_string()));
        }
        let id: ColumnId = column.into();
        self.by_column.insert(id.clone(), field);
        self.by_field.insert(field, id);
        Ok(self)
    }

    /// Returns the field mapped to `column`.
    #[inline]
    pub fn field(&self, column: &str) -> Option<u32> {
        self.by_column.get(column).copied()
    }

    /// Returns the column mapped to `field`.
    #[inline]
    pub fn column(&self, field: u32) -> Option<&ColumnId> {
        self.by_field.get(&field)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_field.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }

    /// Iterates `(field, column)` in field order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &ColumnId)> + '_ {
        self.by_field.iter().map(|(f, c)| (*f, c))
    }
}

impl TryFrom<BTreeMap<String, u32>> for FieldMap {
    type Error = FieldMapError;

    fn try_from(entries: BTreeMap<String, u32>) -> Result<Self, Self::Error> {
        let mut map = Self::new();
        for (column, field) in &entries {
            map.insert(column, *field)?;
        }
        Ok(map)
    }
}

impl From<FieldMap> for BTreeMap<String, u32> {
    fn from(map: FieldMap) -> Self {
        map.by_column
            .into_iter()
            .map(|(c, f)| (c.to_string(), f))
            .collect()
    }
}
