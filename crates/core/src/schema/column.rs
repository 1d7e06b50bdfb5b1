//! Column definition for ripple table schemas.

use crate::types::DataType;
use crate::value::Value;
use alloc::sync::Arc;

/// Stable, cheaply clonable column identifier.
pub type ColumnId = Arc<str>;

/// A column definition in a table schema.
#[derive(Clone, Debug)]
pub struct ColumnDef {
    /// Column id, unique within its table.
    id: ColumnId,
    /// Data type of the column.
    data_type: DataType,
    /// Value stored in new rows.
    default_value: Option<Value>,
    /// Column position in the schema (0-based).
    index: usize,
}

impl ColumnDef {
    /// Creates a new column definition.
    pub fn new(id: impl Into<ColumnId>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            data_type,
            default_value: None,
            index: 0,
        }
    }

    /// Sets the value new rows start with.
    ///
    /// The value must have the column's type; `SchemaBuilder` validates this.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Returns the column id.
    #[inline]
    pub fn id(&self) -> &ColumnId {
        &self.id
    }

    /// Returns the data type.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the value new rows start with.
    pub fn get_default_value(&self) -> Value {
        self.default_value
            .clone()
            .unwrap_or_else(|| Value::default_for_type(self.data_type))
    }

    /// Returns the column index.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl PartialEq for ColumnDef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.data_type == other.data_type
    }
}
