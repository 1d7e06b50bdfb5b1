//! Table schema definition.

use super::column::{ColumnDef, ColumnId};
use crate::error::{Error, Result};
use crate::types::DataType;
use crate::value::Value;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// An ordered set of column definitions with a table name.
#[derive(Clone, Debug)]
pub struct Schema {
    /// Table name.
    name: String,
    /// Column definitions, in declaration order.
    columns: Vec<ColumnDef>,
}

impl Schema {
    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns.
    #[inline]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the number of columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a column by id.
    pub fn get_column(&self, id: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| &**c.id() == id)
    }

    /// Gets a column position by id.
    pub fn get_column_index(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| &**c.id() == id)
    }

    /// Gets a column by id, failing with `ColumnNotFound`.
    pub fn column(&self, id: &str) -> Result<&ColumnDef> {
        self.get_column(id)
            .ok_or_else(|| Error::column_not_found(self.name.as_str(), id))
    }

    /// Returns the column ids in declaration order.
    pub fn column_ids(&self) -> Vec<ColumnId> {
        self.columns.iter().map(|c| c.id().clone()).collect()
    }
}

/// Builder for creating table schemas.
///
/// ```
/// use ripple_core::schema::SchemaBuilder;
/// use ripple_core::DataType;
///
/// let schema = SchemaBuilder::new("person")
///     .unwrap()
///     .add_column("person.id", DataType::Int32)
///     .unwrap()
///     .add_column("person.name", DataType::String)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.get_column_index("person.name"), Some(1));
/// ```
pub struct SchemaBuilder {
    name: String,
    columns: Vec<ColumnDef>,
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
        })
    }

    /// Validates a name follows naming rules.
    ///
    /// Ids are ASCII identifiers; `.` is allowed so that columns can be
    /// qualified with their table (`person.id`).
    fn check_naming_rules(name: &str) -> Result<()> {
        let Some(first) = name.chars().next() else {
            return Err(Error::invalid_schema("Name cannot be empty"));
        };
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::invalid_schema(format!(
                "Name must start with letter or underscore: {}",
                name
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(Error::invalid_schema(format!(
                "Name contains invalid characters: {}",
                name
            )));
        }
        Ok(())
    }

    /// Adds a column to the schema.
    pub fn add_column(self, id: impl Into<ColumnId>, data_type: DataType) -> Result<Self> {
        self.add(ColumnDef::new(id, data_type))
    }

    /// Adds a column that starts with `default` in new rows.
    pub fn add_column_with_default(
        self,
        id: impl Into<ColumnId>,
        data_type: DataType,
        default: Value,
    ) -> Result<Self> {
        default.expect_type(data_type)?;
        self.add(ColumnDef::new(id, data_type).default_value(default))
    }

    /// Adds a prepared column definition.
    pub fn add(mut self, column: ColumnDef) -> Result<Self> {
        Self::check_naming_rules(column.id())?;
        if self.columns.iter().any(|c| c.id() == column.id()) {
            return Err(Error::duplicate_column(self.name.as_str(), &**column.id()));
        }
        column.get_default_value().expect_type(column.data_type())?;
        self.columns.push(column);
        Ok(self)
    }

    /// Builds the schema.
    pub fn build(self) -> Result<Schema> {
        let columns = self
            .columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| c.with_index(i))
            .collect();
        Ok(Schema {
            name: self.name,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Schema {
        SchemaBuilder::new("person")
            .unwrap()
            .add_column("person.id", DataType::Int32)
            .unwrap()
            .add_column("person.name", DataType::String)
            .unwrap()
            .add_column_with_default("person.active", DataType::Boolean, Value::Boolean(true))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_builder() {
        let schema = person();
        assert_eq!(schema.name(), "person");
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.columns()[2].index(), 2);
        assert_eq!(
            schema.column("person.active").unwrap().get_default_value(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_schema_get_column() {
        let schema = person();
        assert!(schema.get_column("person.id").is_some());
        assert!(schema.get_column("missing").is_none());
        assert!(matches!(
            schema.column("missing"),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_column_name() {
        let result = SchemaBuilder::new("t")
            .unwrap()
            .add_column("1abc", DataType::Int32);
        assert!(result.is_err());
        assert!(SchemaBuilder::new("").is_err());
    }

    #[test]
    fn test_duplicate_column() {
        let result = SchemaBuilder::new("t")
            .unwrap()
            .add_column("id", DataType::Int32)
            .unwrap()
            .add_column("id", DataType::Int64);
        assert!(matches!(result, Err(Error::DuplicateColumn { .. })));
    }

    #[test]
    fn test_default_must_match_type() {
        let result = SchemaBuilder::new("t").unwrap().add_column_with_default(
            "id",
            DataType::Int32,
            Value::Int64(1),
        );
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }
}
