//! Delta encoder.
//!
//! Turns table changes into delta records. The encoder only appends to its
//! buffer; `take` hands the encoded bytes to a transport.

use alloc::vec::Vec;
use bytes::{Bytes, BytesMut};
use ripple_core::{ColumnId, Result, RowIndex, Value};
use ripple_reactive::{TableAction, TableUpdate};
use ripple_storage::ReactiveTable;

use crate::field_map::FieldMap;
use crate::wire::{
    put_tag, put_value, put_varint, WireType, ADD_FIELD, DELETE_FIELD, ROW_ID_FIELD, UPDATE_FIELD,
};

/// Encodes table changes into delta records.
pub struct DeltaEncoder {
    fields: FieldMap,
    buffer: BytesMut,
}

impl DeltaEncoder {
    pub fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            buffer: BytesMut::with_capacity(256),
        }
    }

    #[inline]
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Returns the number of encoded bytes not yet taken.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Hands out the encoded bytes and leaves the encoder empty.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    fn open(&mut self, op: u32, row: RowIndex) {
        put_tag(&mut self.buffer, op, WireType::StartGroup);
        put_tag(&mut self.buffer, ROW_ID_FIELD, WireType::Varint);
        put_varint(&mut self.buffer, row as u64);
    }

    fn close(&mut self, op: u32) {
        put_tag(&mut self.buffer, op, WireType::EndGroup);
    }

    pub fn encode_add(&mut self, row: RowIndex) {
        self.open(ADD_FIELD, row);
        self.close(ADD_FIELD);
    }

    pub fn encode_delete(&mut self, row: RowIndex) {
        self.open(DELETE_FIELD, row);
        self.close(DELETE_FIELD);
    }

    /// Encodes one `Update` record carrying the mapped subset of `values`.
    ///
    /// Returns the number of fields written. When no column is mapped no
    /// record is written at all.
    pub fn encode_update(&mut self, row: RowIndex, values: &[(ColumnId, Value)]) -> usize {
        let mapped: Vec<(u32, &Value)> = values
            .iter()
            .filter_map(|(column, value)| self.fields.field(column).map(|f| (f, value)))
            .collect();
        if mapped.is_empty() {
            return 0;
        }
        self.open(UPDATE_FIELD, row);
        for (field, value) in &mapped {
            put_value(&mut self.buffer, *field, value);
        }
        self.close(UPDATE_FIELD);
        mapped.len()
    }

    /// Encodes a change observed on `table`, reading current values.
    ///
    /// An `Add` is followed by an `Update` of every mapped column so the
    /// receiver sees the row's full state.
    pub fn encode_change(&mut self, table: &dyn ReactiveTable, update: &TableUpdate) -> Result<()> {
        let row = update.row_index();
        match update.action() {
            TableAction::Add => {
                self.encode_add(row);
                let values = self.mapped_values(table, row, &table.column_ids())?;
                self.encode_update(row, &values);
            }
            TableAction::Update => {
                let values = self.mapped_values(table, row, update.columns())?;
                self.encode_update(row, &values);
            }
            TableAction::Delete => self.encode_delete(row),
        }
        Ok(())
    }

    /// Encodes every live row of `table` as `Add` plus a full `Update`, in
    /// row order.
    pub fn encode_replay(&mut self, table: &dyn ReactiveTable) -> Result<()> {
        let columns = table.column_ids();
        for row in table.row_indices() {
            self.encode_add(row);
            let values = self.mapped_values(table, row, &columns)?;
            self.encode_update(row, &values);
        }
        Ok(())
    }

    fn mapped_values(
        &self,
        table: &dyn ReactiveTable,
        row: RowIndex,
        columns: &[ColumnId],
    ) -> Result<Vec<(ColumnId, Value)>> {
        let mut values = Vec::new();
        for column in columns {
            if self.fields.field(column).is_some() {
                values.push((column.clone(), table.get_value(column, row)?));
            }
        }
        Ok(values)
    }
}

impl core::fmt::Debug for DeltaEncoder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeltaEncoder")
            .field("fields", &self.fields.len())
            .field("pending", &self.buffer.len())
            .finish()
    }
}
