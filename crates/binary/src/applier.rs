//! Applies decoded delta records to a local table.

use ripple_core::{Result, RowIndex};
use ripple_storage::{ReactiveTable, Table, TableReplica};
use tracing::{debug, warn};

use crate::decoder::{DeltaOp, DeltaRecord};
use crate::field_map::FieldMap;
use crate::wire::decode_value;

/// Outcome of applying one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Applied {
    /// The local row the record targeted, if it was mapped.
    pub local_row: Option<RowIndex>,
    pub fields_applied: usize,
    pub fields_skipped: usize,
}

/// Receiving end of a delta stream.
///
/// Field values are interpreted by the declared type of the local column
/// they map to. A field with no mapping, no local column, or a payload that
/// does not fit the column type is skipped.
pub struct DeltaApplier {
    replica: TableReplica,
    fields: FieldMap,
}

impl DeltaApplier {
    pub fn new(table: Table, fields: FieldMap) -> Self {
        Self {
            replica: TableReplica::new(table),
            fields,
        }
    }

    #[inline]
    pub fn table(&self) -> &Table {
        self.replica.table()
    }

    #[inline]
    pub fn replica(&self) -> &TableReplica {
        &self.replica
    }

    pub fn apply(&mut self, record: &DeltaRecord) -> Result<Applied> {
        match record.op {
            DeltaOp::Add => Ok(Applied {
                local_row: Some(self.replica.apply_add(record.row)),
                fields_applied: 0,
                fields_skipped: record.skipped + record.fields.len(),
            }),
            DeltaOp::Delete => {
                let local_row = self.replica.local_row(record.row);
                self.replica.apply_delete(record.row)?;
                Ok(Applied {
                    local_row,
                    ..Applied::default()
                })
            }
            DeltaOp::Update => Ok(self.apply_update(record)),
        }
    }

    fn apply_update(&mut self, record: &DeltaRecord) -> Applied {
        let mut applied = Applied {
            local_row: self.replica.local_row(record.row),
            fields_applied: 0,
            fields_skipped: record.skipped,
        };
        if applied.local_row.is_none() {
            warn!(table = self.table().name(), remote = record.row, "update for unknown row");
            applied.fields_skipped += record.fields.len();
            return applied;
        }

        for (field, wire) in &record.fields {
            let Some(column) = self.fields.column(*field).cloned() else {
                debug!(field, "skipped unmapped field");
                applied.fields_skipped += 1;
                continue;
            };
            let value = self
                .replica
                .table()
                .column_type(&column)
                .ok()
                .and_then(|data_type| decode_value(data_type, wire));
            let Some(value) = value else {
                debug!(field, column = &*column, "skipped field that does not fit its column");
                applied.fields_skipped += 1;
                continue;
            };
            match self.replica.apply_update(record.row, &column, value) {
                Ok(_) => applied.fields_applied += 1,
                Err(error) => {
                    warn!(%error, column = &*column, "rejected replicated write");
                    applied.fields_skipped += 1;
                }
            }
        }
        applied
    }
}

impl core::fmt::Debug for DeltaApplier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeltaApplier")
            .field("replica", &self.replica)
            .field("fields", &self.fields.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode_all;
    use crate::encoder::DeltaEncoder;
    use crate::wire::WireValue;
    use alloc::string::String;
    use alloc::vec;
    use ripple_core::schema::SchemaBuilder;
    use ripple_core::{DataType, Decimal, Uuid, Value};
    use ripple_storage::ReactiveTableExt;

    fn every_type_table(name: &str) -> Table {
        let mut builder = SchemaBuilder::new(name).unwrap();
        for dt in DataType::ALL {
            builder = builder.add_column(alloc::format!("{:?}", dt), dt).unwrap();
        }
        Table::new(builder.build().unwrap())
    }

    fn sample_values() -> vec::Vec<Value> {
        vec![
            Value::Boolean(true),
            Value::Byte(7),
            Value::Char('λ'),
            Value::Int16(-300),
            Value::Int32(123_456),
            Value::Int64(-9_000_000_000),
            Value::Float32(0.5),
            Value::Float64(3.25),
            Value::Decimal(Decimal::new(12_345, 3).unwrap()),
            Value::from("tick"),
            Value::Timestamp(1_700_000_000_123),
            Value::Duration(250),
            Value::Guid(Uuid::from_bytes([0xab; 16])),
        ]
    }

    fn value_for(dt: DataType, row: usize) -> Value {
        let base = sample_values().into_iter().find(|v| v.data_type() == dt).unwrap();
        match base {
            Value::Int32(v) => Value::Int32(v + row as i32),
            Value::String(s) => Value::String(alloc::format!("{}-{}", s, row)),
            other => other,
        }
    }

    #[test]
    fn test_full_state_round_trip_with_different_row_ids() {
        let source = every_type_table("source");
        let columns = source.column_ids();
        for row in 0..4 {
            source.add_row();
            for dt in DataType::ALL {
                source
                    .set_value(&alloc::format!("{:?}", dt), row, value_for(dt, row))
                    .unwrap();
            }
        }
        source.delete_row(0).unwrap();
        source.delete_row(2).unwrap();

        let fields = FieldMap::sequential(columns.iter()).unwrap();
        let mut encoder = DeltaEncoder::new(fields.clone());
        encoder.encode_replay(&source).unwrap();

        let target = every_type_table("target");
        // Occupy local ids so remote ids cannot line up by accident.
        for _ in 0..5 {
            target.add_row();
        }
        let mut applier = DeltaApplier::new(target.clone(), fields);
        for record in decode_all(&encoder.take()).unwrap() {
            let applied = applier.apply(&record).unwrap();
            assert_eq!(applied.fields_skipped, 0);
        }

        assert_eq!(applier.replica().len(), 2);
        for remote in [1usize, 3] {
            let local = applier.replica().local_row(remote as u64).unwrap();
            assert!(local >= 5);
            for column in &columns {
                assert_eq!(
                    target.get_value(column, local).unwrap(),
                    source.get_value(column, remote).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_delete_discards_mapping() {
        let target = every_type_table("target");
        let mut applier = DeltaApplier::new(target.clone(), FieldMap::new());
        let add = DeltaRecord {
            op: DeltaOp::Add,
            row: 42,
            fields: vec::Vec::new(),
            skipped: 0,
        };
        let local = applier.apply(&add).unwrap().local_row;
        assert_eq!(local, Some(0));

        let delete = DeltaRecord {
            op: DeltaOp::Delete,
            ..add.clone()
        };
        assert_eq!(applier.apply(&delete).unwrap().local_row, Some(0));
        assert_eq!(target.row_count(), 0);
        assert!(applier.replica().is_empty());
        assert_eq!(applier.apply(&delete).unwrap().local_row, None);
    }

    #[test]
    fn test_bad_fields_are_skipped_not_fatal() {
        let target = every_type_table("target");
        let mut fields = FieldMap::new();
        fields.insert("Int32", 1).unwrap().insert("String", 2).unwrap();
        fields.insert("missing", 3).unwrap();
        let mut applier = DeltaApplier::new(target.clone(), fields);
        applier
            .apply(&DeltaRecord {
                op: DeltaOp::Add,
                row: 1,
                fields: vec::Vec::new(),
                skipped: 0,
            })
            .unwrap();

        let update = DeltaRecord {
            op: DeltaOp::Update,
            row: 1,
            fields: vec![
                // Wrong wire type for Int32.
                (1, WireValue::Fixed32(0)),
                (2, WireValue::Bytes(bytes::Bytes::from_static(b"ok"))),
                // Mapped, but not a local column.
                (3, WireValue::Varint(1)),
                // Unmapped.
                (9, WireValue::Varint(1)),
            ],
            skipped: 1,
        };
        let applied = applier.apply(&update).unwrap();
        assert_eq!(applied.fields_applied, 1);
        assert_eq!(applied.fields_skipped, 4);
        assert_eq!(target.get::<String>("String", 0).unwrap(), "ok");
        assert_eq!(target.get::<i32>("Int32", 0).unwrap(), 0);

        let unknown = DeltaRecord { row: 99, ..update };
        let applied = applier.apply(&unknown).unwrap();
        assert_eq!(applied.local_row, None);
        assert_eq!(applied.fields_applied, 0);
        assert_eq!(applied.fields_skipped, 5);
    }
}
