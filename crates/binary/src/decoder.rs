//! Streaming delta decoder.
//!
//! Bytes arrive in arbitrary chunks. `feed` appends them and `next_record`
//! yields each record once it is complete, leaving a partial record
//! buffered until the rest arrives.

use alloc::vec::Vec;
use bytes::{Buf, BytesMut};
use tracing::{trace, warn};

use crate::error::DecodeError;
use crate::wire::{
    WireReader, WireType, WireValue, ADD_FIELD, DELETE_FIELD, ROW_ID_FIELD, UPDATE_FIELD,
};

/// The operation of a delta record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOp {
    Add,
    Update,
    Delete,
}

impl DeltaOp {
    fn from_field(field: u32) -> Option<Self> {
        match field {
            ADD_FIELD => Some(DeltaOp::Add),
            UPDATE_FIELD => Some(DeltaOp::Update),
            DELETE_FIELD => Some(DeltaOp::Delete),
            _ => None,
        }
    }
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRecord {
    pub op: DeltaOp,
    /// The sender's row id.
    pub row: u64,
    /// Column fields in stream order, not yet interpreted.
    pub fields: Vec<(u32, WireValue)>,
    /// Fields inside the record that could not be read as a value.
    pub skipped: usize,
}

enum Parsed {
    Record(DeltaRecord),
    Dropped,
}

fn parse_record(reader: &mut WireReader<'_>) -> Result<Parsed, DecodeError> {
    let (field, wire_type) = reader.read_tag()?;
    let op = match (DeltaOp::from_field(field), wire_type) {
        (Some(op), WireType::StartGroup) => op,
        (_, WireType::EndGroup) => return Err(DecodeError::UnexpectedEndGroup { field }),
        _ => {
            reader.skip(field, wire_type)?;
            trace!(field, "skipped unknown top-level field");
            return Ok(Parsed::Dropped);
        }
    };

    let mut row = None;
    let mut fields = Vec::new();
    let mut skipped = 0;
    loop {
        let (inner, inner_type) = reader.read_tag()?;
        match inner_type {
            WireType::EndGroup if inner == field => break,
            WireType::EndGroup => return Err(DecodeError::UnexpectedEndGroup { field: inner }),
            WireType::StartGroup => {
                reader.skip(inner, inner_type)?;
                skipped += 1;
            }
            WireType::Varint if inner == ROW_ID_FIELD => {
                row = Some(reader.read_varint()?);
            }
            _ if inner == ROW_ID_FIELD => {
                reader.skip(inner, inner_type)?;
                skipped += 1;
            }
            _ => fields.push((inner, reader.read_value(inner_type)?)),
        }
    }

    match row {
        Some(row) => Ok(Parsed::Record(DeltaRecord {
            op,
            row,
            fields,
            skipped,
        })),
        None => {
            warn!(?op, "dropped delta record without row id");
            Ok(Parsed::Dropped)
        }
    }
}

/// Incremental decoder over a byte stream.
#[derive(Debug, Default)]
pub struct DeltaDecoder {
    buffer: BytesMut,
    dropped: usize,
}

impl DeltaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the number of buffered bytes not yet decoded.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the number of top-level entries discarded so far: unknown
    /// fields and records without a row id.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Decodes the next complete record.
    ///
    /// Returns `Ok(None)` when the buffer holds no complete record. An error
    /// means the stream is corrupt and cannot be resynchronised.
    pub fn next_record(&mut self) -> Result<Option<DeltaRecord>, DecodeError> {
        loop {
            if self.buffer.is_empty() {
                return Ok(None);
            }
            let mut reader = WireReader::new(&self.buffer);
            let parsed = match parse_record(&mut reader) {
                Ok(parsed) => parsed,
                Err(DecodeError::Truncated) => return Ok(None),
                Err(e) => return Err(e),
            };
            let consumed = reader.position();
            self.buffer.advance(consumed);
            match parsed {
                Parsed::Record(record) => return Ok(Some(record)),
                Parsed::Dropped => self.dropped += 1,
            }
        }
    }
}

/// Decodes a complete buffer.
///
/// Fails with `Truncated` when `data` ends inside a record.
pub fn decode_all(data: &[u8]) -> Result<Vec<DeltaRecord>, DecodeError> {
    let mut decoder = DeltaDecoder::new();
    decoder.feed(data);
    let mut records = Vec::new();
    while let Some(record) = decoder.next_record()? {
        records.push(record);
    }
    if decoder.buffered() > 0 {
        return Err(DecodeError::Truncated);
    }
    Ok(records)
}
