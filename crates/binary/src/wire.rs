//! Wire primitives of the delta format.
//!
//! A stream is a sequence of tagged fields. Each tag is a varint holding
//! `(field << 3) | wire_type`:
//!
//! ```text
//! wire type  payload
//! 0 varint   LEB128, signed integers zigzag-encoded
//! 1 fixed64  8 bytes little-endian
//! 2 bytes    varint length, then the bytes
//! 3 start    opens a group, closed by an end marker with the same field
//! 4 end      closes a group
//! 5 fixed32  4 bytes little-endian
//! ```
//!
//! A record is one group at the top level whose field is the operation
//! (`ADD_FIELD`, `UPDATE_FIELD`, `DELETE_FIELD`). The group holds the
//! sender's row id under `ROW_ID_FIELD` followed by one field per column.

use bytes::{BufMut, Bytes, BytesMut};
use ripple_core::{DataType, Decimal, Uuid, Value};

use crate::error::DecodeError;

/// Top-level field of an `Add` record.
pub const ADD_FIELD: u32 = 1;
/// Top-level field of an `Update` record.
pub const UPDATE_FIELD: u32 = 2;
/// Top-level field of a `Delete` record.
pub const DELETE_FIELD: u32 = 3;
/// Field carrying the sender's row id inside a record.
pub const ROW_ID_FIELD: u32 = 8191;
/// Highest field number a tag can hold.
pub const MAX_FIELD: u32 = (1 << 29) - 1;

const MAX_VARINT_LEN: usize = 10;
const DECIMAL_LEN: usize = 17;
const GUID_LEN: usize = 16;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(DecodeError::InvalidWireType(other)),
        }
    }
}

/// A decoded field payload, before interpretation by a column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    Bytes(Bytes),
}

#[inline]
pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

pub fn put_varint(buf: &mut BytesMut, mut v: u64) {
    while v >= 0x80 {
        buf.put_u8((v as u8) | 0x80);
        v >>= 7;
    }
    buf.put_u8(v as u8);
}

#[inline]
pub fn put_tag(buf: &mut BytesMut, field: u32, wire_type: WireType) {
    put_varint(buf, ((field as u64) << 3) | wire_type as u64);
}

fn put_bytes(buf: &mut BytesMut, field: u32, data: &[u8]) {
    put_tag(buf, field, WireType::LengthDelimited);
    put_varint(buf, data.len() as u64);
    buf.put_slice(data);
}

/// Writes `value` as field `field`, choosing the wire type from the value's
/// own type.
pub fn put_value(buf: &mut BytesMut, field: u32, value: &Value) {
    match value {
        Value::Boolean(v) => {
            put_tag(buf, field, WireType::Varint);
            put_varint(buf, *v as u64);
        }
        Value::Byte(v) => {
            put_tag(buf, field, WireType::Varint);
            put_varint(buf, *v as u64);
        }
        Value::Char(v) => {
            put_tag(buf, field, WireType::Varint);
            put_varint(buf, *v as u64);
        }
        Value::Int16(v) => {
            put_tag(buf, field, WireType::Varint);
            put_varint(buf, zigzag_encode(*v as i64));
        }
        Value::Int32(v) => {
            put_tag(buf, field, WireType::Varint);
            put_varint(buf, zigzag_encode(*v as i64));
        }
        Value::Int64(v) | Value::Timestamp(v) | Value::Duration(v) => {
            put_tag(buf, field, WireType::Varint);
            put_varint(buf, zigzag_encode(*v));
        }
        Value::Float32(v) => {
            put_tag(buf, field, WireType::Fixed32);
            buf.put_u32_le(v.to_bits());
        }
        Value::Float64(v) => {
            put_tag(buf, field, WireType::Fixed64);
            buf.put_u64_le(v.to_bits());
        }
        Value::Decimal(d) => {
            let mut raw = [0u8; DECIMAL_LEN];
            raw[..16].copy_from_slice(&d.mantissa().to_le_bytes());
            raw[16] = d.scale();
            put_bytes(buf, field, &raw);
        }
        Value::String(s) => put_bytes(buf, field, s.as_bytes()),
        Value::Guid(g) => put_bytes(buf, field, g.as_bytes()),
    }
}

/// Interprets a wire payload as a value of the local column type.
///
/// Returns `None` when the payload does not fit the type: wrong wire type,
/// out-of-range integer, invalid UTF-8 or character, or a malformed decimal
/// or guid.
pub fn decode_value(data_type: DataType, wire: &WireValue) -> Option<Value> {
    match (data_type, wire) {
        (DataType::Boolean, WireValue::Varint(v)) => match v {
            0 => Some(Value::Boolean(false)),
            1 => Some(Value::Boolean(true)),
            _ => None,
        },
        (DataType::Byte, WireValue::Varint(v)) => u8::try_from(*v).ok().map(Value::Byte),
        (DataType::Char, WireValue::Varint(v)) => u32::try_from(*v)
            .ok()
            .and_then(char::from_u32)
            .map(Value::Char),
        (DataType::Int16, WireValue::Varint(v)) => {
            i16::try_from(zigzag_decode(*v)).ok().map(Value::Int16)
        }
        (DataType::Int32, WireValue::Varint(v)) => {
            i32::try_from(zigzag_decode(*v)).ok().map(Value::Int32)
        }
        (DataType::Int64, WireValue::Varint(v)) => Some(Value::Int64(zigzag_decode(*v))),
        (DataType::Timestamp, WireValue::Varint(v)) => Some(Value::Timestamp(zigzag_decode(*v))),
        (DataType::Duration, WireValue::Varint(v)) => Some(Value::Duration(zigzag_decode(*v))),
        (DataType::Float32, WireValue::Fixed32(bits)) => Some(Value::Float32(f32::from_bits(*bits))),
        (DataType::Float64, WireValue::Fixed64(bits)) => Some(Value::Float64(f64::from_bits(*bits))),
        (DataType::Decimal, WireValue::Bytes(raw)) if raw.len() == DECIMAL_LEN => {
            let mut mantissa = [0u8; 16];
            mantissa.copy_from_slice(&raw[..16]);
            Decimal::new(i128::from_le_bytes(mantissa), raw[16])
                .ok()
                .map(Value::Decimal)
        }
        (DataType::String, WireValue::Bytes(raw)) => core::str::from_utf8(raw)
            .ok()
            .map(|s| Value::String(s.into())),
        (DataType::Guid, WireValue::Bytes(raw)) if raw.len() == GUID_LEN => {
            Uuid::from_slice(raw).ok().map(Value::Guid)
        }
        _ => None,
    }
}

/// Cursor over an input buffer.
///
/// Every read fails with `DecodeError::Truncated` when the input ends early,
/// so a streaming caller can retry once more bytes have arrived.
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the number of bytes consumed.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = *self.data.get(self.pos).ok_or(DecodeError::Truncated)?;
            self.pos += 1;
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(DecodeError::VarintOverflow);
            }
            value |= ((byte & 0x7f) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::VarintOverflow)
    }

    pub fn read_tag(&mut self) -> Result<(u32, WireType), DecodeError> {
        let tag = self.read_varint()?;
        let wire_type = WireType::try_from((tag & 0x7) as u8)?;
        let field = tag >> 3;
        if field == 0 || field > MAX_FIELD as u64 {
            return Err(DecodeError::InvalidField(field));
        }
        Ok((field as u32, wire_type))
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::Truncated)?;
        let slice = self.data.get(self.pos..end).ok_or(DecodeError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    /// Reads the payload of a non-group field.
    pub fn read_value(&mut self, wire_type: WireType) -> Result<WireValue, DecodeError> {
        match wire_type {
            WireType::Varint => self.read_varint().map(WireValue::Varint),
            WireType::Fixed64 => {
                let raw = self.read_slice(8)?;
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(raw);
                Ok(WireValue::Fixed64(u64::from_le_bytes(bytes)))
            }
            WireType::Fixed32 => {
                let raw = self.read_slice(4)?;
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(raw);
                Ok(WireValue::Fixed32(u32::from_le_bytes(bytes)))
            }
            WireType::LengthDelimited => {
                let len = usize::try_from(self.read_varint()?).map_err(|_| DecodeError::Truncated)?;
                Ok(WireValue::Bytes(Bytes::copy_from_slice(self.read_slice(len)?)))
            }
            WireType::StartGroup | WireType::EndGroup => {
                Err(DecodeError::InvalidWireType(wire_type as u8))
            }
        }
    }

    /// Skips a field whose tag has already been read, including nested
    /// groups.
    pub fn skip(&mut self, field: u32, wire_type: WireType) -> Result<(), DecodeError> {
        match wire_type {
            WireType::StartGroup => loop {
                let (inner, inner_type) = self.read_tag()?;
                if inner_type == WireType::EndGroup {
                    if inner == field {
                        return Ok(());
                    }
                    return Err(DecodeError::UnexpectedEndGroup { field: inner });
                }
                self.skip(inner, inner_type)?;
            },
            WireType::EndGroup => Err(DecodeError::UnexpectedEndGroup { field }),
            other => self.read_value(other).map(|_| ()),
        }
    }
}
