//! Column and bind values
//!
//! This module turns the bytes of a single column or bind into a [`Value`],
//! using the [`ColumnInfo`] that describes it. Three entry points cover the
//! three places values appear:
//!
//! - [`decode_column_value`] for row data, where LOB columns may carry
//!   prefetched content and REF CURSOR columns carry a nested describe
//! - [`decode_prime_value`] for output binds and the body of a column value
//! - [`value_from_raw`] for bind values in a request, which are plain CLR runs
//!
//! A value whose bytes do not convert to the declared type is kept as raw
//! bytes and logged, so an odd value never ends a proxied connection.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::ReadBuffer;
use crate::capabilities::Capabilities;
use crate::constants::{csfrm, OracleType};
use crate::error::Result;
use crate::statement::ColumnInfo;
use crate::types::{
    decode_binary_double, decode_binary_float, decode_datetime, decode_interval_ds,
    decode_interval_ym, decode_text, number_value, IntervalDs, IntervalYm, LobData, LobLocator,
    NumberValue, OracleDateTime, RefCursor, RowId, URowId,
};

/// Object frame type carrying a collection of nested frames
const OBJECT_COLLECTION: u8 = 0x88;
/// Control length marker followed by a fixed 4-byte length
const OBJECT_LONG_LENGTH: u32 = 0xFE;

/// A decoded column or bind value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// NULL, or a value the server did not send
    #[default]
    Null,
    /// Character data
    Text(String),
    /// RAW data, or a value that could not be converted
    Bytes(#[serde(serialize_with = "crate::record::as_hex")] Bytes),
    /// NUMBER with scale 0 and precision up to 18
    Integer(i64),
    /// NUMBER with scale 0 above the signed range
    Unsigned(u64),
    /// NUMBER with a positive or unconstrained scale
    Decimal(String),
    /// Floating point NUMBER, BINARY_FLOAT or BINARY_DOUBLE
    Float(f64),
    /// DATE or TIMESTAMP
    DateTime(OracleDateTime),
    /// INTERVAL YEAR TO MONTH
    IntervalYm(IntervalYm),
    /// INTERVAL DAY TO SECOND
    IntervalDs(IntervalDs),
    /// ROWID
    RowId(RowId),
    /// UROWID
    URowId(URowId),
    /// CLOB, BLOB or BFILE locator
    Lob(LobLocator),
    /// REF CURSOR
    Cursor(RefCursor),
    /// Object frame (XMLTYPE)
    Object(ObjectValue),
    /// Array bind
    Array(Vec<Value>),
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Unsigned(u) => i64::try_from(*u).ok(),
            Value::Decimal(s) => s.parse().ok(),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Try to get as a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::Unsigned(u) => Some(*u as f64),
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get as bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl From<NumberValue> for Value {
    fn from(value: NumberValue) -> Self {
        match value {
            NumberValue::Integer(i) => Value::Integer(i),
            NumberValue::Unsigned(u) => Value::Unsigned(u),
            NumberValue::Decimal(s) => Value::Decimal(s),
            NumberValue::Float(f) => Value::Float(f),
        }
    }
}

/// One row of a result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    /// Values in column order
    pub values: Vec<Value>,
}

impl Row {
    /// Create a row from values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Value at a column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A nested object frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectValue {
    /// Frame type
    pub obj_type: u8,
    /// Control length
    pub ctl: u32,
    /// Items of a collection frame
    pub items: Vec<ObjectItem>,
}

/// One item of a collection frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectItem {
    /// Item bytes
    #[serde(serialize_with = "crate::record::as_hex")]
    pub raw: Bytes,
    /// Nested frame that follows the item
    pub object: ObjectValue,
}

/// Read an object frame and its nested items
pub fn decode_object(buf: &mut ReadBuffer) -> Result<ObjectValue> {
    let obj_type = buf.read_u8()?;
    let ctl = buf.read_ub4()?;
    if ctl == OBJECT_LONG_LENGTH {
        buf.read_u32_be()?;
    }
    let mut object = ObjectValue {
        obj_type,
        ctl,
        items: Vec::new(),
    };
    if obj_type == OBJECT_COLLECTION {
        buf.skip_ub2()?;
        let count = buf.read_u16_be()?;
        for _ in 0..count {
            let raw = buf.read_clr()?;
            let nested = decode_object(buf)?;
            object.items.push(ObjectItem {
                raw,
                object: nested,
            });
        }
    }
    Ok(object)
}

/// Character set of character data in `col`
fn text_charset(col: &ColumnInfo, caps: &Capabilities) -> u16 {
    match col.charset_id {
        0 if col.charset_form == csfrm::NCHAR => caps.ncharset_id,
        0 => caps.charset_id,
        id => id,
    }
}

/// Keep the raw bytes when a conversion fails
fn or_raw<T>(result: Result<T>, raw: &Bytes, col: &ColumnInfo, into: impl FnOnce(T) -> Value) -> Value {
    match result {
        Ok(value) => into(value),
        Err(e) => {
            tracing::warn!(column = %col.name, data_type = col.data_type, error = %e, "keeping raw value");
            Value::Bytes(raw.clone())
        }
    }
}

/// Convert the CLR bytes of a value according to its declared type.
///
/// LOB and BFILE values become locators holding `raw`. Types without a
/// dedicated conversion are kept as bytes.
pub fn value_from_raw(col: &ColumnInfo, raw: &Bytes, caps: &Capabilities) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    let Some(ty) = col.oracle_type() else {
        return Value::Bytes(raw.clone());
    };
    match ty {
        OracleType::Nchar | OracleType::Char | OracleType::Long => {
            Value::Text(decode_text(raw, text_charset(col, caps)))
        }
        OracleType::Number => or_raw(number_value(raw, col.precision, col.scale), raw, col, Value::from),
        ty if ty.is_datetime() => or_raw(decode_datetime(raw), raw, col, Value::DateTime),
        OracleType::Clob | OracleType::Blob | OracleType::Bfile => {
            Value::Lob(LobLocator::new(ty, raw.clone(), col.charset_id))
        }
        OracleType::IbFloat => or_raw(decode_binary_float(raw), raw, col, |f| Value::Float(f as f64)),
        OracleType::IbDouble => or_raw(decode_binary_double(raw), raw, col, Value::Float),
        OracleType::IntervalYmDty => or_raw(decode_interval_ym(raw), raw, col, Value::IntervalYm),
        OracleType::IntervalDsDty => or_raw(decode_interval_ds(raw), raw, col, Value::IntervalDs),
        OracleType::Urowid => or_raw(URowId::from_bytes(raw), raw, col, Value::URowId),
        _ => Value::Bytes(raw.clone()),
    }
}

/// Decode a bind or column value body.
///
/// `udt` is set for values nested in an object, where LOB locators are
/// the value bytes themselves rather than a separate CLR.
pub fn decode_prime_value(
    buf: &mut ReadBuffer,
    col: &mut ColumnInfo,
    caps: &Capabilities,
    udt: bool,
) -> Result<Value> {
    col.raw = Bytes::new();

    if col.max_array_elems > 0 {
        let size = buf.read_ub4()?;
        col.max_array_elems = size;
        let mut elements = Vec::with_capacity(size as usize);
        for x in 0..size {
            let mut element = ColumnInfo {
                max_array_elems: 0,
                ..col.clone()
            };
            elements.push(decode_prime_value(buf, &mut element, caps, false)?);
            if x + 1 < size {
                buf.skip_ub2()?;
            }
        }
        return Ok(Value::Array(elements));
    }

    if col.is(OracleType::XmlType) {
        buf.skip_dlc()?;
        buf.skip(3)?;
        buf.skip_ub4()?;
        buf.skip(2)?;
    }
    if col.is(OracleType::Rowid) {
        return Ok(RowId::read(buf)?.map_or(Value::Null, Value::RowId));
    }
    if col.is(OracleType::Urowid) {
        return Ok(URowId::read(buf)?.map_or(Value::Null, Value::URowId));
    }
    if (col.is(OracleType::Nchar) || col.is(OracleType::Char)) && col.max_char_len == 0 {
        return Ok(Value::Null);
    }
    if col.is(OracleType::Raw) && col.max_len == 0 {
        return Ok(Value::Null);
    }

    let raw = buf.read_clr()?;
    col.raw = raw.clone();
    if raw.is_empty() {
        return Ok(Value::Null);
    }

    let value = match col.oracle_type() {
        Some(ty @ (OracleType::Clob | OracleType::Blob)) if !udt => {
            let locator = buf.read_clr()?;
            Value::Lob(LobLocator::new(ty, locator, col.charset_id))
        }
        Some(OracleType::Bfile) => {
            let locator = buf.read_clr()?;
            Value::Lob(LobLocator::new(OracleType::Bfile, locator, col.charset_id))
        }
        Some(OracleType::XmlType) => Value::Object(decode_object(buf)?),
        _ => value_from_raw(col, &raw, caps),
    };
    Ok(value)
}

/// Decode one column of a row data message.
///
/// A REF CURSOR column carries a nested describe, followed by an extra
/// UB2 when the statement is PL/SQL. A CLOB or BLOB column starts with
/// the prefetch length; a positive length is followed by the LOB size,
/// chunk size, character set for CLOBs, the prefetched data and the
/// locator. A zero length is a NULL LOB.
pub fn decode_column_value(
    buf: &mut ReadBuffer,
    col: &mut ColumnInfo,
    caps: &Capabilities,
    is_plsql: bool,
) -> Result<Value> {
    if col.is(OracleType::RefCursor) {
        let cursor = RefCursor::load(buf, caps)?;
        if is_plsql {
            buf.skip_ub2()?;
        }
        return Ok(Value::Cursor(cursor));
    }

    if col.is(OracleType::Clob) || col.is(OracleType::Blob) {
        let is_clob = col.is(OracleType::Clob);
        let max_size = buf.read_ub4()?;
        if max_size == 0 {
            col.raw = Bytes::new();
            return Ok(Value::Null);
        }
        let size = buf.read_ub8()?;
        let chunk_size = buf.read_ub4()?;
        if is_clob {
            let flag = buf.read_u8()?;
            col.charset_id = if flag == 1 { buf.read_ub2()? } else { 0 };
            col.charset_form = buf.read_u8()?;
            if col.charset_id == 0 {
                col.charset_id = if col.charset_form == csfrm::IMPLICIT {
                    caps.charset_id
                } else {
                    caps.ncharset_id
                };
            }
        }
        let data = buf.read_clr()?;
        col.raw = data.clone();
        let locator = buf.read_clr()?;

        let ty = if is_clob { OracleType::Clob } else { OracleType::Blob };
        let mut lob = LobLocator::new(ty, locator, col.charset_id);
        lob.size = Some(size);
        lob.chunk_size = Some(chunk_size);
        lob.data = Some(if is_clob {
            LobData::Text(decode_text(&data, col.charset_id))
        } else {
            LobData::Binary(data)
        });
        return Ok(Value::Lob(lob));
    }

    decode_prime_value(buf, col, caps, false)
}
