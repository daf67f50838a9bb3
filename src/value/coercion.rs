//! Value coercion engine.
//!
//! Converts a [`PropertyValue`] to its storage [`Value`] (write path) and back
//! (read path), keyed by the column's declared [`DataType`].
//!
//! | Column type            | Write                                   | Read accepts                         |
//! |------------------------|-----------------------------------------|--------------------------------------|
//! | Varchar / Nvarchar     | text (length-checked), enum name, GUID  | text                                 |
//! | Enum                   | enum name, text                         | text                                 |
//! | TinyInt / Int / Long   | range-checked integer, bool, ordinal    | integer, bool, integral decimal      |
//! | Boolean                | 0 / 1                                   | bool, integer                        |
//! | Decimal                | decimal, float, integer                 | decimal, integer, double, text       |
//! | Double                 | double (explicit widening)              | double, integer, decimal             |
//! | DateTime(Offset)       | backend-formatted text                  | native timestamp, text               |
//! | Blob                   | bytes                                   | bytes                                |
//! | Guid                   | 36-character text                       | native GUID, 16 bytes, text          |

use super::property::exact_f64;
use super::timestamp::TimestampFormat;
use super::types::{PropertyValue, Value};
use crate::error::TideError;
use crate::schema::{ColumnDefinition, DataType};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Convert a property value to its storage representation.
///
/// # Errors
///
/// - [`TideError::UnsupportedDataType`] if the property kind has no mapping to the column type
/// - [`TideError::ConversionFailure`] if the value does not fit (range, length, format)
pub fn to_storage(
    column: &ColumnDefinition,
    value: PropertyValue,
    timestamps: &dyn TimestampFormat,
) -> Result<Value, TideError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match column.data_type {
        DataType::Varchar | DataType::Nvarchar => match value {
            PropertyValue::String(s) => check_length(column, s).map(Value::Text),
            PropertyValue::Enum(e) => check_length(column, e.name).map(Value::Text),
            PropertyValue::Guid(g) => check_length(column, g.hyphenated().to_string()).map(Value::Text),
            other => Err(unsupported(column, &other)),
        },
        DataType::Enum => match value {
            PropertyValue::Enum(e) => check_length(column, e.name).map(Value::Text),
            PropertyValue::String(s) => check_length(column, s).map(Value::Text),
            other => Err(unsupported(column, &other)),
        },
        DataType::TinyInt => integer_to_storage(column, &value, 0, i128::from(u8::MAX)),
        DataType::Int => integer_to_storage(column, &value, i128::from(i32::MIN), i128::from(i32::MAX)),
        DataType::Long => integer_to_storage(column, &value, i128::from(i64::MIN), i128::from(i64::MAX)),
        DataType::Boolean => match value {
            PropertyValue::Bool(b) => Ok(Value::Integer(i64::from(b))),
            other => Err(unsupported(column, &other)),
        },
        DataType::Decimal => {
            let d = match value {
                PropertyValue::Decimal(d) => d,
                PropertyValue::F64(v) => Decimal::try_from(v).map_err(|e| {
                    TideError::conversion(&column.name, format!("{v} is not representable as decimal: {e}"))
                })?,
                PropertyValue::F32(v) => Decimal::try_from(v).map_err(|e| {
                    TideError::conversion(&column.name, format!("{v} is not representable as decimal: {e}"))
                })?,
                ref other => match other.as_integer() {
                    Some(v) => i64::try_from(v).map(Decimal::from).map_err(|_| {
                        TideError::conversion(&column.name, format!("{v} is out of range for decimal"))
                    })?,
                    None => return Err(unsupported(column, other)),
                },
            };
            check_decimal(column, d).map(Value::Decimal)
        }
        DataType::Double => match value {
            PropertyValue::F64(v) => Ok(Value::Double(v)),
            PropertyValue::F32(v) => Ok(Value::Double(f64::from(v))),
            PropertyValue::Decimal(d) => d
                .to_f64()
                .map(Value::Double)
                .ok_or_else(|| TideError::conversion(&column.name, format!("{d} is out of range for double"))),
            ref other => match other.as_integer() {
                Some(v) => exact_f64(v)
                    .map(Value::Double)
                    .ok_or_else(|| TideError::conversion(&column.name, format!("{v} cannot be represented exactly as double"))),
                None => Err(unsupported(column, other)),
            },
        },
        DataType::DateTime => match value {
            PropertyValue::DateTime(dt) => Ok(Value::Text(timestamps.timestamp(&dt))),
            other => Err(unsupported(column, &other)),
        },
        DataType::DateTimeOffset => match value {
            PropertyValue::DateTimeOffset(dt) => Ok(Value::Text(timestamps.timestamp_offset(&dt))),
            other => Err(unsupported(column, &other)),
        },
        DataType::Blob => match value {
            PropertyValue::Bytes(b) => Ok(Value::Bytes(b)),
            other => Err(unsupported(column, &other)),
        },
        DataType::Guid => match value {
            PropertyValue::Guid(g) => Ok(Value::Text(g.hyphenated().to_string())),
            PropertyValue::String(ref s) => Uuid::parse_str(s)
                .map(|g| Value::Text(g.hyphenated().to_string()))
                .map_err(|e| TideError::conversion(&column.name, format!("invalid GUID string '{s}': {e}"))),
            other => Err(unsupported(column, &other)),
        },
    }
}

/// Check a caller-supplied storage value against `column` and normalize it the
/// way [`to_storage`] would (e.g. for update maps that bypass a record).
///
/// Besides the kinds [`to_storage`] takes, this accepts `0`/`1` for Boolean
/// columns, timestamp text for temporal columns and 16 bytes for GUID columns.
///
/// # Errors
///
/// - [`TideError::ConversionFailure`] for null in a non-nullable column, or a
///   value that does not fit (range, length, scale, format)
/// - [`TideError::UnsupportedDataType`] if the value kind has no mapping to the column type
pub fn check_storage(
    column: &ColumnDefinition,
    value: Value,
    timestamps: &dyn TimestampFormat,
) -> Result<Value, TideError> {
    let property = match (column.data_type, value) {
        (_, Value::Null) if !column.nullable => {
            return Err(TideError::conversion(&column.name, "column does not accept null"));
        }
        (DataType::Boolean, Value::Integer(v)) => match v {
            0 => PropertyValue::Bool(false),
            1 => PropertyValue::Bool(true),
            _ => return Err(TideError::conversion(&column.name, format!("{v} is not a boolean"))),
        },
        (DataType::DateTime, Value::Text(s)) => timestamps
            .parse_timestamp(&s)
            .map(PropertyValue::DateTime)
            .ok_or_else(|| TideError::conversion(&column.name, format!("invalid timestamp '{s}'")))?,
        (DataType::DateTimeOffset, Value::Text(s)) => timestamps
            .parse_timestamp_offset(&s)
            .map(PropertyValue::DateTimeOffset)
            .ok_or_else(|| TideError::conversion(&column.name, format!("invalid timestamp '{s}'")))?,
        (DataType::Guid, bytes @ Value::Bytes(_)) => PropertyValue::Guid(guid_from_storage(column, bytes)?),
        (_, other) => property_of(other),
    };
    to_storage(column, property, timestamps)
}

fn property_of(value: Value) -> PropertyValue {
    match value {
        Value::Null => PropertyValue::Null,
        Value::Bool(b) => PropertyValue::Bool(b),
        Value::Integer(v) => PropertyValue::I64(v),
        Value::Double(v) => PropertyValue::F64(v),
        Value::Decimal(d) => PropertyValue::Decimal(d),
        Value::Text(s) => PropertyValue::String(s),
        Value::Bytes(b) => PropertyValue::Bytes(b),
        Value::Guid(g) => PropertyValue::Guid(g),
        Value::DateTime(dt) => PropertyValue::DateTime(dt),
        Value::DateTimeOffset(dt) => PropertyValue::DateTimeOffset(dt),
    }
}

/// Convert a storage value returned by a backend to a property value.
///
/// The produced variant is canonical for the column type (`Int` → `I32`,
/// `TinyInt` → `U8`, `Long` → `I64`, ...); [`FromProperty`](crate::FromProperty)
/// then widens or narrows it into the field's declared type.
///
/// # Errors
///
/// - [`TideError::UnsupportedDataType`] if the storage kind has no mapping to the column type
/// - [`TideError::ConversionFailure`] if the value cannot be parsed or is out of range
pub fn from_storage(
    column: &ColumnDefinition,
    value: Value,
    timestamps: &dyn TimestampFormat,
) -> Result<PropertyValue, TideError> {
    if value.is_null() {
        return Ok(PropertyValue::Null);
    }

    match column.data_type {
        DataType::Varchar | DataType::Nvarchar | DataType::Enum => match value {
            Value::Text(s) => Ok(PropertyValue::String(s)),
            other => Err(unsupported_read(column, &other)),
        },
        DataType::TinyInt => {
            let v = integer_from_storage(column, value)?;
            u8::try_from(v)
                .map(PropertyValue::U8)
                .map_err(|_| TideError::conversion(&column.name, format!("{v} is out of range for TinyInt")))
        }
        DataType::Int => {
            let v = integer_from_storage(column, value)?;
            i32::try_from(v)
                .map(PropertyValue::I32)
                .map_err(|_| TideError::conversion(&column.name, format!("{v} is out of range for Int")))
        }
        DataType::Long => integer_from_storage(column, value).map(PropertyValue::I64),
        DataType::Boolean => match value {
            Value::Bool(b) => Ok(PropertyValue::Bool(b)),
            Value::Integer(v) => Ok(PropertyValue::Bool(v != 0)),
            other => Err(unsupported_read(column, &other)),
        },
        DataType::Decimal => match value {
            Value::Decimal(d) => Ok(PropertyValue::Decimal(d)),
            Value::Integer(v) => Ok(PropertyValue::Decimal(Decimal::from(v))),
            Value::Double(v) => Decimal::try_from(v)
                .map(PropertyValue::Decimal)
                .map_err(|e| TideError::conversion(&column.name, format!("{v} is not representable as decimal: {e}"))),
            Value::Text(ref s) => s
                .trim()
                .parse::<Decimal>()
                .map(PropertyValue::Decimal)
                .map_err(|e| TideError::conversion(&column.name, format!("invalid decimal '{s}': {e}"))),
            other => Err(unsupported_read(column, &other)),
        },
        DataType::Double => match value {
            Value::Double(v) => Ok(PropertyValue::F64(v)),
            Value::Integer(v) => exact_f64(i128::from(v))
                .map(PropertyValue::F64)
                .ok_or_else(|| TideError::conversion(&column.name, format!("{v} cannot be represented exactly as double"))),
            Value::Decimal(d) => d
                .to_f64()
                .map(PropertyValue::F64)
                .ok_or_else(|| TideError::conversion(&column.name, format!("{d} is out of range for double"))),
            other => Err(unsupported_read(column, &other)),
        },
        DataType::DateTime => match value {
            Value::DateTime(dt) => Ok(PropertyValue::DateTime(dt)),
            Value::DateTimeOffset(dt) => Ok(PropertyValue::DateTime(dt.naive_utc())),
            Value::Text(ref s) => timestamps
                .parse_timestamp(s)
                .map(PropertyValue::DateTime)
                .ok_or_else(|| TideError::conversion(&column.name, format!("invalid timestamp '{s}'"))),
            other => Err(unsupported_read(column, &other)),
        },
        DataType::DateTimeOffset => match value {
            Value::DateTimeOffset(dt) => Ok(PropertyValue::DateTimeOffset(dt)),
            Value::DateTime(dt) => Ok(PropertyValue::DateTimeOffset(dt.and_utc().fixed_offset())),
            Value::Text(ref s) => timestamps
                .parse_timestamp_offset(s)
                .map(PropertyValue::DateTimeOffset)
                .ok_or_else(|| TideError::conversion(&column.name, format!("invalid timestamp '{s}'"))),
            other => Err(unsupported_read(column, &other)),
        },
        DataType::Blob => match value {
            Value::Bytes(b) => Ok(PropertyValue::Bytes(b)),
            other => Err(unsupported_read(column, &other)),
        },
        DataType::Guid => guid_from_storage(column, value).map(PropertyValue::Guid),
    }
}

/// Normalize the three GUID representations a backend may return.
///
/// # Errors
///
/// Returns [`TideError::ConversionFailure`] for any other representation, a byte
/// sequence that is not 16 bytes long, or an unparsable string.
pub fn guid_from_storage(column: &ColumnDefinition, value: Value) -> Result<Uuid, TideError> {
    match value {
        Value::Guid(g) => Ok(g),
        Value::Bytes(ref b) => Uuid::from_slice(b).map_err(|_| {
            TideError::conversion(&column.name, format!("expected 16 GUID bytes, got {}", b.len()))
        }),
        Value::Text(ref s) => Uuid::parse_str(s.trim())
            .map_err(|e| TideError::conversion(&column.name, format!("invalid GUID string '{s}': {e}"))),
        other => Err(TideError::conversion(
            &column.name,
            format!("unrecognized GUID representation: {}", other.kind()),
        )),
    }
}

fn check_length(column: &ColumnDefinition, s: String) -> Result<String, TideError> {
    if let Some(max) = column.max_length {
        let len = s.chars().count();
        if len > max as usize {
            return Err(TideError::conversion(
                &column.name,
                format!("value of {len} characters exceeds max length {max}"),
            ));
        }
    }
    Ok(s)
}

/// Scale at most `precision`, integer digits at most `max_length - precision`.
fn check_decimal(column: &ColumnDefinition, d: Decimal) -> Result<Decimal, TideError> {
    let normalized = d.normalize();
    if let Some(scale) = column.precision {
        if normalized.scale() > scale {
            return Err(TideError::conversion(
                &column.name,
                format!("{d} has more than {scale} decimal places"),
            ));
        }
        if let Some(total) = column.max_length {
            let integer_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len();
            let allowed = total.saturating_sub(scale) as usize;
            if integer_digits > allowed {
                return Err(TideError::conversion(
                    &column.name,
                    format!("{d} has more than {allowed} integer digits"),
                ));
            }
        }
    }
    Ok(d)
}

fn integer_to_storage(
    column: &ColumnDefinition,
    value: &PropertyValue,
    min: i128,
    max: i128,
) -> Result<Value, TideError> {
    let v = match value {
        PropertyValue::Bool(b) => i128::from(*b),
        PropertyValue::Enum(e) => i128::from(e.ordinal),
        other => other.as_integer().ok_or_else(|| unsupported(column, other))?,
    };
    if v < min || v > max {
        return Err(TideError::conversion(
            &column.name,
            format!("{v} is out of range for {}", column.data_type),
        ));
    }
    i64::try_from(v)
        .map(Value::Integer)
        .map_err(|_| TideError::conversion(&column.name, format!("{v} is out of range for {}", column.data_type)))
}

fn integer_from_storage(column: &ColumnDefinition, value: Value) -> Result<i64, TideError> {
    match value {
        Value::Integer(v) => Ok(v),
        Value::Bool(b) => Ok(i64::from(b)),
        Value::Decimal(d) if d.fract().is_zero() => d
            .to_i64()
            .ok_or_else(|| TideError::conversion(&column.name, format!("{d} is out of range for {}", column.data_type))),
        other => Err(unsupported_read(column, &other)),
    }
}

fn unsupported(column: &ColumnDefinition, value: &PropertyValue) -> TideError {
    TideError::unsupported(
        column.data_type,
        format!("cannot store a {} property in column {}", value.kind(), column.name),
    )
}

fn unsupported_read(column: &ColumnDefinition, value: &Value) -> TideError {
    TideError::unsupported(
        column.data_type,
        format!("cannot read a {} value from column {}", value.kind(), column.name),
    )
}
