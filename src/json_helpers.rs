//! JSON conversion of backend rows.
//!
//! Non-finite doubles have no JSON number form, so they are written as the strings
//! `NaN`, `Infinity` and `-Infinity` and accepted back in either form.
//! Decimals are written as strings to keep their exact digits.

use crate::error::TideError;
use crate::schema::{DataType, TableMetadata};
use crate::value::timestamp::DEFAULT_TIMESTAMP;
use crate::value::{Row, Value};
use rust_decimal::Decimal;
use serde::Deserializer;
use serde_json::{Map, Number, Value as Json};

/// Deserialize an `f64` from a JSON number or one of `NaN`, `Infinity`, `-Infinity`.
///
/// # Errors
///
/// Fails for any other input.
pub fn deserialize_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct F64Visitor;

    impl<'de> Visitor<'de> for F64Visitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or one of NaN, Infinity, -Infinity")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
            Ok(value)
        }

        #[allow(clippy::cast_precision_loss)]
        fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
            Ok(value as f64)
        }

        #[allow(clippy::cast_precision_loss)]
        fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
            match value {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                _ => Err(de::Error::invalid_value(
                    de::Unexpected::Str(value),
                    &"NaN, Infinity, or -Infinity",
                )),
            }
        }
    }

    deserializer.deserialize_any(F64Visitor)
}

fn double_to_json(v: f64) -> Json {
    match Number::from_f64(v) {
        Some(n) => Json::Number(n),
        None if v.is_nan() => Json::String("NaN".to_string()),
        None if v > 0.0 => Json::String("Infinity".to_string()),
        None => Json::String("-Infinity".to_string()),
    }
}

/// Storage value → JSON.
#[must_use]
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(v) => Json::Number((*v).into()),
        Value::Double(v) => double_to_json(*v),
        Value::Decimal(d) => Json::String(d.to_string()),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::Array(b.iter().map(|&byte| Json::from(byte)).collect()),
        Value::Guid(g) => Json::String(g.to_string()),
        Value::DateTime(dt) => Json::String(dt.format(DEFAULT_TIMESTAMP).to_string()),
        Value::DateTimeOffset(dt) => Json::String(dt.to_rfc3339()),
    }
}

/// Row → JSON object keyed by column name.
#[must_use]
pub fn row_to_json(row: &Row) -> Json {
    Json::Object(
        row.iter()
            .map(|(column, value)| (column.clone(), value_to_json(value)))
            .collect::<Map<String, Json>>(),
    )
}

/// JSON object → row, using `metadata` to restore column types.
///
/// Keys the metadata does not know are read by JSON type alone. Temporal and GUID
/// columns come back as text, the same form the write path produces.
///
/// # Errors
///
/// Returns [`TideError::InvalidArgument`] if `json` is not an object, or a
/// conversion error naming the column whose value does not fit its type.
pub fn row_from_json(json: &Json, metadata: &TableMetadata) -> Result<Row, TideError> {
    let object = json
        .as_object()
        .ok_or_else(|| TideError::InvalidArgument("row JSON must be an object".to_string()))?;
    let mut row = Row::new();
    for (key, value) in object {
        let data_type = metadata.column(key).map(|(_, c)| c.data_type);
        row.insert(key.clone(), json_to_value(key, value, data_type)?);
    }
    Ok(row)
}

fn json_to_value(column: &str, json: &Json, data_type: Option<DataType>) -> Result<Value, TideError> {
    let mismatch = || TideError::conversion(column, format!("unexpected JSON value {json}"));
    Ok(match (data_type, json) {
        (_, Json::Null) => Value::Null,
        (Some(DataType::Double), _) => {
            Value::Double(deserialize_f64(json).map_err(|e| TideError::conversion(column, e.to_string()))?)
        }
        (Some(DataType::Decimal), Json::String(s)) => Value::Decimal(
            s.parse::<Decimal>()
                .map_err(|e| TideError::conversion(column, format!("invalid decimal '{s}': {e}")))?,
        ),
        (Some(DataType::Decimal), Json::Number(n)) => Value::Decimal(
            n.to_string()
                .parse::<Decimal>()
                .map_err(|e| TideError::conversion(column, format!("invalid decimal {n}: {e}")))?,
        ),
        (Some(DataType::Blob), Json::Array(items)) => Value::Bytes(
            items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()).ok_or_else(mismatch))
                .collect::<Result<Vec<u8>, TideError>>()?,
        ),
        (_, Json::Bool(b)) => Value::Bool(*b),
        (_, Json::Number(n)) => match n.as_i64() {
            Some(v) => Value::Integer(v),
            None => Value::Double(n.as_f64().ok_or_else(mismatch)?),
        },
        (_, Json::String(s)) => Value::Text(s.clone()),
        _ => return Err(mismatch()),
    })
}
