//! Storage values and property values.
//!
//! [`Value`] is what a storage backend sees in a row or value map.
//! [`PropertyValue`] is the dynamically typed view of a record's in-memory property.
//! The coercion engine converts between the two, keyed by the column's data type.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// A row returned by a backend, or a value map handed to one: column name → value.
pub type Row = BTreeMap<String, Value>;

/// Column name → value map used for inserts and updates.
pub type ValueMap = BTreeMap<String, Value>;

/// Storage representation of a single column value.
///
/// The write path only produces `Null`, `Integer`, `Double`, `Decimal`, `Text` and
/// `Bytes`. The read path accepts every variant, since backends hand back their own
/// native representations (a native GUID, a native timestamp, a boolean, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The backend null sentinel
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Guid(Uuid),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Guid(_) => "guid",
            Value::DateTime(_) => "datetime",
            Value::DateTimeOffset(_) => "datetimeoffset",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

/// SQL-literal style rendering, for diagnostics only.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Bytes(b) => {
                f.write_str("X'")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("'")
            }
            Value::Guid(g) => write!(f, "'{g}'"),
            Value::DateTime(dt) => write!(f, "'{dt}'"),
            Value::DateTimeOffset(dt) => write!(f, "'{dt}'"),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v.into())
                }
            }
        )+
    };
}

value_from! {
    bool => Bool,
    i8 => Integer,
    i16 => Integer,
    i32 => Integer,
    i64 => Integer,
    u8 => Integer,
    u16 => Integer,
    u32 => Integer,
    f32 => Double,
    f64 => Double,
    Decimal => Decimal,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    Uuid => Guid,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Enum property value: symbolic name plus ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub ordinal: i64,
}

/// Dynamically typed in-memory property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Guid(Uuid),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Enum(EnumValue),
}

impl PropertyValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::I8(_) => "i8",
            PropertyValue::I16(_) => "i16",
            PropertyValue::I32(_) => "i32",
            PropertyValue::I64(_) => "i64",
            PropertyValue::U8(_) => "u8",
            PropertyValue::U16(_) => "u16",
            PropertyValue::U32(_) => "u32",
            PropertyValue::U64(_) => "u64",
            PropertyValue::F32(_) => "f32",
            PropertyValue::F64(_) => "f64",
            PropertyValue::Decimal(_) => "decimal",
            PropertyValue::String(_) => "string",
            PropertyValue::Bytes(_) => "bytes",
            PropertyValue::Guid(_) => "guid",
            PropertyValue::DateTime(_) => "datetime",
            PropertyValue::DateTimeOffset(_) => "datetimeoffset",
            PropertyValue::Enum(_) => "enum",
        }
    }

    /// Integer payload widened to `i128`, for any integer variant.
    #[must_use]
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            PropertyValue::I8(v) => Some(i128::from(*v)),
            PropertyValue::I16(v) => Some(i128::from(*v)),
            PropertyValue::I32(v) => Some(i128::from(*v)),
            PropertyValue::I64(v) => Some(i128::from(*v)),
            PropertyValue::U8(v) => Some(i128::from(*v)),
            PropertyValue::U16(v) => Some(i128::from(*v)),
            PropertyValue::U32(v) => Some(i128::from(*v)),
            PropertyValue::U64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }
}
