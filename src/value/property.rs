//! Conversions between typed Rust fields and [`PropertyValue`].
//!
//! `ToProperty` is infallible. `FromProperty` performs explicit widening and
//! range-checked narrowing; it never truncates silently.

use super::types::PropertyValue;
use crate::error::TideError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Read a typed field as a [`PropertyValue`].
pub trait ToProperty {
    fn to_property(&self) -> PropertyValue;
}

/// Build a typed field from a [`PropertyValue`].
pub trait FromProperty: Sized {
    /// # Errors
    ///
    /// Returns [`TideError::ConversionFailure`] when the value does not fit the
    /// target type, including null for a non-`Option` field.
    fn from_property(value: PropertyValue) -> Result<Self, TideError>;
}

fn mismatch<T>(value: &PropertyValue) -> Result<T, TideError> {
    if value.is_null() {
        return Err(TideError::conversion(
            "",
            format!("null cannot be assigned to a non-nullable {} property", std::any::type_name::<T>()),
        ));
    }
    Err(TideError::conversion(
        "",
        format!("{} value cannot be assigned to {}", value.kind(), std::any::type_name::<T>()),
    ))
}

fn out_of_range<T>(value: impl std::fmt::Display) -> TideError {
    TideError::conversion(
        "",
        format!("{value} is out of range for {}", std::any::type_name::<T>()),
    )
}

/// Largest magnitude below which every integer is exact in an `f64`.
const F64_EXACT: i128 = 1 << 53;
const F32_EXACT: i128 = 1 << 24;

/// `v` as an `f64`, or `None` if the conversion would round.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn exact_f64(v: i128) -> Option<f64> {
    (v.abs() <= F64_EXACT).then_some(v as f64)
}

#[allow(clippy::cast_precision_loss)]
fn exact_f32(v: i128) -> Option<f32> {
    (v.abs() <= F32_EXACT).then_some(v as f32)
}

macro_rules! integer_property {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl ToProperty for $t {
                fn to_property(&self) -> PropertyValue {
                    PropertyValue::$variant(*self)
                }
            }

            impl FromProperty for $t {
                fn from_property(value: PropertyValue) -> Result<Self, TideError> {
                    if let Some(v) = value.as_integer() {
                        return <$t>::try_from(v).map_err(|_| out_of_range::<$t>(v));
                    }
                    match value {
                        PropertyValue::Bool(b) => Ok(<$t>::from(b)),
                        PropertyValue::Enum(ref e) => {
                            <$t>::try_from(e.ordinal).map_err(|_| out_of_range::<$t>(e.ordinal))
                        }
                        ref other => mismatch(other),
                    }
                }
            }
        )+
    };
}

integer_property! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

impl ToProperty for bool {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::Bool(*self)
    }
}

impl FromProperty for bool {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        match value {
            PropertyValue::Bool(b) => Ok(b),
            ref other => match other.as_integer() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                Some(v) => Err(out_of_range::<bool>(v)),
                None => mismatch(other),
            },
        }
    }
}

impl ToProperty for f32 {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::F32(*self)
    }
}

impl FromProperty for f32 {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        match value {
            PropertyValue::F32(v) => Ok(v),
            PropertyValue::F64(v) => {
                if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                    return Err(out_of_range::<f32>(v));
                }
                #[allow(clippy::cast_possible_truncation)]
                Ok(v as f32)
            }
            PropertyValue::Decimal(d) => d.to_f32().ok_or_else(|| out_of_range::<f32>(d)),
            ref other => match other.as_integer() {
                Some(v) => exact_f32(v).ok_or_else(|| out_of_range::<f32>(v)),
                None => mismatch(other),
            },
        }
    }
}

impl ToProperty for f64 {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::F64(*self)
    }
}

impl FromProperty for f64 {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        match value {
            PropertyValue::F64(v) => Ok(v),
            PropertyValue::F32(v) => Ok(f64::from(v)),
            PropertyValue::Decimal(d) => d.to_f64().ok_or_else(|| out_of_range::<f64>(d)),
            ref other => match other.as_integer() {
                Some(v) => exact_f64(v).ok_or_else(|| out_of_range::<f64>(v)),
                None => mismatch(other),
            },
        }
    }
}

impl ToProperty for Decimal {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::Decimal(*self)
    }
}

impl FromProperty for Decimal {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        match value {
            PropertyValue::Decimal(d) => Ok(d),
            PropertyValue::F64(v) => Decimal::try_from(v).map_err(|_| out_of_range::<Decimal>(v)),
            PropertyValue::F32(v) => Decimal::try_from(v).map_err(|_| out_of_range::<Decimal>(v)),
            ref other => match other.as_integer() {
                Some(v) => i64::try_from(v)
                    .map(Decimal::from)
                    .map_err(|_| out_of_range::<Decimal>(v)),
                None => mismatch(other),
            },
        }
    }
}

impl ToProperty for String {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::String(self.clone())
    }
}

impl ToProperty for &str {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::String((*self).to_string())
    }
}

impl FromProperty for String {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        match value {
            PropertyValue::String(s) => Ok(s),
            PropertyValue::Enum(e) => Ok(e.name),
            ref other => mismatch(other),
        }
    }
}

impl ToProperty for Vec<u8> {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::Bytes(self.clone())
    }
}

impl FromProperty for Vec<u8> {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        match value {
            PropertyValue::Bytes(b) => Ok(b),
            ref other => mismatch(other),
        }
    }
}

impl ToProperty for Uuid {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::Guid(*self)
    }
}

impl FromProperty for Uuid {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        match value {
            PropertyValue::Guid(g) => Ok(g),
            PropertyValue::String(ref s) => Uuid::parse_str(s)
                .map_err(|e| TideError::conversion("", format!("invalid GUID string '{s}': {e}"))),
            PropertyValue::Bytes(ref b) => Uuid::from_slice(b)
                .map_err(|e| TideError::conversion("", format!("invalid GUID bytes: {e}"))),
            ref other => mismatch(other),
        }
    }
}

impl ToProperty for NaiveDateTime {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::DateTime(*self)
    }
}

impl FromProperty for NaiveDateTime {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        match value {
            PropertyValue::DateTime(dt) => Ok(dt),
            PropertyValue::DateTimeOffset(dt) => Ok(dt.naive_utc()),
            ref other => mismatch(other),
        }
    }
}

impl ToProperty for DateTime<FixedOffset> {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::DateTimeOffset(*self)
    }
}

impl FromProperty for DateTime<FixedOffset> {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        match value {
            PropertyValue::DateTimeOffset(dt) => Ok(dt),
            PropertyValue::DateTime(dt) => Ok(dt.and_utc().fixed_offset()),
            ref other => mismatch(other),
        }
    }
}

impl ToProperty for DateTime<Utc> {
    fn to_property(&self) -> PropertyValue {
        PropertyValue::DateTimeOffset(self.fixed_offset())
    }
}

impl FromProperty for DateTime<Utc> {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        DateTime::<FixedOffset>::from_property(value).map(|dt| dt.with_timezone(&Utc))
    }
}

impl<T: ToProperty> ToProperty for Option<T> {
    fn to_property(&self) -> PropertyValue {
        match self {
            Some(v) => v.to_property(),
            None => PropertyValue::Null,
        }
    }
}

impl<T: FromProperty> FromProperty for Option<T> {
    fn from_property(value: PropertyValue) -> Result<Self, TideError> {
        match value {
            PropertyValue::Null => Ok(None),
            other => T::from_property(other).map(Some),
        }
    }
}
