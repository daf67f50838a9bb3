//! The `Record` trait implemented by every mapped type.
//!
//! There is no runtime reflection: a record describes its table and column tags
//! once, through [`Record::describe`], and exposes its properties by name through
//! [`Record::get`] / [`Record::set`]. The [`record_accessors!`](crate::record_accessors)
//! macro writes `get`/`set` for plain field lists.
//!
//! # Example
//!
//! ```
//! use tidemark::{ColumnTag, DataType, Record, RecordDescriptor, TableTag, TideError};
//! use chrono::NaiveDateTime;
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Person {
//!     id: i32,
//!     first_name: String,
//!     born_on: Option<NaiveDateTime>,
//! }
//!
//! impl Record for Person {
//!     fn describe() -> Result<RecordDescriptor, TideError> {
//!         Ok(RecordDescriptor::new()
//!             .table(TableTag::new("person")?)
//!             .column("id", ColumnTag::builder(DataType::Int).primary_key().build()?)
//!             .column(
//!                 "first_name",
//!                 ColumnTag::builder(DataType::Nvarchar).name("firstname").max_length(64).build()?,
//!             )
//!             .column(
//!                 "born_on",
//!                 ColumnTag::builder(DataType::DateTime).name("bornon").nullable().build()?,
//!             ))
//!     }
//!
//!     tidemark::record_accessors!(id, first_name, born_on);
//! }
//! ```

use crate::error::TideError;
use crate::schema::RecordDescriptor;
use crate::value::PropertyValue;

/// A type that maps to rows of one table.
pub trait Record: Default + Send + Sync + 'static {
    /// Declare the table tag and the column tags of this type's properties.
    ///
    /// # Errors
    ///
    /// Propagates tag construction errors.
    fn describe() -> Result<RecordDescriptor, TideError>;

    /// Read a property by name; `None` if the type has no such property.
    fn get(&self, property: &str) -> Option<PropertyValue>;

    /// Write a property by name.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::UnknownProperty`] if the type has no such property, or a
    /// conversion error if the value does not fit the property's type.
    fn set(&mut self, property: &str, value: PropertyValue) -> Result<(), TideError>;
}

/// Implement [`Record::get`] and [`Record::set`] for a list of fields.
///
/// Property names are the field names. Every field type must implement
/// [`ToProperty`](crate::ToProperty) and [`FromProperty`](crate::FromProperty).
#[macro_export]
macro_rules! record_accessors {
    ($($field:ident),+ $(,)?) => {
        fn get(&self, property: &str) -> Option<$crate::PropertyValue> {
            match property {
                $( stringify!($field) => Some($crate::ToProperty::to_property(&self.$field)), )+
                _ => None,
            }
        }

        fn set(
            &mut self,
            property: &str,
            value: $crate::PropertyValue,
        ) -> Result<(), $crate::TideError> {
            match property {
                $(
                    stringify!($field) => {
                        self.$field = $crate::FromProperty::from_property(value)?;
                        Ok(())
                    }
                )+
                _ => Err($crate::TideError::UnknownProperty {
                    type_name: std::any::type_name::<Self>(),
                    property: property.to_string(),
                }),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnTag, DataType, TableTag};

    #[derive(Debug, Default)]
    struct Tag {
        id: i64,
        label: Option<String>,
    }

    impl Record for Tag {
        fn describe() -> Result<RecordDescriptor, TideError> {
            Ok(RecordDescriptor::new()
                .table(TableTag::new("tag")?)
                .column("id", ColumnTag::builder(DataType::Long).primary_key().build()?)
                .column("label", ColumnTag::builder(DataType::Varchar).max_length(20).nullable().build()?))
        }

        crate::record_accessors!(id, label);
    }

    #[test]
    fn test_accessors_get_and_set() {
        let mut tag = Tag::default();
        tag.set("id", PropertyValue::I32(9)).unwrap();
        tag.set("label", PropertyValue::String("rust".into())).unwrap();
        assert_eq!(tag.id, 9);
        assert_eq!(tag.get("label"), Some(PropertyValue::String("rust".into())));
        tag.set("label", PropertyValue::Null).unwrap();
        assert_eq!(tag.label, None);
        assert_eq!(tag.get("missing"), None);
    }

    #[test]
    fn test_unknown_property() {
        let mut tag = Tag::default();
        let err = tag.set("color", PropertyValue::Null).unwrap_err();
        assert!(matches!(err, TideError::UnknownProperty { .. }));
    }
}
