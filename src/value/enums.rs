//! Enum properties.
//!
//! An enum is stored by ordinal in integer columns and by symbolic name in
//! character columns (`Enum`, `Varchar`, `Nvarchar`). [`db_enum!`](crate::db_enum)
//! declares an enum and wires up [`DbEnum`], [`ToProperty`](crate::ToProperty) and
//! [`FromProperty`](crate::FromProperty) in one go.

use super::types::{EnumValue, PropertyValue};
use crate::error::TideError;

/// An enum that can be stored by name or by ordinal.
pub trait DbEnum: Sized {
    /// Symbolic name of the variant
    fn name(&self) -> &'static str;

    /// Ordinal (discriminant) of the variant
    fn ordinal(&self) -> i64;

    /// Look up a variant by name (ASCII case-insensitive)
    fn from_name(name: &str) -> Option<Self>;

    /// Look up a variant by ordinal
    fn from_ordinal(ordinal: i64) -> Option<Self>;

    fn to_enum_property(&self) -> PropertyValue {
        PropertyValue::Enum(EnumValue {
            name: self.name().to_string(),
            ordinal: self.ordinal(),
        })
    }

    /// Accepts an enum value, a name, or any integer ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::ConversionFailure`] if no variant matches.
    fn from_enum_property(value: PropertyValue) -> Result<Self, TideError> {
        let type_name = std::any::type_name::<Self>();
        let found = match &value {
            PropertyValue::Enum(e) => Self::from_name(&e.name),
            PropertyValue::String(name) => Self::from_name(name),
            other => match other.as_integer().map(i64::try_from) {
                Some(Ok(ordinal)) => Self::from_ordinal(ordinal),
                _ => None,
            },
        };
        found.ok_or_else(|| match value {
            PropertyValue::Null => TideError::conversion(
                "",
                format!("null cannot be assigned to a non-nullable {type_name} property"),
            ),
            other => TideError::conversion("", format!("{other:?} is not a variant of {type_name}")),
        })
    }
}

/// Declare an enum usable as a record property.
///
/// Every variant needs an explicit ordinal; the ordinal is what integer columns store.
///
/// ```
/// tidemark::db_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
///     pub enum Status {
///         #[default]
///         Active = 1,
///         Suspended = 2,
///     }
/// }
///
/// use tidemark::DbEnum;
/// assert_eq!(Status::Suspended.name(), "Suspended");
/// assert_eq!(Status::from_ordinal(1), Some(Status::Active));
/// ```
#[macro_export]
macro_rules! db_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $ordinal:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $ordinal ),+
        }

        impl $crate::DbEnum for $name {
            fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant), )+
                }
            }

            fn ordinal(&self) -> i64 {
                match self {
                    $( $name::$variant => $ordinal, )+
                }
            }

            fn from_name(name: &str) -> Option<Self> {
                $(
                    if name.eq_ignore_ascii_case(stringify!($variant)) {
                        return Some($name::$variant);
                    }
                )+
                None
            }

            fn from_ordinal(ordinal: i64) -> Option<Self> {
                $(
                    if ordinal == $ordinal {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl $crate::ToProperty for $name {
            fn to_property(&self) -> $crate::PropertyValue {
                $crate::DbEnum::to_enum_property(self)
            }
        }

        impl $crate::FromProperty for $name {
            fn from_property(value: $crate::PropertyValue) -> Result<Self, $crate::TideError> {
                <Self as $crate::DbEnum>::from_enum_property(value)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{DbEnum, FromProperty, PropertyValue, ToProperty};

    crate::db_enum! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Shade {
            Light = 0,
            Dark = 7,
        }
    }

    #[test]
    fn test_names_and_ordinals() {
        assert_eq!(Shade::Dark.name(), "Dark");
        assert_eq!(Shade::Dark.ordinal(), 7);
        assert_eq!(Shade::from_name("light"), Some(Shade::Light));
        assert_eq!(Shade::from_ordinal(3), None);
    }

    #[test]
    fn test_from_property_accepts_name_and_ordinal() {
        assert_eq!(
            Shade::from_property(PropertyValue::String("Dark".into())).unwrap(),
            Shade::Dark
        );
        assert_eq!(Shade::from_property(PropertyValue::I64(0)).unwrap(), Shade::Light);
        assert_eq!(Shade::from_property(Shade::Dark.to_property()).unwrap(), Shade::Dark);
        assert!(Shade::from_property(PropertyValue::I64(99)).is_err());
        assert!(Shade::from_property(PropertyValue::Null).is_err());
    }
}
