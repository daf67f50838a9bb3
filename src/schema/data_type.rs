//! Column data types.

use crate::error::TideError;
use std::fmt;
use std::str::FromStr;

/// Declared storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Varchar,
    Nvarchar,
    TinyInt,
    Int,
    Boolean,
    /// Enum stored by symbolic name in a character column
    Enum,
    Long,
    Decimal,
    Double,
    DateTime,
    DateTimeOffset,
    Blob,
    Guid,
}

impl DataType {
    /// All data types, in declaration order.
    pub const ALL: [DataType; 13] = [
        DataType::Varchar,
        DataType::Nvarchar,
        DataType::TinyInt,
        DataType::Int,
        DataType::Boolean,
        DataType::Enum,
        DataType::Long,
        DataType::Decimal,
        DataType::Double,
        DataType::DateTime,
        DataType::DateTimeOffset,
        DataType::Blob,
        DataType::Guid,
    ];

    /// Whether a column of this type must declare a max length.
    #[must_use]
    pub fn requires_length(self) -> bool {
        matches!(
            self,
            DataType::Varchar | DataType::Nvarchar | DataType::Enum | DataType::Decimal | DataType::Double
        )
    }

    /// Whether a column of this type must declare a precision (together with its length).
    #[must_use]
    pub fn requires_precision(self) -> bool {
        matches!(self, DataType::Decimal | DataType::Double)
    }

    /// Whether values of this type are stored as text.
    #[must_use]
    pub fn is_character(self) -> bool {
        matches!(self, DataType::Varchar | DataType::Nvarchar | DataType::Enum)
    }

    /// Whether values of this type are stored as integers.
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::TinyInt | DataType::Int | DataType::Long | DataType::Boolean
        )
    }

    /// Canonical tag name, as accepted by [`DataType::from_str`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Varchar => "Varchar",
            DataType::Nvarchar => "Nvarchar",
            DataType::TinyInt => "TinyInt",
            DataType::Int => "Int",
            DataType::Boolean => "Boolean",
            DataType::Enum => "Enum",
            DataType::Long => "Long",
            DataType::Decimal => "Decimal",
            DataType::Double => "Double",
            DataType::DateTime => "DateTime",
            DataType::DateTimeOffset => "DateTimeOffset",
            DataType::Blob => "Blob",
            DataType::Guid => "Guid",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = TideError;

    /// Parse a data type tag, case-insensitively.
    ///
    /// Unknown tags fail with [`TideError::UnsupportedDataType`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .iter()
            .copied()
            .find(|dt| dt.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TideError::unsupported(s, "unrecognized data type tag"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("nvarchar".parse::<DataType>().unwrap(), DataType::Nvarchar);
        assert_eq!("DATETIMEOFFSET".parse::<DataType>().unwrap(), DataType::DateTimeOffset);
        assert_eq!(" Guid ".parse::<DataType>().unwrap(), DataType::Guid);
    }

    #[test]
    fn test_parse_round_trips_every_tag() {
        for dt in DataType::ALL {
            assert_eq!(dt.to_string().parse::<DataType>().unwrap(), dt);
        }
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let err = "Geography".parse::<DataType>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
        assert!(matches!(err, TideError::UnsupportedDataType { .. }));
    }

    #[test]
    fn test_length_requirements() {
        assert!(DataType::Varchar.requires_length());
        assert!(DataType::Enum.requires_length());
        assert!(DataType::Decimal.requires_precision());
        assert!(!DataType::Int.requires_length());
        assert!(!DataType::Guid.requires_precision());
    }
}
