//! Declarative table and column tags.
//!
//! Tags are validated when they are constructed, so an invalid declaration fails
//! at the point it is written rather than when the type is registered.

use super::data_type::DataType;
use crate::error::TideError;
use once_cell::sync::Lazy;
use regex::Regex;

static COLUMN_IDENT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

// Optional schema qualifier, e.g. `dbo.person`
static TABLE_IDENT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*\.)?[A-Za-z_][A-Za-z0-9_]*$").ok()
});

fn check_identifier(pattern: &Lazy<Option<Regex>>, what: &str, name: &str) -> Result<(), TideError> {
    if name.is_empty() {
        return Err(TideError::Configuration(format!("{what} name must not be empty")));
    }
    let re = pattern
        .as_ref()
        .ok_or_else(|| TideError::Internal("identifier pattern failed to compile".into()))?;
    if !re.is_match(name) {
        return Err(TideError::Configuration(format!(
            "{what} name '{name}' is not a valid identifier"
        )));
    }
    Ok(())
}

/// Table tag: names the table a record type maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTag {
    name: String,
}

impl TableTag {
    /// Create a table tag.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::Configuration`] if the name is empty or not an identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, TideError> {
        let name = name.into();
        check_identifier(&TABLE_IDENT, "table", &name)?;
        Ok(Self { name })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Column tag: declares how one property is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTag {
    name: Option<String>,
    primary_key: bool,
    data_type: DataType,
    max_length: Option<u32>,
    precision: Option<u32>,
    nullable: bool,
}

impl ColumnTag {
    /// Create a column tag from all of its parts.
    ///
    /// `name` defaults to the property name when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::Configuration`] if:
    /// - the column is a primary key and nullable
    /// - a Decimal/Double column does not declare both max length and precision
    /// - a Varchar/Nvarchar/Enum column does not declare a max length
    /// - max length or precision is zero
    /// - the explicit name is not a valid identifier
    pub fn new(
        name: Option<&str>,
        primary_key: bool,
        data_type: DataType,
        max_length: Option<u32>,
        precision: Option<u32>,
        nullable: bool,
    ) -> Result<Self, TideError> {
        if let Some(name) = name {
            check_identifier(&COLUMN_IDENT, "column", name)?;
        }
        let label = name.unwrap_or("<property>");
        if primary_key && nullable {
            return Err(TideError::Configuration(format!(
                "primary key column {label} cannot be nullable"
            )));
        }
        if max_length == Some(0) {
            return Err(TideError::Configuration(format!(
                "max length of column {label} must be at least 1"
            )));
        }
        if precision == Some(0) {
            return Err(TideError::Configuration(format!(
                "precision of column {label} must be at least 1"
            )));
        }
        if data_type.requires_precision() && (max_length.is_none() || precision.is_none()) {
            return Err(TideError::Configuration(format!(
                "{data_type} column {label} requires both max length and precision"
            )));
        }
        if data_type.requires_length() && max_length.is_none() {
            return Err(TideError::Configuration(format!(
                "{data_type} column {label} requires a max length"
            )));
        }
        Ok(Self {
            name: name.map(str::to_string),
            primary_key,
            data_type,
            max_length,
            precision,
            nullable,
        })
    }

    /// Start building a column tag of the given type.
    #[must_use]
    pub fn builder(data_type: DataType) -> ColumnTagBuilder {
        ColumnTagBuilder {
            name: None,
            primary_key: false,
            data_type,
            max_length: None,
            precision: None,
            nullable: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[must_use]
    pub fn max_length(&self) -> Option<u32> {
        self.max_length
    }

    #[must_use]
    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Fluent builder for [`ColumnTag`]; validation happens in [`ColumnTagBuilder::build`].
///
/// ```
/// use tidemark::{ColumnTag, DataType};
///
/// let tag = ColumnTag::builder(DataType::Nvarchar)
///     .name("firstname")
///     .max_length(64)
///     .build()
///     .unwrap();
/// assert_eq!(tag.name(), Some("firstname"));
/// ```
#[derive(Debug, Clone)]
pub struct ColumnTagBuilder {
    name: Option<String>,
    primary_key: bool,
    data_type: DataType,
    max_length: Option<u32>,
    precision: Option<u32>,
    nullable: bool,
}

impl ColumnTagBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Validate and produce the tag.
    ///
    /// # Errors
    ///
    /// Same rules as [`ColumnTag::new`].
    pub fn build(self) -> Result<ColumnTag, TideError> {
        ColumnTag::new(
            self.name.as_deref(),
            self.primary_key,
            self.data_type,
            self.max_length,
            self.precision,
            self.nullable,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_table_tag_requires_name() {
        assert!(TableTag::new("person").is_ok());
        assert!(TableTag::new("dbo.person").is_ok());
        let err = TableTag::new("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(TableTag::new("person; DROP TABLE x").is_err());
    }

    #[test]
    fn test_nullable_primary_key_fails() {
        let err = ColumnTag::new(Some("id"), true, DataType::Int, None, None, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = ColumnTag::builder(DataType::Int)
            .primary_key()
            .nullable()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("cannot be nullable"));
    }

    #[test]
    fn test_decimal_requires_length_and_precision() {
        assert!(ColumnTag::builder(DataType::Decimal).max_length(10).build().is_err());
        assert!(ColumnTag::builder(DataType::Decimal).precision(2).build().is_err());
        assert!(ColumnTag::builder(DataType::Double).build().is_err());
        let tag = ColumnTag::builder(DataType::Decimal)
            .max_length(10)
            .precision(2)
            .build()
            .unwrap();
        assert_eq!(tag.max_length(), Some(10));
        assert_eq!(tag.precision(), Some(2));
    }

    #[test]
    fn test_character_types_require_length() {
        for dt in [DataType::Varchar, DataType::Nvarchar, DataType::Enum] {
            assert!(ColumnTag::builder(dt).build().is_err(), "{dt} without length");
            assert!(ColumnTag::builder(dt).max_length(32).build().is_ok());
        }
    }

    #[test]
    fn test_zero_length_and_precision_rejected() {
        assert!(ColumnTag::builder(DataType::Varchar).max_length(0).build().is_err());
        assert!(ColumnTag::builder(DataType::Decimal)
            .max_length(10)
            .precision(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_invalid_column_name_rejected() {
        assert!(ColumnTag::builder(DataType::Int).name("first name").build().is_err());
        assert!(ColumnTag::builder(DataType::Int).name("9lives").build().is_err());
        assert!(ColumnTag::builder(DataType::Int).name("_rowid").build().is_ok());
    }

    #[test]
    fn test_name_defaults_to_none() {
        let tag = ColumnTag::builder(DataType::Guid).build().unwrap();
        assert_eq!(tag.name(), None);
        assert!(!tag.is_primary_key());
        assert!(!tag.is_nullable());
    }
}
