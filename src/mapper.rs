//! Record mapper: records to value maps, rows to records.
//!
//! Every conversion goes through the coercion engine keyed by the column's data
//! type; timestamp formatting comes from the storage backend.

use crate::config::NullHandling;
use crate::error::TideError;
use crate::query::Expression;
use crate::record::Record;
use crate::registry::TypeRegistry;
use crate::value::{check_storage, from_storage, to_storage, Row, TimestampFormat, Value, ValueMap};
use std::any::type_name;

/// Converts between records and backend rows using registered metadata.
#[derive(Clone, Copy)]
pub struct RecordMapper<'a> {
    registry: &'a TypeRegistry,
    timestamps: &'a dyn TimestampFormat,
    nulls: NullHandling,
}

impl<'a> RecordMapper<'a> {
    pub fn new(registry: &'a TypeRegistry, timestamps: &'a dyn TimestampFormat) -> Self {
        Self {
            registry,
            timestamps,
            nulls: NullHandling::Explicit,
        }
    }

    #[must_use]
    pub fn with_null_handling(mut self, nulls: NullHandling) -> Self {
        self.nulls = nulls;
        self
    }

    #[must_use]
    pub fn null_handling(&self) -> NullHandling {
        self.nulls
    }

    /// Column name → storage value for every non-key column of `record`.
    ///
    /// Null properties are written as [`Value::Null`] under
    /// [`NullHandling::Explicit`] and left out under [`NullHandling::Omit`].
    ///
    /// # Errors
    ///
    /// - [`TideError::UninitializedType`] if `R` is not registered
    /// - [`TideError::Configuration`] if `R` has no non-key columns
    /// - [`TideError::UnknownProperty`] if the record does not expose a tagged property
    /// - a conversion error naming the offending column
    pub fn to_value_map<R: Record>(&self, record: &R) -> Result<ValueMap, TideError> {
        let metadata = self.registry.lookup::<R>()?;
        let mut values = ValueMap::new();
        let mut eligible = 0usize;
        for (property, column) in metadata.writable() {
            eligible += 1;
            let value = record.get(property).ok_or_else(|| TideError::UnknownProperty {
                type_name: type_name::<R>(),
                property: property.to_string(),
            })?;
            if value.is_null() && self.nulls == NullHandling::Omit {
                continue;
            }
            let stored = to_storage(column, value, self.timestamps)
                .map_err(|e| e.in_column(&column.name))?;
            values.insert(column.name.clone(), stored);
        }
        if eligible == 0 {
            return Err(TideError::Configuration(format!(
                "{} has no writable columns besides its primary key",
                type_name::<R>()
            )));
        }
        Ok(values)
    }

    /// Build a fresh `R` from a backend row.
    ///
    /// Columns the metadata does not know are ignored; a column resolves exactly
    /// first, then case-insensitively.
    ///
    /// # Errors
    ///
    /// - [`TideError::UninitializedType`] if `R` is not registered
    /// - [`TideError::UnknownProperty`] if a mapped property cannot be set on `R`
    /// - a conversion error naming the offending column
    pub fn from_row<R: Record>(&self, row: Row) -> Result<R, TideError> {
        let metadata = self.registry.lookup::<R>()?;
        let mut record = R::default();
        for (name, value) in row {
            let Some((property, column)) = metadata.column(&name) else {
                log::trace!("ignoring column {name} not mapped by {}", type_name::<R>());
                continue;
            };
            let converted = from_storage(column, value, self.timestamps)
                .map_err(|e| e.in_column(&column.name))?;
            record
                .set(property, converted)
                .map_err(|e| e.in_column(&column.name))?;
        }
        Ok(record)
    }

    /// Map every row, failing on the first conversion error.
    ///
    /// # Errors
    ///
    /// See [`RecordMapper::from_row`].
    pub fn from_rows<R: Record>(&self, rows: Vec<Row>) -> Result<Vec<R>, TideError> {
        rows.into_iter().map(|row| self.from_row(row)).collect()
    }

    /// Storage value of `record`'s primary key.
    ///
    /// # Errors
    ///
    /// Fails if `R` is not registered or the key cannot be converted.
    pub fn key_value<R: Record>(&self, record: &R) -> Result<Value, TideError> {
        let metadata = self.registry.lookup::<R>()?;
        let property = metadata.primary_key_property();
        let column = metadata.primary_key();
        let value = record.get(property).ok_or_else(|| TideError::UnknownProperty {
            type_name: type_name::<R>(),
            property: property.to_string(),
        })?;
        to_storage(column, value, self.timestamps).map_err(|e| e.in_column(&column.name))
    }

    /// `pk_column = key` for `R`.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::InvalidArgument`] for a null key, or
    /// [`TideError::UninitializedType`] if `R` is not registered.
    pub fn key_filter<R: Record>(&self, key: impl Into<Value>) -> Result<Expression, TideError> {
        let key = key.into();
        let metadata = self.registry.lookup::<R>()?;
        if key.is_null() {
            return Err(TideError::InvalidArgument(format!(
                "primary key value for {} must not be null",
                metadata.table_name()
            )));
        }
        Ok(Expression::equals(metadata.primary_key_column(), key))
    }

    /// Validate a caller-built update map for `R`.
    ///
    /// Column names are normalized to their declared spelling and every value
    /// passes the same column checks as a record write.
    ///
    /// # Errors
    ///
    /// - [`TideError::InvalidArgument`] if the map is empty, names an unknown
    ///   column, or names the primary key
    /// - [`TideError::ConversionFailure`] or [`TideError::UnsupportedDataType`] if
    ///   a value does not fit its column
    pub fn column_values<R: Record>(&self, values: ValueMap) -> Result<ValueMap, TideError> {
        let metadata = self.registry.lookup::<R>()?;
        if values.is_empty() {
            return Err(TideError::InvalidArgument(format!(
                "update of {} needs at least one column value",
                metadata.table_name()
            )));
        }
        let mut checked = ValueMap::new();
        for (name, value) in values {
            let (_, column) = metadata.column(&name).ok_or_else(|| {
                TideError::InvalidArgument(format!(
                    "table {} has no column named {name}",
                    metadata.table_name()
                ))
            })?;
            if column.primary_key {
                return Err(TideError::InvalidArgument(format!(
                    "primary key column {} cannot be updated",
                    column.name
                )));
            }
            let stored = check_storage(column, value, self.timestamps)
                .map_err(|e| e.in_column(&column.name))?;
            checked.insert(column.name.clone(), stored);
        }
        Ok(checked)
    }
}

impl std::fmt::Debug for RecordMapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordMapper")
            .field("registry", self.registry)
            .field("nulls", &self.nulls)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::{ColumnTag, DataType, RecordDescriptor, TableTag};
    use crate::value::{DefaultTimestamps, PropertyValue};

    #[derive(Debug, Default, PartialEq)]
    struct Account {
        id: i64,
        owner: String,
        nickname: Option<String>,
        balance: i32,
    }

    impl Record for Account {
        fn describe() -> Result<RecordDescriptor, TideError> {
            Ok(RecordDescriptor::new()
                .table(TableTag::new("account")?)
                .column("id", ColumnTag::builder(DataType::Long).primary_key().build()?)
                .column("owner", ColumnTag::builder(DataType::Varchar).max_length(8).build()?)
                .column(
                    "nickname",
                    ColumnTag::builder(DataType::Varchar).max_length(16).nullable().build()?,
                )
                .column("balance", ColumnTag::builder(DataType::Int).name("bal").build()?))
        }

        crate::record_accessors!(id, owner, nickname, balance);
    }

    #[derive(Debug, Default)]
    struct KeyOnly {
        id: i32,
    }

    impl Record for KeyOnly {
        fn describe() -> Result<RecordDescriptor, TideError> {
            Ok(RecordDescriptor::new()
                .table(TableTag::new("key_only")?)
                .column("id", ColumnTag::builder(DataType::Int).primary_key().build()?))
        }

        crate::record_accessors!(id);
    }

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry.register::<Account>().unwrap();
        registry.register::<KeyOnly>().unwrap();
        registry
    }

    fn account() -> Account {
        Account {
            id: 7,
            owner: "ada".into(),
            nickname: None,
            balance: 120,
        }
    }

    #[test]
    fn test_value_map_excludes_key_and_keeps_nulls() {
        let registry = registry();
        let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
        let values = mapper.to_value_map(&account()).unwrap();
        let expected: ValueMap = [
            ("owner".to_string(), Value::from("ada")),
            ("nickname".to_string(), Value::Null),
            ("bal".to_string(), Value::Integer(120)),
        ]
        .into_iter()
        .collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_value_map_omits_nulls() {
        let registry = registry();
        let mapper =
            RecordMapper::new(&registry, &DefaultTimestamps).with_null_handling(NullHandling::Omit);
        let values = mapper.to_value_map(&account()).unwrap();
        assert!(!values.contains_key("nickname"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_value_map_requires_writable_columns() {
        let registry = registry();
        let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
        let err = mapper.to_value_map(&KeyOnly { id: 1 }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_conversion_error_names_column() {
        let registry = registry();
        let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
        let mut acct = account();
        acct.owner = "far too long".into();
        match mapper.to_value_map(&acct).unwrap_err() {
            TideError::ConversionFailure { column, .. } => assert_eq!(column, "owner"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unregistered_type_fails() {
        let registry = TypeRegistry::new();
        let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
        let err = mapper.to_value_map(&account()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert!(mapper.from_row::<Account>(Row::new()).is_err());
    }

    #[test]
    fn test_from_row_ignores_unmapped_columns() {
        let registry = registry();
        let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
        let row: Row = [
            ("ID".to_string(), Value::Integer(7)),
            ("owner".to_string(), Value::from("ada")),
            ("nickname".to_string(), Value::Null),
            ("bal".to_string(), Value::Integer(120)),
            ("rowversion".to_string(), Value::Integer(3)),
        ]
        .into_iter()
        .collect();
        let acct: Account = mapper.from_row(row).unwrap();
        assert_eq!(acct, account());
    }

    #[test]
    fn test_from_row_conversion_error_names_column() {
        let registry = registry();
        let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
        let row: Row = [("bal".to_string(), Value::Integer(i64::MAX))].into_iter().collect();
        match mapper.from_row::<Account>(row).unwrap_err() {
            TideError::ConversionFailure { column, .. } => assert_eq!(column, "bal"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_key_value_and_filter() {
        let registry = registry();
        let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
        assert_eq!(mapper.key_value(&account()).unwrap(), Value::Integer(7));
        let filter = mapper.key_filter::<Account>(7i64).unwrap();
        assert_eq!(filter, Expression::equals("id", 7i64));
        let err = mapper.key_filter::<Account>(Value::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_column_values_validation() {
        let registry = registry();
        let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
        let ok = mapper
            .column_values::<Account>([("BAL".to_string(), Value::Integer(1))].into_iter().collect())
            .unwrap();
        assert_eq!(ok.get("bal"), Some(&Value::Integer(1)));

        for bad in [
            ValueMap::new(),
            [("id".to_string(), Value::Integer(1))].into_iter().collect(),
            [("colour".to_string(), Value::from("red"))].into_iter().collect(),
        ] {
            let err = mapper.column_values::<Account>(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Argument);
        }
    }

    #[test]
    fn test_column_values_are_coerced() {
        let registry = registry();
        let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
        let update = |name: &str, value: Value| {
            mapper.column_values::<Account>([(name.to_string(), value)].into_iter().collect())
        };

        match update("owner", Value::from("far too long")).unwrap_err() {
            TideError::ConversionFailure { column, .. } => assert_eq!(column, "owner"),
            other => panic!("unexpected error: {other}"),
        }
        let err = update("bal", Value::Bytes(vec![1, 2])).unwrap_err();
        assert!(matches!(err, TideError::UnsupportedDataType { .. }));
        let err = update("bal", Value::Integer(i64::MAX)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
        let err = update("owner", Value::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);

        let ok = update("nickname", Value::Null).unwrap();
        assert_eq!(ok.get("nickname"), Some(&Value::Null));
    }

    #[test]
    fn test_record_property_mismatch() {
        let registry = registry();
        let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
        let mut acct = Account::default();
        let err = acct.set("missing", PropertyValue::Null).unwrap_err();
        assert!(matches!(err, TideError::UnknownProperty { .. }));
        assert!(mapper.to_value_map(&acct).is_ok());
    }
}
