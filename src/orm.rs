//! The dispatcher: typed CRUD on top of a [`StorageBackend`].
//!
//! `Orm` owns a backend and a [`TypeRegistry`]. Each call resolves the record
//! type's metadata, converts through the [`RecordMapper`], and hands plain value
//! maps, expressions and rows to the backend. Backend errors come back unchanged.

use crate::backend::StorageBackend;
use crate::config::MapperSettings;
use crate::error::TideError;
use crate::mapper::RecordMapper;
use crate::query::{Expression, OrderBy};
use crate::record::Record;
use crate::registry::TypeRegistry;
use crate::schema::{self, TableMetadata};
use crate::value::{Row, Value, ValueMap};
use std::any::type_name;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use crate::tracing_helpers;

/// Typed access to one storage backend.
pub struct Orm<B: StorageBackend> {
    backend: B,
    registry: Arc<TypeRegistry>,
    settings: MapperSettings,
}

impl<B: StorageBackend> Orm<B> {
    /// Dispatcher with default settings and its own registry.
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, MapperSettings::default())
    }

    pub fn with_settings(backend: B, settings: MapperSettings) -> Self {
        Self::with_registry(backend, Arc::new(TypeRegistry::new()), settings)
    }

    /// Dispatcher sharing an existing registry (e.g. several backends, one schema).
    pub fn with_registry(backend: B, registry: Arc<TypeRegistry>, settings: MapperSettings) -> Self {
        Self {
            backend,
            registry,
            settings,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    /// Mapper bound to this dispatcher's registry, backend timestamps and null handling.
    #[must_use]
    pub fn mapper(&self) -> RecordMapper<'_> {
        RecordMapper::new(&self.registry, &self.backend)
            .with_null_handling(self.settings.null_handling)
    }

    /// Extract and register `R`, creating its table if it is missing and
    /// `create_missing_tables` is set.
    ///
    /// # Errors
    ///
    /// Configuration errors from extraction, [`TideError::AlreadyRegistered`], or
    /// backend errors from table creation. Nothing is registered on failure.
    /// When several threads register `R` at once, exactly one succeeds and the
    /// rest get [`TideError::AlreadyRegistered`].
    pub fn register_type<R: Record>(&self) -> Result<Arc<TableMetadata>, TideError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::register_span(type_name::<R>()).entered();

        if self.registry.is_registered::<R>()? {
            return Err(TideError::AlreadyRegistered {
                type_name: type_name::<R>(),
            });
        }
        let metadata = schema::extract(&R::describe()?)?;
        let table = metadata.table_name();
        if self.settings.create_missing_tables && !self.backend.table_exists(table)? {
            log::info!("creating missing table {table} for {}", type_name::<R>());
            if let Err(err) = self.backend.create_table(table, metadata.columns()) {
                // A concurrent registration may have created it first
                if !self.backend.table_exists(table)? {
                    return Err(err);
                }
                log::debug!("table {table} was created concurrently");
            }
        }
        self.registry.register_metadata::<R>(metadata)
    }

    /// # Errors
    ///
    /// [`TideError::UninitializedType`] if `R` is not registered.
    pub fn table_name<R: Record>(&self) -> Result<String, TideError> {
        self.registry.table_name::<R>()
    }

    /// # Errors
    ///
    /// [`TideError::UninitializedType`] or [`TideError::UnknownProperty`].
    pub fn column_name<R: Record>(&self, property: &str) -> Result<String, TideError> {
        self.registry.column_name::<R>(property)
    }

    fn table<R: Record>(&self) -> Result<String, TideError> {
        self.registry.table_name::<R>()
    }

    /// Insert `record` and return it as stored (with its generated key).
    ///
    /// # Errors
    ///
    /// Lookup, conversion or backend errors.
    pub fn insert<R: Record>(&self, record: &R) -> Result<R, TideError> {
        let table = self.table::<R>()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::operation_span("insert", &table).entered();
        log::debug!("insert into {table}");

        let mapper = self.mapper();
        let values = mapper.to_value_map(record)?;
        let row = self.backend.insert(&table, &values)?;
        mapper.from_row(row)
    }

    /// Insert each record in order; stops at the first failure.
    ///
    /// # Errors
    ///
    /// [`TideError::InvalidArgument`] for an empty slice, otherwise as [`Orm::insert`].
    pub fn insert_many<R: Record>(&self, records: &[R]) -> Result<Vec<R>, TideError> {
        if records.is_empty() {
            return Err(TideError::InvalidArgument(format!(
                "insert_many of {} needs at least one record",
                type_name::<R>()
            )));
        }
        records.iter().map(|r| self.insert(r)).collect()
    }

    /// Write every non-key column of `record` to the row with its key, then
    /// return the row as stored.
    ///
    /// # Errors
    ///
    /// [`TideError::InvalidArgument`] if no row has the record's key, otherwise
    /// lookup, conversion or backend errors.
    pub fn update<R: Record>(&self, record: &R) -> Result<R, TideError> {
        let table = self.table::<R>()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::operation_span("update", &table).entered();

        let mapper = self.mapper();
        let key = mapper.key_value(record)?;
        log::debug!("update {table} where key = {key}");
        let filter = mapper.key_filter::<R>(key.clone())?;
        let values = mapper.to_value_map(record)?;
        if self.backend.update(&table, &values, &filter)? == 0 {
            return Err(TideError::InvalidArgument(format!(
                "no {table} row has key {key}"
            )));
        }
        let row = self
            .backend
            .select(&table, None, Some(1), Some(&filter), &[])?
            .into_iter()
            .next()
            .ok_or_else(|| TideError::InvalidArgument(format!("no {table} row has key {key}")))?;
        mapper.from_row(row)
    }

    /// Apply a column → value map to every row matching `filter`.
    ///
    /// # Errors
    ///
    /// [`TideError::InvalidArgument`] for an empty map, an unknown column or the
    /// primary key column; otherwise lookup or backend errors.
    pub fn update_many<R: Record>(
        &self,
        filter: &Expression,
        values: ValueMap,
    ) -> Result<u64, TideError> {
        let table = self.table::<R>()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::operation_span("update_many", &table).entered();
        log::debug!("update {table} where {filter}");

        let values = self.mapper().column_values::<R>(values)?;
        self.backend.update(&table, &values, filter)
    }

    /// Delete the row with `record`'s key.
    ///
    /// # Errors
    ///
    /// Lookup, conversion or backend errors.
    pub fn delete<R: Record>(&self, record: &R) -> Result<u64, TideError> {
        let key = self.mapper().key_value(record)?;
        self.delete_by_key::<R>(key)
    }

    /// # Errors
    ///
    /// [`TideError::InvalidArgument`] for a null key, otherwise lookup or backend errors.
    pub fn delete_by_key<R: Record>(&self, key: impl Into<Value>) -> Result<u64, TideError> {
        let filter = self.mapper().key_filter::<R>(key)?;
        self.delete_many::<R>(&filter)
    }

    /// # Errors
    ///
    /// Lookup or backend errors.
    pub fn delete_many<R: Record>(&self, filter: &Expression) -> Result<u64, TideError> {
        let table = self.table::<R>()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::operation_span("delete", &table).entered();
        log::debug!("delete from {table} where {filter}");

        self.backend.delete(&table, filter)
    }

    /// # Errors
    ///
    /// [`TideError::InvalidArgument`] for a null key, otherwise lookup, conversion
    /// or backend errors.
    pub fn select_by_key<R: Record>(&self, key: impl Into<Value>) -> Result<Option<R>, TideError> {
        let filter = self.mapper().key_filter::<R>(key)?;
        self.select_first(Some(&filter), &[])
    }

    /// First matching record in the given order.
    ///
    /// # Errors
    ///
    /// Lookup, conversion or backend errors.
    pub fn select_first<R: Record>(
        &self,
        filter: Option<&Expression>,
        order: &[OrderBy],
    ) -> Result<Option<R>, TideError> {
        let table = self.table::<R>()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::operation_span("select_first", &table).entered();
        log::debug!("select first from {table}");

        let row = self
            .backend
            .select(&table, None, Some(1), filter, order)?
            .into_iter()
            .next();
        row.map(|row| self.mapper().from_row(row)).transpose()
    }

    /// Matching records, ordered, then paged.
    ///
    /// Without an explicit `limit`, `default_select_limit` from the settings applies.
    ///
    /// # Errors
    ///
    /// Lookup, conversion or backend errors.
    pub fn select_many<R: Record>(
        &self,
        filter: Option<&Expression>,
        order: &[OrderBy],
        skip: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<R>, TideError> {
        let table = self.table::<R>()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::operation_span("select_many", &table).entered();
        let limit = limit.or(self.settings.default_select_limit);
        log::debug!("select from {table} skip {skip:?} limit {limit:?}");

        let rows = self.backend.select(&table, skip, limit, filter, order)?;
        self.mapper().from_rows(rows)
    }

    /// # Errors
    ///
    /// Lookup or backend errors.
    pub fn count<R: Record>(&self, filter: Option<&Expression>) -> Result<u64, TideError> {
        let table = self.table::<R>()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::operation_span("count", &table).entered();
        self.backend.count(&table, filter)
    }

    /// # Errors
    ///
    /// Lookup or backend errors.
    pub fn exists<R: Record>(&self, filter: Option<&Expression>) -> Result<bool, TideError> {
        let table = self.table::<R>()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::operation_span("exists", &table).entered();
        self.backend.exists(&table, filter)
    }

    /// Sum of `column` over matching rows.
    ///
    /// # Errors
    ///
    /// Lookup or backend errors.
    pub fn sum<R: Record>(
        &self,
        column: &str,
        filter: Option<&Expression>,
    ) -> Result<Value, TideError> {
        let table = self.table::<R>()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::operation_span("sum", &table).entered();
        self.backend.sum(&table, column, filter)
    }

    /// Run a raw query. Backend errors carry the query text.
    ///
    /// # Errors
    ///
    /// Backend errors.
    pub fn query(&self, query: &str) -> Result<Vec<Row>, TideError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::raw_query_span(query).entered();
        log::debug!("raw query: {query}");

        self.backend.query(query).map_err(|e| e.with_query(query))
    }

    /// Run a raw query and map each row to `R`.
    ///
    /// # Errors
    ///
    /// Backend, lookup or conversion errors.
    pub fn query_as<R: Record>(&self, query: &str) -> Result<Vec<R>, TideError> {
        let rows = self.query(query)?;
        self.mapper().from_rows(rows)
    }

    /// Escape a string for a raw query literal.
    #[must_use]
    pub fn sanitize(&self, value: &str) -> String {
        self.backend.sanitize_string(value)
    }
}
