//! Type metadata registry.
//!
//! Maps a registered record type to its [`TableMetadata`]. One insertion per type
//! (normally at startup), unbounded lookups afterward. The registry is an owned
//! value: create one per ORM instance, or share one through `Arc`.

use crate::error::TideError;
use crate::record::Record;
use crate::schema::{self, TableMetadata};
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Registry of extracted table metadata, keyed by type identity.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: Mutex<HashMap<TypeId, Arc<TableMetadata>>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TypeId, Arc<TableMetadata>>>, TideError> {
        self.entries
            .lock()
            .map_err(|e| TideError::Internal(format!("Failed to lock type registry: {e}")))
    }

    /// Extract `R`'s metadata and register it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if extraction fails or `R` is already registered.
    pub fn register<R: Record>(&self) -> Result<Arc<TableMetadata>, TideError> {
        let metadata = schema::extract(&R::describe()?)?;
        self.register_metadata::<R>(metadata)
    }

    /// Register pre-extracted metadata for `R`.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::AlreadyRegistered`] if `R` is already registered.
    pub fn register_metadata<R: 'static>(
        &self,
        metadata: TableMetadata,
    ) -> Result<Arc<TableMetadata>, TideError> {
        let mut entries = self.lock()?;
        let id = TypeId::of::<R>();
        if entries.contains_key(&id) {
            return Err(TideError::AlreadyRegistered {
                type_name: type_name::<R>(),
            });
        }
        let metadata = Arc::new(metadata);
        entries.insert(id, Arc::clone(&metadata));
        log::debug!(
            "registered type {} as table {}",
            type_name::<R>(),
            metadata.table_name()
        );
        Ok(metadata)
    }

    /// Look up `R`'s metadata.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::UninitializedType`] if `R` was never registered.
    pub fn lookup<R: 'static>(&self) -> Result<Arc<TableMetadata>, TideError> {
        self.lock()?
            .get(&TypeId::of::<R>())
            .cloned()
            .ok_or(TideError::UninitializedType {
                type_name: type_name::<R>(),
            })
    }

    /// # Errors
    ///
    /// Fails if the registry lock is poisoned.
    pub fn is_registered<R: 'static>(&self) -> Result<bool, TideError> {
        Ok(self.lock()?.contains_key(&TypeId::of::<R>()))
    }

    /// # Errors
    ///
    /// Fails if the registry lock is poisoned.
    pub fn len(&self) -> Result<usize, TideError> {
        Ok(self.lock()?.len())
    }

    /// # Errors
    ///
    /// Fails if the registry lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, TideError> {
        Ok(self.lock()?.is_empty())
    }

    /// Names of all registered tables, sorted.
    ///
    /// # Errors
    ///
    /// Fails if the registry lock is poisoned.
    pub fn registered_tables(&self) -> Result<Vec<String>, TideError> {
        let mut tables: Vec<String> = self
            .lock()?
            .values()
            .map(|m| m.table_name().to_string())
            .collect();
        tables.sort_unstable();
        Ok(tables)
    }

    /// # Errors
    ///
    /// Returns [`TideError::UninitializedType`] if `R` was never registered.
    pub fn table_name<R: 'static>(&self) -> Result<String, TideError> {
        Ok(self.lookup::<R>()?.table_name().to_string())
    }

    /// # Errors
    ///
    /// Returns [`TideError::UninitializedType`] if `R` was never registered.
    pub fn primary_key_column<R: 'static>(&self) -> Result<String, TideError> {
        Ok(self.lookup::<R>()?.primary_key_column().to_string())
    }

    /// # Errors
    ///
    /// Returns [`TideError::UninitializedType`] if `R` was never registered.
    pub fn primary_key_property<R: 'static>(&self) -> Result<String, TideError> {
        Ok(self.lookup::<R>()?.primary_key_property().to_string())
    }

    /// Column name backing `property`.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::UninitializedType`] if `R` was never registered, or
    /// [`TideError::UnknownProperty`] if `property` carries no column tag.
    pub fn column_name<R: 'static>(&self, property: &str) -> Result<String, TideError> {
        self.lookup::<R>()?
            .column_for_property(property)
            .map(|c| c.name.clone())
            .ok_or_else(|| TideError::UnknownProperty {
                type_name: type_name::<R>(),
                property: property.to_string(),
            })
    }

    /// Property backing `column`.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::UninitializedType`] if `R` was never registered, or
    /// [`TideError::UnknownProperty`] if no property maps to `column`.
    pub fn property_name<R: 'static>(&self, column: &str) -> Result<String, TideError> {
        self.lookup::<R>()?
            .property_for_column(column)
            .map(str::to_string)
            .ok_or_else(|| TideError::UnknownProperty {
                type_name: type_name::<R>(),
                property: column.to_string(),
            })
    }
}
