//! Storage backend interface.
//!
//! The mapping core never talks to a database itself. Everything that touches
//! storage goes through [`StorageBackend`], which a dialect implements once; the
//! [`Orm`](crate::Orm) dispatcher is generic over it.
//!
//! Backend errors pass through unchanged, wrapped in [`TideError::Backend`].

pub mod memory;

pub use memory::MemoryBackend;

use crate::error::TideError;
use crate::query::{Expression, OrderBy};
use crate::schema::ColumnDefinition;
use crate::value::{Row, TimestampFormat, Value, ValueMap};

/// A storage dialect.
///
/// Calls are synchronous. Cancellation and timeouts, if any, belong to the
/// implementation.
pub trait StorageBackend: TimestampFormat + Send + Sync {
    /// Create `table` with the given columns.
    ///
    /// # Errors
    ///
    /// Backend-specific; typically fails if the table already exists.
    fn create_table(&self, table: &str, columns: &[ColumnDefinition]) -> Result<(), TideError>;

    /// # Errors
    ///
    /// Backend-specific.
    fn table_exists(&self, table: &str) -> Result<bool, TideError>;

    /// Column definitions of an existing table.
    ///
    /// # Errors
    ///
    /// Fails if the table does not exist.
    fn describe_table(&self, table: &str) -> Result<Vec<ColumnDefinition>, TideError>;

    /// Insert one row and return it as stored (generated key included).
    ///
    /// # Errors
    ///
    /// Backend-specific (unknown table or column, constraint violation, ...).
    fn insert(&self, table: &str, values: &ValueMap) -> Result<Row, TideError>;

    /// Update matching rows; returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn update(&self, table: &str, values: &ValueMap, filter: &Expression)
        -> Result<u64, TideError>;

    /// Delete matching rows; returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn delete(&self, table: &str, filter: &Expression) -> Result<u64, TideError>;

    /// Select rows matching `filter` (all rows if `None`), ordered, then paged.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn select(
        &self,
        table: &str,
        skip: Option<usize>,
        limit: Option<usize>,
        filter: Option<&Expression>,
        order: &[OrderBy],
    ) -> Result<Vec<Row>, TideError>;

    /// # Errors
    ///
    /// Backend-specific.
    fn count(&self, table: &str, filter: Option<&Expression>) -> Result<u64, TideError>;

    /// Sum of `column` over matching rows; [`Value::Null`] when nothing matches.
    ///
    /// # Errors
    ///
    /// Backend-specific.
    fn sum(&self, table: &str, column: &str, filter: Option<&Expression>)
        -> Result<Value, TideError>;

    /// # Errors
    ///
    /// Backend-specific.
    fn exists(&self, table: &str, filter: Option<&Expression>) -> Result<bool, TideError> {
        Ok(self.count(table, filter)? > 0)
    }

    /// Run a raw query in the backend's own dialect.
    ///
    /// # Errors
    ///
    /// Backend-specific; errors should carry the query text (see [`TideError::with_query`]).
    fn query(&self, query: &str) -> Result<Vec<Row>, TideError>;

    /// Escape a string for inclusion in a raw query literal.
    fn sanitize_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }
}
