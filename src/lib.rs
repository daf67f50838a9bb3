//! # tidemark
//!
//! Typed record mapping and a filter expression algebra for interchangeable SQL
//! storage backends.
//!
//! A record type declares its table and column tags once ([`Record::describe`]).
//! Registration extracts validated [`TableMetadata`] into a [`TypeRegistry`];
//! after that the [`RecordMapper`] converts records to backend value maps and rows
//! back to records, coercing every value by its column's [`DataType`]. Filters are
//! [`Expression`] trees that any [`StorageBackend`] can evaluate or render.
//!
//! ## Modules
//!
//! - **`schema`** - tags, data types, extraction into table metadata
//! - **`value`** - storage values, property values, the coercion engine
//! - **`query`** - expression algebra and ordering
//! - **`mapper`** - record ↔ value map / row conversion
//! - **`backend`** - the storage backend trait and an in-memory backend
//! - **`orm`** - the typed dispatcher over a backend
//!
//! ## Example
//!
//! ```
//! use tidemark::{
//!     ColumnTag, DataType, Expression, MemoryBackend, Orm, Record, RecordDescriptor,
//!     TableTag, TideError,
//! };
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Person {
//!     id: i32,
//!     first_name: String,
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
//!             ))
//!     }
//!
//!     tidemark::record_accessors!(id, first_name);
//! }
//!
//! # fn main() -> Result<(), TideError> {
//! let orm = Orm::new(MemoryBackend::new());
//! orm.register_type::<Person>()?;
//! let ada = orm.insert(&Person { id: 0, first_name: "Ada".into() })?;
//! assert_eq!(ada.id, 1);
//!
//! let found: Vec<Person> =
//!     orm.select_many(Some(&Expression::starts_with("firstname", "A")), &[], None, None)?;
//! assert_eq!(found, vec![ada]);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod json_helpers;
pub mod mapper;
pub mod orm;
pub mod query;
pub mod record;
pub mod registry;
pub mod schema;
#[cfg(feature = "tracing")]
mod tracing_helpers;
pub mod value;

pub use backend::{MemoryBackend, StorageBackend};
pub use config::{MapperSettings, NullHandling};
pub use error::{ErrorKind, TideError};
pub use mapper::RecordMapper;
pub use orm::Orm;
pub use query::{Direction, Expression, LeftTerm, Operator, OrderBy, RightTerm};
pub use record::Record;
pub use registry::TypeRegistry;
pub use schema::{
    ColumnDefinition, ColumnTag, ColumnTagBuilder, DataType, RecordDescriptor, TableMetadata,
    TableTag,
};
pub use value::{
    DbEnum, DefaultTimestamps, EnumValue, FromProperty, PropertyValue, Row, TimestampFormat,
    ToProperty, Value, ValueMap,
};
