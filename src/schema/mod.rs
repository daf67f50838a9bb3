//! Schema metadata: declarative tags, column definitions and extraction.
//!
//! # Structure
//!
//! - `data_type`: the closed set of column storage types
//! - `tags`: table and column tags, validated at construction
//! - `definition`: resolved column definitions (and SeaQuery mapping)
//! - `extract`: descriptor → [`TableMetadata`]
//! - `metadata`: immutable per-type metadata with O(1) lookups

pub mod data_type;
pub mod definition;
pub mod extract;
pub mod metadata;
pub mod tags;
mod type_mapping;

pub use data_type::DataType;
pub use definition::ColumnDefinition;
pub use extract::{extract, RecordDescriptor};
pub use metadata::TableMetadata;
pub use tags::{ColumnTag, ColumnTagBuilder, TableTag};
