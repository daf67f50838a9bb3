//! Value type system for tidemark
//!
//! ## Modules
//!
//! - **`types`** - Storage [`Value`], in-memory [`PropertyValue`], rows and value maps
//! - **`property`** - [`ToProperty`] / [`FromProperty`] for typed record fields
//! - **`enums`** - [`DbEnum`] and the `db_enum!` macro
//! - **`timestamp`** - [`TimestampFormat`] supplied by storage backends
//! - **`coercion`** - the coercion engine, keyed by column data type

pub mod coercion;
pub mod enums;
pub mod property;
pub mod timestamp;
pub mod types;

pub use coercion::{check_storage, from_storage, guid_from_storage, to_storage};
pub use enums::DbEnum;
pub use property::{FromProperty, ToProperty};
pub use timestamp::{DefaultTimestamps, TimestampFormat};
pub use types::{EnumValue, PropertyValue, Row, Value, ValueMap};
