//! Column definition metadata.
//!
//! A `ColumnDefinition` is the resolved form of a [`ColumnTag`](super::ColumnTag):
//! the column name is always known. It is what the registry stores and what a
//! storage backend receives when it creates or describes a table.

use super::data_type::DataType;
use super::type_mapping;
use sea_query::{Alias, ColumnDef};

/// Column definition metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column name in the table
    pub name: String,
    /// Whether this column is the primary key
    pub primary_key: bool,
    /// Declared storage type
    pub data_type: DataType,
    /// Max length (characters for text types, total digits for Decimal/Double)
    pub max_length: Option<u32>,
    /// Precision (digits after the decimal point for Decimal/Double)
    pub precision: Option<u32>,
    /// Whether the column accepts null
    pub nullable: bool,
}

impl ColumnDefinition {
    /// Convert to SeaQuery's `ColumnDef`, for backends that build DDL with SeaQuery.
    ///
    /// Maps the data type, nullability and primary key flag. Integer primary keys are
    /// marked auto-increment, matching how backends assign keys on insert.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidemark::{ColumnDefinition, DataType};
    ///
    /// let def = ColumnDefinition {
    ///     name: "id".to_string(),
    ///     primary_key: true,
    ///     data_type: DataType::Int,
    ///     max_length: None,
    ///     precision: None,
    ///     nullable: false,
    /// };
    /// let column_def = def.to_column_def();
    /// ```
    #[must_use]
    pub fn to_column_def(&self) -> ColumnDef {
        let mut def = ColumnDef::new(Alias::new(self.name.clone()));
        type_mapping::apply_column_type(self, &mut def);

        if self.nullable {
            def.null();
        } else {
            def.not_null();
        }

        if self.primary_key {
            def.primary_key();
            if matches!(self.data_type, DataType::Int | DataType::Long) {
                def.auto_increment();
            }
        }

        def
    }
}
