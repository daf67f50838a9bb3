//! Extracted table metadata for one registered type.

use super::definition::ColumnDefinition;
use std::collections::HashMap;

/// Immutable schema of one registered record type.
///
/// Columns keep their declaration order. Property and column lookups are O(1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    table_name: String,
    primary_key_property: String,
    columns: Vec<ColumnDefinition>,
    properties: Vec<String>,
    by_property: HashMap<String, usize>,
    by_column: HashMap<String, usize>,
}

impl TableMetadata {
    /// Assemble metadata from `(property, column)` pairs.
    ///
    /// Callers (the schema extractor) are responsible for validating uniqueness and
    /// the primary key; this constructor only indexes.
    pub(crate) fn new(
        table_name: String,
        primary_key_property: String,
        mapped: Vec<(String, ColumnDefinition)>,
    ) -> Self {
        let mut columns = Vec::with_capacity(mapped.len());
        let mut properties = Vec::with_capacity(mapped.len());
        let mut by_property = HashMap::with_capacity(mapped.len());
        let mut by_column = HashMap::with_capacity(mapped.len());
        for (idx, (property, column)) in mapped.into_iter().enumerate() {
            by_property.insert(property.clone(), idx);
            by_column.insert(column.name.clone(), idx);
            properties.push(property);
            columns.push(column);
        }
        Self {
            table_name,
            primary_key_property,
            columns,
            properties,
            by_property,
            by_column,
        }
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[must_use]
    pub fn primary_key_property(&self) -> &str {
        &self.primary_key_property
    }

    /// The primary key column definition.
    #[must_use]
    pub fn primary_key(&self) -> &ColumnDefinition {
        // The extractor guarantees exactly one primary key column
        let idx = self.by_property[&self.primary_key_property];
        &self.columns[idx]
    }

    #[must_use]
    pub fn primary_key_column(&self) -> &str {
        &self.primary_key().name
    }

    /// All columns, in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// `(property, column)` pairs, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnDefinition)> {
        self.properties
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter())
    }

    /// Columns that participate in writes (everything but the primary key).
    pub fn writable(&self) -> impl Iterator<Item = (&str, &ColumnDefinition)> {
        self.iter().filter(|(_, column)| !column.primary_key)
    }

    #[must_use]
    pub fn column_for_property(&self, property: &str) -> Option<&ColumnDefinition> {
        self.by_property.get(property).map(|&idx| &self.columns[idx])
    }

    /// Resolve a column by name.
    ///
    /// Exact matches win; otherwise the lookup falls back to an ASCII
    /// case-insensitive match, since some backends fold identifier case.
    #[must_use]
    pub fn column(&self, column: &str) -> Option<(&str, &ColumnDefinition)> {
        let idx = match self.by_column.get(column) {
            Some(&idx) => idx,
            None => self
                .columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(column))?,
        };
        Some((self.properties[idx].as_str(), &self.columns[idx]))
    }

    #[must_use]
    pub fn property_for_column(&self, column: &str) -> Option<&str> {
        self.column(column).map(|(property, _)| property)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
