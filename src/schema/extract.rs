//! Schema extraction: turns a record's descriptor into [`TableMetadata`].

use super::definition::ColumnDefinition;
use super::metadata::TableMetadata;
use super::tags::{ColumnTag, TableTag};
use crate::error::TideError;
use std::collections::HashSet;

/// Registration-time description of a record type: its table tag and the tags on
/// its properties.
///
/// Built fluently inside [`Record::describe`](crate::Record::describe):
///
/// ```
/// use tidemark::{ColumnTag, DataType, RecordDescriptor, TableTag};
///
/// # fn main() -> Result<(), tidemark::TideError> {
/// let descriptor = RecordDescriptor::new()
///     .table(TableTag::new("person")?)
///     .column("id", ColumnTag::builder(DataType::Int).primary_key().build()?)
///     .column(
///         "first_name",
///         ColumnTag::builder(DataType::Nvarchar).name("firstname").max_length(64).build()?,
///     )
///     .untagged("scratch");
/// let metadata = tidemark::schema::extract(&descriptor)?;
/// assert_eq!(metadata.table_name(), "person");
/// assert_eq!(metadata.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordDescriptor {
    table: Option<TableTag>,
    properties: Vec<(String, Option<ColumnTag>)>,
}

impl RecordDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the table tag.
    #[must_use]
    pub fn table(mut self, tag: TableTag) -> Self {
        self.table = Some(tag);
        self
    }

    /// Declare a column-backed property.
    #[must_use]
    pub fn column(mut self, property: impl Into<String>, tag: ColumnTag) -> Self {
        self.properties.push((property.into(), Some(tag)));
        self
    }

    /// Declare a property that carries no column tag; extraction ignores it.
    #[must_use]
    pub fn untagged(mut self, property: impl Into<String>) -> Self {
        self.properties.push((property.into(), None));
        self
    }

    #[must_use]
    pub fn table_tag(&self) -> Option<&TableTag> {
        self.table.as_ref()
    }

    /// Properties and their tags, in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, Option<&ColumnTag>)> {
        self.properties.iter().map(|(p, tag)| (p.as_str(), tag.as_ref()))
    }
}

/// Extract table metadata from a descriptor.
///
/// # Errors
///
/// Returns [`TideError::Configuration`] if:
/// - no table tag is present
/// - zero columns are tagged
/// - no column, or more than one column, carries the primary key flag
/// - a property is tagged twice or two columns resolve to the same name
pub fn extract(descriptor: &RecordDescriptor) -> Result<TableMetadata, TideError> {
    let table = descriptor
        .table
        .as_ref()
        .ok_or_else(|| TideError::Configuration("no table tag is present".to_string()))?;

    let mut seen_properties = HashSet::new();
    let mut seen_columns = HashSet::new();
    let mut primary_key: Option<String> = None;
    let mut mapped = Vec::new();

    for (property, tag) in descriptor.properties() {
        let Some(tag) = tag else {
            continue;
        };
        if !seen_properties.insert(property) {
            return Err(TideError::Configuration(format!(
                "property {property} of table {} is tagged more than once",
                table.name()
            )));
        }

        let name = tag.name().unwrap_or(property).to_string();
        if !seen_columns.insert(name.to_ascii_lowercase()) {
            return Err(TideError::Configuration(format!(
                "column {name} of table {} is declared more than once",
                table.name()
            )));
        }

        if tag.is_primary_key() {
            if let Some(existing) = &primary_key {
                return Err(TideError::Configuration(format!(
                    "table {} declares more than one primary key ({existing}, {property})",
                    table.name()
                )));
            }
            primary_key = Some(property.to_string());
        }

        mapped.push((
            property.to_string(),
            ColumnDefinition {
                name,
                primary_key: tag.is_primary_key(),
                data_type: tag.data_type(),
                max_length: tag.max_length(),
                precision: tag.precision(),
                nullable: tag.is_nullable(),
            },
        ));
    }

    if mapped.is_empty() {
        return Err(TideError::Configuration(format!(
            "no columns are declared for table {}",
            table.name()
        )));
    }

    let primary_key = primary_key.ok_or_else(|| {
        TideError::Configuration(format!("no primary key is declared for table {}", table.name()))
    })?;

    log::debug!(
        "extracted metadata for table {} ({} columns, primary key {})",
        table.name(),
        mapped.len(),
        primary_key
    );

    Ok(TableMetadata::new(table.name().to_string(), primary_key, mapped))
}
