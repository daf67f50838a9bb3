//! Span helpers for dispatched backend calls (`tracing` feature).

use tracing::Span;

/// Span wrapping one dispatcher operation against one table.
pub(crate) fn operation_span(operation: &'static str, table: &str) -> Span {
    tracing::debug_span!("tidemark.operation", operation, table)
}

/// Span wrapping a raw query handed to the backend.
pub(crate) fn raw_query_span(query: &str) -> Span {
    tracing::debug_span!("tidemark.query", query)
}

/// Span wrapping type registration.
pub(crate) fn register_span(type_name: &'static str) -> Span {
    tracing::debug_span!("tidemark.register", type_name)
}
