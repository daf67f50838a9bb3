//! Error type shared by every tidemark component.
//!
//! Errors are detected locally, before any call reaches a storage backend. The
//! only variant that originates elsewhere is [`TideError::Backend`], which wraps
//! the backend's own error unmodified and optionally carries the query text that
//! produced it.

use std::error::Error;
use std::fmt;

/// Broad classification of a [`TideError`].
///
/// None of the kinds produced by the mapping core are transient; retry policy, if
/// any, belongs to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid tags or registration mistakes, raised at registration time
    Configuration,
    /// A mapping call targeted a type that was never registered
    Lookup,
    /// A value could not be coerced to or from its storage representation
    Conversion,
    /// A required input was missing or empty
    Argument,
    /// Error raised by the storage backend
    Backend,
    /// Internal invariant failure (e.g. a poisoned registry lock)
    Internal,
}

/// tidemark error type
#[derive(Debug)]
pub enum TideError {
    /// Declarative tags or descriptors are invalid
    Configuration(String),
    /// The type was registered twice
    AlreadyRegistered {
        type_name: &'static str,
    },
    /// The type was never registered
    UninitializedType {
        type_name: &'static str,
    },
    /// No conversion exists between the column type and the value
    UnsupportedDataType {
        data_type: String,
        detail: String,
    },
    /// A supported conversion failed for this particular value
    ConversionFailure {
        column: String,
        message: String,
    },
    /// The record does not expose a property named by its own metadata
    UnknownProperty {
        type_name: &'static str,
        property: String,
    },
    /// A required argument was missing or empty
    InvalidArgument(String),
    /// Error returned by the storage backend
    Backend {
        source: Box<dyn Error + Send + Sync + 'static>,
        query: Option<String>,
    },
    /// Internal failure, e.g. a poisoned lock
    Internal(String),
}

impl TideError {
    /// Wrap a backend error without query context.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        TideError::Backend {
            source: err.into(),
            query: None,
        }
    }

    /// Attach the offending query text to a backend error.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_query(self, query: impl Into<String>) -> Self {
        match self {
            TideError::Backend { source, .. } => TideError::Backend {
                source,
                query: Some(query.into()),
            },
            other => other,
        }
    }

    pub(crate) fn conversion(column: &str, message: impl Into<String>) -> Self {
        TideError::ConversionFailure {
            column: column.to_string(),
            message: message.into(),
        }
    }

    /// Fill in the column of a conversion failure raised without one.
    pub(crate) fn in_column(self, column: &str) -> Self {
        match self {
            TideError::ConversionFailure { column: c, message } if c.is_empty() => {
                TideError::ConversionFailure {
                    column: column.to_string(),
                    message,
                }
            }
            other => other,
        }
    }

    pub(crate) fn unsupported(data_type: impl fmt::Display, detail: impl Into<String>) -> Self {
        TideError::UnsupportedDataType {
            data_type: data_type.to_string(),
            detail: detail.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            TideError::Configuration(_) | TideError::AlreadyRegistered { .. } => {
                ErrorKind::Configuration
            }
            TideError::UninitializedType { .. } => ErrorKind::Lookup,
            TideError::UnsupportedDataType { .. }
            | TideError::ConversionFailure { .. }
            | TideError::UnknownProperty { .. } => ErrorKind::Conversion,
            TideError::InvalidArgument(_) => ErrorKind::Argument,
            TideError::Backend { .. } => ErrorKind::Backend,
            TideError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Query text attached to a backend error, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        match self {
            TideError::Backend { query, .. } => query.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for TideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TideError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            TideError::AlreadyRegistered { type_name } => {
                write!(f, "Configuration error: type {type_name} is already registered")
            }
            TideError::UninitializedType { type_name } => {
                write!(f, "Uninitialized type: {type_name} has not been registered")
            }
            TideError::UnsupportedDataType { data_type, detail } => {
                write!(f, "Unsupported data type {data_type}: {detail}")
            }
            TideError::ConversionFailure { column, message } => {
                write!(f, "Conversion failure for column {column}: {message}")
            }
            TideError::UnknownProperty { type_name, property } => {
                write!(f, "Type {type_name} has no property named {property}")
            }
            TideError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            TideError::Backend { source, query } => match query {
                Some(q) => write!(f, "Backend error: {source} (query: {q})"),
                None => write!(f, "Backend error: {source}"),
            },
            TideError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl Error for TideError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TideError::Backend { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for TideError {
    fn from(err: config::ConfigError) -> Self {
        TideError::Configuration(err.to_string())
    }
}
