//! Error types for condql

use thiserror::Error;

/// Result type alias for condql operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Error types for query authoring and execution
#[derive(Debug, Error)]
pub enum QueryError {
    /// An identifier used in an authoring block matches neither a column
    /// nor a relation of the bound entity
    #[error("Unknown column or relation '{name}' for entity '{entity}'")]
    UnknownReference { name: String, entity: String },

    /// Pagination requested with an unusable page size
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    /// Schema or builder misuse
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error surfaced by the host ORM, passed through unchanged
    #[error("Query error: {0}")]
    External(#[from] tokio_postgres::Error),

    /// Any other failure from the external collaborator
    #[error("{0}")]
    Backend(String),
}

impl QueryError {
    /// Create an unknown-reference error for a specific entity
    pub fn unknown_reference(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::UnknownReference {
            name: name.into(),
            entity: entity.into(),
        }
    }

    /// Create an invalid-pagination error
    pub fn invalid_pagination(message: impl Into<String>) -> Self {
        Self::InvalidPagination(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Check if this is an unknown-reference error
    pub fn is_unknown_reference(&self) -> bool {
        matches!(self, Self::UnknownReference { .. })
    }

    /// Check if this is an invalid-pagination error
    pub fn is_invalid_pagination(&self) -> bool {
        matches!(self, Self::InvalidPagination(_))
    }
}
