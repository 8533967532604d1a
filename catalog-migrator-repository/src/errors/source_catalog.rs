//! Error types for the legacy source catalog.
use thiserror::Error;

/// Represents errors that can occur while reading the legacy catalog.
///
/// Missing or doubly linked records are not errors at this level: the reader
/// reports them as structural issues of the lesson being expanded.
#[derive(Debug, Error)]
pub enum SourceCatalogError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl SourceCatalogError {
    /// Whether the source store can no longer be reached.
    pub fn is_durability_failure(&self) -> bool {
        match self {
            SourceCatalogError::DatabaseError(e) => super::is_connection_failure(e),
        }
    }
}
