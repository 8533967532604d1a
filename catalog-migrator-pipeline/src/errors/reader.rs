//! Error types for the reader module of the Catalog Migrator Pipeline.
use catalog_migrator_repository::SourceCatalogError;
use thiserror::Error;

/// Represents errors that can occur while reading a lesson from the legacy
/// catalog.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Source catalog error: {0}")]
    Source(#[from] SourceCatalogError),

    #[error("Virtual lesson {0} does not exist")]
    LessonNotFound(i64),
}

impl ReaderError {
    pub fn is_durability_failure(&self) -> bool {
        match self {
            ReaderError::Source(e) => e.is_durability_failure(),
            ReaderError::LessonNotFound(_) => false,
        }
    }
}
