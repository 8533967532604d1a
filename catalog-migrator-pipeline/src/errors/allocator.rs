//! Error types for the translation sequence allocator.
use catalog_migrator_repository::TranslationRepositoryError;
use thiserror::Error;

/// Represents errors that can occur while allocating sequence ids or storing
/// translations.
#[derive(Debug, Error)]
pub enum AllocatorError {
    #[error("Translation repository error: {0}")]
    Repository(#[from] TranslationRepositoryError),

    /// The durable counter returned an id not greater than one already issued.
    #[error("Sequence counter moved backwards: issued {issued} after {previous}")]
    NonMonotonic { previous: i64, issued: i64 },
}

impl AllocatorError {
    pub fn is_durability_failure(&self) -> bool {
        match self {
            AllocatorError::Repository(e) => e.is_durability_failure(),
            AllocatorError::NonMonotonic { .. } => true,
        }
    }

    /// The sequence id an update found no rows for, if that is the failure.
    pub fn dangling_sequence(&self) -> Option<i64> {
        match self {
            AllocatorError::Repository(TranslationRepositoryError::DanglingSequence(id)) => Some(*id),
            _ => None,
        }
    }
}
