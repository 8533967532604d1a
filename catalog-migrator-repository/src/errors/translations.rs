//! Error types for the translation store.
use thiserror::Error;

/// Translation store failures.
#[derive(Debug, Error)]
pub enum TranslationRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// An update referenced a sequence id with no stored translation.
    #[error("Dangling sequence id: {0}")]
    DanglingSequence(i64),

    /// The durable sequence counter is missing or its server dropped the
    /// session.
    #[error("Sequence counter unavailable: {0}")]
    Unavailable(String),
}

impl TranslationRepositoryError {
    /// Whether sequence ids issued from now on can no longer be trusted.
    pub fn is_durability_failure(&self) -> bool {
        match self {
            TranslationRepositoryError::DatabaseError(e) => super::is_connection_failure(e),
            TranslationRepositoryError::DanglingSequence(_) => false,
            TranslationRepositoryError::Unavailable(_) => true,
        }
    }
}
