//! Error types for the target catalog.
use catalog_migrator_shared::types::LegacyKey;
use thiserror::Error;

/// Represents errors that can occur within the target catalog repository.
#[derive(Debug, Error)]
pub enum TargetRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    /// The write would leave a row pointing at a parent that does not exist.
    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    /// Another writer created the row for this key first.
    #[error("Legacy key {key} is already mapped to target id {target_id}")]
    DuplicateLegacyKey { key: LegacyKey, target_id: i64 },

    /// A legacy key maps to a target row that no longer exists.
    #[error("Legacy key {key} maps to missing target id {target_id}")]
    StaleMapping { key: LegacyKey, target_id: i64 },

    /// The server dropped or refused the session.
    #[error("Target store unavailable: {0}")]
    Unavailable(String),
}

impl TargetRepositoryError {
    /// Whether no further writes should be attempted.
    pub fn is_durability_failure(&self) -> bool {
        match self {
            TargetRepositoryError::DatabaseError(e) => super::is_connection_failure(e),
            TargetRepositoryError::Unavailable(_) => true,
            _ => false,
        }
    }
}

impl From<sqlx::Error> for TargetRepositoryError {
    fn from(error: sqlx::Error) -> Self {
        if let Some(db_error) = error.as_database_error() {
            if db_error.is_foreign_key_violation() {
                return TargetRepositoryError::ReferentialIntegrity(db_error.message().to_string());
            }
            if db_error.code().is_some_and(|code| super::is_unavailable_sqlstate(&code)) {
                return TargetRepositoryError::Unavailable(db_error.message().to_string());
            }
        }
        TargetRepositoryError::DatabaseError(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_durability_failures() {
        let error = TargetRepositoryError::from(sqlx::Error::PoolTimedOut);

        assert!(matches!(error, TargetRepositoryError::DatabaseError(_)));
        assert!(error.is_durability_failure());
    }

    #[test]
    fn test_row_level_errors_are_not_durability_failures() {
        assert!(!TargetRepositoryError::from(sqlx::Error::RowNotFound).is_durability_failure());
        assert!(!TargetRepositoryError::ReferentialIntegrity("fk".to_string()).is_durability_failure());
        assert!(TargetRepositoryError::Unavailable("terminating connection".to_string()).is_durability_failure());
    }
}
