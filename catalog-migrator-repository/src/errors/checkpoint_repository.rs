use thiserror::Error;

#[derive(Debug, Error)]
/// Failures reading or recording per-lesson checkpoints.
pub enum CheckpointRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Invalid checkpoint status: {0}")]
    InvalidStatus(String),
}

impl CheckpointRepositoryError {
    pub fn is_durability_failure(&self) -> bool {
        match self {
            CheckpointRepositoryError::DatabaseError(e) => super::is_connection_failure(e),
            CheckpointRepositoryError::InvalidStatus(_) => false,
        }
    }
}
