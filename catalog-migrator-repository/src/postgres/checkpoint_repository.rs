//! PostgreSQL implementation of the checkpoint repository.
//!
//! Stores per-lesson outcomes in `migration_checkpoints` so that a run can be
//! resumed after an interruption or abort.
use std::collections::HashSet;

use async_trait::async_trait;
use catalog_migrator_shared::types::LessonStatus;

use crate::{CheckpointRepository, CheckpointRepositoryError};

/// PostgreSQL-backed checkpoint repository.
pub struct PostgresCheckpointRepository {
    /// PostgreSQL connection pool
    pool: sqlx::PgPool,
}

impl PostgresCheckpointRepository {
    /// Creates a new PostgreSQL checkpoint repository instance.
    ///
    /// # Arguments
    ///
    /// * `pool` - Pool connected to the target database (`migration_checkpoints` table)
    pub async fn new(pool: sqlx::PgPool) -> Result<Self, CheckpointRepositoryError> {
        Ok(Self { pool })
    }
}

#[async_trait]
impl CheckpointRepository for PostgresCheckpointRepository {
    async fn completed_lessons(&self, run_id: &str) -> Result<HashSet<i64>, CheckpointRepositoryError> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT lesson_id FROM migration_checkpoints WHERE run_id = $1 AND status = $2")
                .bind(run_id)
                .bind(LessonStatus::Migrated.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().collect())
    }

    async fn get_checkpoint(
        &self,
        run_id: &str,
        lesson_id: i64,
    ) -> Result<Option<LessonStatus>, CheckpointRepositoryError> {
        let status: Option<String> = sqlx::query_scalar(
            "SELECT status FROM migration_checkpoints WHERE run_id = $1 AND lesson_id = $2",
        )
        .bind(run_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        status
            .map(|s| s.parse::<LessonStatus>().map_err(CheckpointRepositoryError::InvalidStatus))
            .transpose()
    }

    async fn save_checkpoint(
        &self,
        run_id: &str,
        lesson_id: i64,
        status: LessonStatus,
    ) -> Result<(), CheckpointRepositoryError> {
        sqlx::query(
            "INSERT INTO migration_checkpoints (run_id, lesson_id, status) VALUES ($1, $2, $3) \
             ON CONFLICT (run_id, lesson_id) DO UPDATE SET status = EXCLUDED.status, updated_at = NOW()",
        )
        .bind(run_id)
        .bind(lesson_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
