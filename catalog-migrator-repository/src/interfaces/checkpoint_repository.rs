use crate::errors::CheckpointRepositoryError;
use catalog_migrator_shared::types::LessonStatus;
use std::collections::HashSet;

/// Trait for interacting with the checkpoint repository.
///
/// Checkpoints record the outcome of each lesson under a run id, so that an
/// interrupted run can be resumed without reprocessing finished lessons.
#[async_trait::async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Lesson ids recorded as fully migrated under `run_id`.
    async fn completed_lessons(&self, run_id: &str) -> Result<HashSet<i64>, CheckpointRepositoryError>;

    async fn get_checkpoint(&self, run_id: &str, lesson_id: i64) -> Result<Option<LessonStatus>, CheckpointRepositoryError>;

    async fn save_checkpoint(
        &self,
        run_id: &str,
        lesson_id: i64,
        status: LessonStatus,
    ) -> Result<(), CheckpointRepositoryError>;
}
