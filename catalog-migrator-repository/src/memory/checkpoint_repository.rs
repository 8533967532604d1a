use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use catalog_migrator_shared::types::LessonStatus;
use tokio::sync::Mutex;

use crate::{CheckpointRepository, CheckpointRepositoryError};

/// Checkpoints held in memory; they do not survive the process.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointRepository {
    checkpoints: Mutex<HashMap<(String, i64), LessonStatus>>,
}

impl InMemoryCheckpointRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointRepository for InMemoryCheckpointRepository {
    async fn completed_lessons(&self, run_id: &str) -> Result<HashSet<i64>, CheckpointRepositoryError> {
        let checkpoints = self.checkpoints.lock().await;
        Ok(checkpoints
            .iter()
            .filter(|((run, _), status)| run == run_id && **status == LessonStatus::Migrated)
            .map(|((_, lesson_id), _)| *lesson_id)
            .collect())
    }

    async fn get_checkpoint(
        &self,
        run_id: &str,
        lesson_id: i64,
    ) -> Result<Option<LessonStatus>, CheckpointRepositoryError> {
        let checkpoints = self.checkpoints.lock().await;
        Ok(checkpoints.get(&(run_id.to_string(), lesson_id)).copied())
    }

    async fn save_checkpoint(
        &self,
        run_id: &str,
        lesson_id: i64,
        status: LessonStatus,
    ) -> Result<(), CheckpointRepositoryError> {
        self.checkpoints
            .lock()
            .await
            .insert((run_id.to_string(), lesson_id), status);
        Ok(())
    }
}
