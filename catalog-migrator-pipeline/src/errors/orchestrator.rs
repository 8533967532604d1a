//! Error types for the orchestrator module of the Catalog Migrator Pipeline.
//! Lesson-level failures never surface here: they are recorded in the run
//! report. Only failures that prevent the run from starting do.
use catalog_migrator_repository::CheckpointRepositoryError;
use thiserror::Error;

use crate::errors::ReaderError;

/// Represents errors that stop a run before any lesson is processed.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Failed to enumerate lessons: {0}")]
    Enumerate(#[from] ReaderError),

    #[error("Failed to load checkpoints: {0}")]
    Checkpoint(#[from] CheckpointRepositoryError),
}
