//! Error types for the Catalog Migrator application.
//! Consolidates the errors that can stop a run before or after the
//! orchestrator: configuration, connections, schema migration and the
//! orchestrator itself.
use catalog_migrator_pipeline::errors::OrchestratorError;
use catalog_migrator_repository::{
    CheckpointRepositoryError, SourceCatalogError, TargetRepositoryError, TranslationRepositoryError,
};

#[derive(Debug, thiserror::Error)]
pub enum MigratorError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Schema migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Source catalog error: {0}")]
    SourceCatalog(#[from] SourceCatalogError),
    #[error("Target catalog error: {0}")]
    TargetCatalog(#[from] TargetRepositoryError),
    #[error("Translation repository error: {0}")]
    Translations(#[from] TranslationRepositoryError),
    #[error("Checkpoint repository error: {0}")]
    Checkpoints(#[from] CheckpointRepositoryError),
    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

impl MigratorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
