//! Orchestrator module for the catalog migration.
//!
//! Drives the reader, mapper and upsert engine one lesson at a time,
//! checkpoints each lesson, and assembles the run report.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use catalog_migrator_repository::CheckpointRepository;
use catalog_migrator_shared::types::{
    EntityDraft, Language, LessonDraft, LessonReport, LessonStatus, MigrationReport, MigrationScope,
    RunOutcome, SkipReason, SkippedEntity, UnitDraft,
};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::{LoaderError, OrchestratorError};
use crate::loader::UpsertEngine;
use crate::mapper::map_lesson;
use crate::reader::CatalogReader;

/// Default checkpoint namespace.
pub const DEFAULT_RUN_ID: &str = "kmedia-import";

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Namespace of the checkpoints written and read by the run.
    pub run_id: String,
    /// Skip lessons already checkpointed as migrated under `run_id`.
    pub resume: bool,
    /// Upper bound on the time spent on a single lesson.
    pub lesson_timeout: Duration,
    /// Languages carried into the target. Empty means every language found.
    pub languages: Vec<Language>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            run_id: DEFAULT_RUN_ID.to_string(),
            resume: true,
            lesson_timeout: Duration::from_secs(120),
            languages: Vec::new(),
        }
    }
}

/// States a run moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    EnumerateLessons,
    MapLesson,
    MapContainers,
    MapFileAssets,
    Checkpoint,
    Done,
    Aborted,
    Interrupted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Start => "start",
            RunState::EnumerateLessons => "enumerate_lessons",
            RunState::MapLesson => "map_lesson",
            RunState::MapContainers => "map_containers",
            RunState::MapFileAssets => "map_file_assets",
            RunState::Checkpoint => "checkpoint",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
            RunState::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

/// A failure that stops the whole run.
struct Abort(String);

/// Orchestrator that coordinates a migration run.
///
/// The orchestrator:
/// - Enumerates lessons and skips the ones already checkpointed
/// - Migrates each lesson under a timeout, recording per-lesson failures
/// - Stops writing on the first durability failure
/// - Honours shutdown requests between lessons
pub struct Orchestrator {
    reader: CatalogReader,
    engine: UpsertEngine,
    checkpoints: Arc<dyn CheckpointRepository>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Orchestrator {
    pub fn new(reader: CatalogReader, engine: UpsertEngine, checkpoints: Arc<dyn CheckpointRepository>) -> Self {
        Self::with_config(reader, engine, checkpoints, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        reader: CatalogReader,
        engine: UpsertEngine,
        checkpoints: Arc<dyn CheckpointRepository>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            reader,
            engine,
            checkpoints,
            config,
            shutdown_tx,
        }
    }

    /// A sender that requests a shutdown at the next lesson boundary.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the migration over `scope`.
    ///
    /// Per-lesson failures are recorded in the report and never returned as
    /// errors. The report's outcome tells whether the run completed, was
    /// aborted by a durability failure, or was interrupted.
    #[instrument(skip(self), fields(run_id = %self.config.run_id))]
    pub async fn run(&self, scope: MigrationScope) -> Result<MigrationReport, OrchestratorError> {
        let mut report = MigrationReport::new(self.config.run_id.clone(), scope);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        self.enter(RunState::Start, None);

        self.enter(RunState::EnumerateLessons, None);
        let mut cursor = self.reader.open(&scope).await?;

        match self.reader.orphaned_containers().await {
            Ok(orphans) => {
                if !orphans.is_empty() {
                    warn!(count = orphans.len(), "Legacy containers without a lesson will not be migrated");
                }
                report.orphaned_containers = orphans;
            }
            Err(e) if e.is_durability_failure() => return Err(e.into()),
            Err(e) => warn!(error = %e, "Failed to list orphaned containers"),
        }

        if self.config.resume {
            let completed = self.checkpoints.completed_lessons(&self.config.run_id).await?;
            for lesson_id in cursor.exclude(&completed) {
                debug!(lesson_id, "Lesson already migrated");
                report.push_lesson(LessonReport::already_migrated(lesson_id));
            }
        }

        info!(lessons = cursor.remaining(), already_migrated = report.already_migrated(), "Starting migration");

        while let Some(lesson_id) = cursor.next() {
            if shutdown_requested(&mut shutdown_rx) {
                report.outcome = RunOutcome::Interrupted;
                break;
            }

            let lesson = match tokio::time::timeout(self.config.lesson_timeout, self.migrate_lesson(lesson_id)).await {
                Ok(Ok(lesson)) => lesson,
                Ok(Err(Abort(reason))) => {
                    error!(lesson_id, reason = %reason, "Durability failure, aborting run");
                    report.push_lesson(LessonReport::failed(lesson_id, reason.clone()));
                    report.outcome = RunOutcome::Aborted { reason };
                    break;
                }
                Err(_) => {
                    error!(lesson_id, timeout_secs = self.config.lesson_timeout.as_secs(), "Lesson timed out");
                    LessonReport::failed(
                        lesson_id,
                        format!("timed out after {}s", self.config.lesson_timeout.as_secs()),
                    )
                }
            };

            self.enter(RunState::Checkpoint, Some(lesson_id));
            let checkpoint = self
                .checkpoints
                .save_checkpoint(&self.config.run_id, lesson_id, lesson.status)
                .await;
            let status = lesson.status;
            report.push_lesson(lesson);

            if let Err(e) = checkpoint {
                if e.is_durability_failure() {
                    error!(lesson_id, error = %e, "Failed to save checkpoint, aborting run");
                    report.outcome = RunOutcome::Aborted { reason: e.to_string() };
                    break;
                }
                warn!(lesson_id, error = %e, "Failed to save checkpoint");
            }

            info!(lesson_id, status = %status, "Lesson processed");
        }

        report.finished_at = Some(Utc::now());
        let final_state = match report.outcome {
            RunOutcome::Done => RunState::Done,
            RunOutcome::Aborted { .. } => RunState::Aborted,
            RunOutcome::Interrupted => RunState::Interrupted,
        };
        self.enter(final_state, None);

        info!(
            migrated = report.fully_migrated(),
            partially_migrated = report.partially_migrated(),
            failed = report.failed(),
            already_migrated = report.already_migrated(),
            skipped_entities = report.skipped_entities(),
            "Migration finished"
        );
        Ok(report)
    }

    fn enter(&self, state: RunState, lesson_id: Option<i64>) {
        debug!(state = %state, lesson_id, "Run state");
    }

    /// Migrates one lesson. Everything except a durability failure ends up in
    /// the returned report.
    #[instrument(skip(self))]
    async fn migrate_lesson(&self, lesson_id: i64) -> Result<LessonReport, Abort> {
        self.enter(RunState::MapLesson, Some(lesson_id));
        let tree = match self.reader.expand(lesson_id).await {
            Ok(tree) => tree,
            Err(e) if e.is_durability_failure() => return Err(Abort(e.to_string())),
            Err(e) => {
                error!(lesson_id, error = %e, "Failed to read lesson");
                return Ok(LessonReport::failed(lesson_id, e.to_string()));
            }
        };

        let mut lesson = LessonReport {
            lesson_id,
            status: LessonStatus::Migrated,
            collection_id: None,
            counts: Default::default(),
            skipped: tree
                .issues
                .iter()
                .map(|issue| SkippedEntity {
                    key: issue.key,
                    reason: SkipReason::Structural(issue.reason.clone()),
                })
                .collect(),
            error: None,
        };

        let LessonDraft { collection, units } = map_lesson(&tree, &self.config.languages);
        let collection_key = collection.key;
        match self.engine.upsert(&EntityDraft::Collection(collection)).await {
            Ok(upserted) => {
                lesson.collection_id = Some(upserted.id);
                lesson.counts.record(collection_key.kind, upserted.created);
            }
            Err(e) if e.is_durability_failure() => return Err(Abort(e.to_string())),
            Err(e) => {
                error!(lesson_id, legacy_key = %collection_key, error = %e, "Failed to write collection");
                return Ok(LessonReport::failed(lesson_id, e.to_string()));
            }
        }

        self.enter(RunState::MapContainers, Some(lesson_id));
        for UnitDraft { unit, files } in units {
            let unit_key = unit.key;
            match self.engine.upsert(&EntityDraft::ContentUnit(unit)).await {
                Ok(upserted) => lesson.counts.record(unit_key.kind, upserted.created),
                Err(e) => {
                    check_durability(&e)?;
                    warn!(lesson_id, legacy_key = %unit_key, error = %e, "Skipping container");
                    lesson.skipped.push(SkippedEntity {
                        key: unit_key,
                        reason: e.skip_reason(),
                    });
                    lesson.skipped.extend(files.iter().map(|file| SkippedEntity {
                        key: file.key,
                        reason: SkipReason::ParentSkipped(unit_key),
                    }));
                    continue;
                }
            }

            self.enter(RunState::MapFileAssets, Some(lesson_id));
            for file in files {
                let file_key = file.key;
                match self.engine.upsert(&EntityDraft::File(file)).await {
                    Ok(upserted) => lesson.counts.record(file_key.kind, upserted.created),
                    Err(e) => {
                        check_durability(&e)?;
                        warn!(lesson_id, legacy_key = %file_key, error = %e, "Skipping file asset");
                        lesson.skipped.push(SkippedEntity {
                            key: file_key,
                            reason: e.skip_reason(),
                        });
                    }
                }
            }
        }

        if !lesson.skipped.is_empty() {
            lesson.status = LessonStatus::PartiallyMigrated;
        }
        Ok(lesson)
    }
}

fn check_durability(error: &LoaderError) -> Result<(), Abort> {
    if error.is_durability_failure() {
        return Err(Abort(error.to_string()));
    }
    Ok(())
}

fn shutdown_requested(shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
    match shutdown_rx.try_recv() {
        Ok(()) | Err(TryRecvError::Lagged(_)) => {
            info!("Received shutdown signal");
            true
        }
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
    }
}
