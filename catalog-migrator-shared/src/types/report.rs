//! The summary produced by a migration run.
use crate::types::{EntityKind, LegacyKey, MigrationScope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of one lesson. Also the value stored in a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    /// Every node of the lesson was migrated.
    Migrated,
    /// The collection was migrated but some descendants were skipped.
    PartiallyMigrated,
    /// The lesson could not be migrated at all.
    Failed,
    /// Skipped because a checkpoint records it as migrated.
    AlreadyMigrated,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Migrated => "migrated",
            LessonStatus::PartiallyMigrated => "partially_migrated",
            LessonStatus::Failed => "failed",
            LessonStatus::AlreadyMigrated => "already_migrated",
        }
    }
}

impl FromStr for LessonStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "migrated" => Ok(LessonStatus::Migrated),
            "partially_migrated" => Ok(LessonStatus::PartiallyMigrated),
            "failed" => Ok(LessonStatus::Failed),
            "already_migrated" => Ok(LessonStatus::AlreadyMigrated),
            other => Err(format!("unknown lesson status: {other}")),
        }
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a legacy node was not migrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Broken legacy hierarchy (missing record, asset claimed twice, ...).
    Structural(String),
    /// A translation referenced a sequence id that no longer exists, and the
    /// retry with a fresh id failed as well.
    DanglingSequence(i64),
    /// The target write could not be parented correctly.
    ReferentialIntegrity(String),
    /// The parent of this node was skipped.
    ParentSkipped(LegacyKey),
    /// Any other write failure.
    Write(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Structural(reason) => write!(f, "structural: {reason}"),
            SkipReason::DanglingSequence(id) => write!(f, "dangling sequence id {id}"),
            SkipReason::ReferentialIntegrity(reason) => write!(f, "referential integrity: {reason}"),
            SkipReason::ParentSkipped(parent) => write!(f, "parent {parent} skipped"),
            SkipReason::Write(reason) => write!(f, "write failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub key: LegacyKey,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertCounts {
    pub created: u64,
    pub updated: u64,
}

impl UpsertCounts {
    pub fn total(&self) -> u64 {
        self.created + self.updated
    }
}

/// Created/updated counts per target entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub collections: UpsertCounts,
    pub content_units: UpsertCounts,
    pub files: UpsertCounts,
}

impl EntityCounts {
    /// Records one upsert of the target entity a legacy `kind` maps to.
    pub fn record(&mut self, kind: EntityKind, created: bool) {
        let counts = match kind {
            EntityKind::VirtualLesson => &mut self.collections,
            EntityKind::Container => &mut self.content_units,
            EntityKind::FileAsset => &mut self.files,
        };
        if created {
            counts.created += 1;
        } else {
            counts.updated += 1;
        }
    }

    pub fn merge(&mut self, other: &EntityCounts) {
        for (mine, theirs) in [
            (&mut self.collections, &other.collections),
            (&mut self.content_units, &other.content_units),
            (&mut self.files, &other.files),
        ] {
            mine.created += theirs.created;
            mine.updated += theirs.updated;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonReport {
    pub lesson_id: i64,
    pub status: LessonStatus,
    pub collection_id: Option<i64>,
    pub counts: EntityCounts,
    pub skipped: Vec<SkippedEntity>,
    /// Set when the lesson failed as a whole.
    pub error: Option<String>,
}

impl LessonReport {
    pub fn already_migrated(lesson_id: i64) -> Self {
        Self {
            lesson_id,
            status: LessonStatus::AlreadyMigrated,
            collection_id: None,
            counts: EntityCounts::default(),
            skipped: Vec::new(),
            error: None,
        }
    }

    pub fn failed(lesson_id: i64, error: impl Into<String>) -> Self {
        Self {
            lesson_id,
            status: LessonStatus::Failed,
            collection_id: None,
            counts: EntityCounts::default(),
            skipped: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every enumerated lesson was processed.
    Done,
    /// A durability failure stopped the run.
    Aborted { reason: String },
    /// A shutdown signal stopped the run at a lesson boundary.
    Interrupted,
}

/// Process exit status derived from a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    LessonsFailed,
    Aborted,
    Interrupted,
}

impl ExitStatus {
    pub fn code(&self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::LessonsFailed => 1,
            ExitStatus::Aborted => 2,
            ExitStatus::Interrupted => 130,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub run_id: String,
    pub scope: MigrationScope,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub lessons: Vec<LessonReport>,
    /// Legacy containers whose lesson does not exist.
    pub orphaned_containers: Vec<i64>,
    pub counts: EntityCounts,
}

impl MigrationReport {
    pub fn new(run_id: impl Into<String>, scope: MigrationScope) -> Self {
        Self {
            run_id: run_id.into(),
            scope,
            outcome: RunOutcome::Done,
            started_at: Utc::now(),
            finished_at: None,
            lessons: Vec::new(),
            orphaned_containers: Vec::new(),
            counts: EntityCounts::default(),
        }
    }

    pub fn push_lesson(&mut self, lesson: LessonReport) {
        self.counts.merge(&lesson.counts);
        self.lessons.push(lesson);
    }

    pub fn count_with_status(&self, status: LessonStatus) -> usize {
        self.lessons.iter().filter(|l| l.status == status).count()
    }

    pub fn fully_migrated(&self) -> usize {
        self.count_with_status(LessonStatus::Migrated)
    }

    pub fn partially_migrated(&self) -> usize {
        self.count_with_status(LessonStatus::PartiallyMigrated)
    }

    pub fn failed(&self) -> usize {
        self.count_with_status(LessonStatus::Failed)
    }

    pub fn already_migrated(&self) -> usize {
        self.count_with_status(LessonStatus::AlreadyMigrated)
    }

    pub fn skipped_entities(&self) -> usize {
        self.lessons.iter().map(|l| l.skipped.len()).sum()
    }

    pub fn exit_status(&self) -> ExitStatus {
        match self.outcome {
            RunOutcome::Aborted { .. } => ExitStatus::Aborted,
            RunOutcome::Interrupted => ExitStatus::Interrupted,
            RunOutcome::Done if self.failed() > 0 => ExitStatus::LessonsFailed,
            RunOutcome::Done => ExitStatus::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(lesson_id: i64, status: LessonStatus) -> LessonReport {
        LessonReport {
            lesson_id,
            status,
            collection_id: Some(lesson_id),
            counts: EntityCounts::default(),
            skipped: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_exit_status_success_with_partial_lessons() {
        let mut report = MigrationReport::new("run", MigrationScope::All);
        report.push_lesson(lesson(1, LessonStatus::Migrated));
        report.push_lesson(lesson(2, LessonStatus::PartiallyMigrated));
        report.push_lesson(lesson(3, LessonStatus::AlreadyMigrated));

        assert_eq!(report.exit_status(), ExitStatus::Success);
        assert_eq!(report.exit_status().code(), 0);
        assert_eq!(report.fully_migrated(), 1);
        assert_eq!(report.partially_migrated(), 1);
        assert_eq!(report.already_migrated(), 1);
    }

    #[test]
    fn test_exit_status_reflects_failed_lessons() {
        let mut report = MigrationReport::new("run", MigrationScope::All);
        report.push_lesson(lesson(1, LessonStatus::Migrated));
        report.push_lesson(LessonReport::failed(2, "boom"));

        assert_eq!(report.exit_status(), ExitStatus::LessonsFailed);
        assert_eq!(report.exit_status().code(), 1);
    }

    #[test]
    fn test_exit_status_aborted_wins() {
        let mut report = MigrationReport::new("run", MigrationScope::Lesson(7));
        report.push_lesson(LessonReport::failed(7, "boom"));
        report.outcome = RunOutcome::Aborted { reason: "counter unreachable".to_string() };

        assert_eq!(report.exit_status(), ExitStatus::Aborted);
        assert_eq!(report.exit_status().code(), 2);
    }

    #[test]
    fn test_push_lesson_merges_counts() {
        let mut report = MigrationReport::new("run", MigrationScope::All);
        let mut first = lesson(1, LessonStatus::Migrated);
        first.counts.record(EntityKind::VirtualLesson, true);
        first.counts.record(EntityKind::Container, true);
        let mut second = lesson(2, LessonStatus::Migrated);
        second.counts.record(EntityKind::VirtualLesson, false);
        second.counts.record(EntityKind::FileAsset, true);

        report.push_lesson(first);
        report.push_lesson(second);

        assert_eq!(report.counts.collections, UpsertCounts { created: 1, updated: 1 });
        assert_eq!(report.counts.content_units.total(), 1);
        assert_eq!(report.counts.files.created, 1);
    }

    #[test]
    fn test_lesson_status_round_trips_through_column_value() {
        for status in [
            LessonStatus::Migrated,
            LessonStatus::PartiallyMigrated,
            LessonStatus::Failed,
            LessonStatus::AlreadyMigrated,
        ] {
            assert_eq!(status.as_str().parse::<LessonStatus>().unwrap(), status);
        }
    }
}
