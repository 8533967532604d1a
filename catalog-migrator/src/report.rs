//! Human readable rendering of a run report.
use std::fmt::Write;

use catalog_migrator_shared::types::{MigrationReport, RunOutcome, UpsertCounts};

/// Renders `report` as the plain text summary printed at the end of a run.
pub fn render_summary(report: &MigrationReport) -> String {
    let mut out = String::new();
    let outcome = match &report.outcome {
        RunOutcome::Done => "done".to_string(),
        RunOutcome::Aborted { reason } => format!("aborted ({reason})"),
        RunOutcome::Interrupted => "interrupted".to_string(),
    };

    let _ = writeln!(out, "Migration run {:?} over {}: {outcome}", report.run_id, report.scope);
    let _ = writeln!(
        out,
        "Lessons: {} migrated, {} partially migrated, {} failed, {} already migrated",
        report.fully_migrated(),
        report.partially_migrated(),
        report.failed(),
        report.already_migrated(),
    );
    let _ = writeln!(out, "Collections: {}", counts(&report.counts.collections));
    let _ = writeln!(out, "Content units: {}", counts(&report.counts.content_units));
    let _ = writeln!(out, "Files: {}", counts(&report.counts.files));

    for lesson in &report.lessons {
        if let Some(error) = &lesson.error {
            let _ = writeln!(out, "  lesson {} failed: {error}", lesson.lesson_id);
        }
        for skipped in &lesson.skipped {
            let _ = writeln!(out, "  lesson {} skipped {}: {}", lesson.lesson_id, skipped.key, skipped.reason);
        }
    }

    if !report.orphaned_containers.is_empty() {
        let ids: Vec<String> = report.orphaned_containers.iter().map(i64::to_string).collect();
        let _ = writeln!(out, "Orphaned containers (not migrated): {}", ids.join(", "));
    }
    out
}

fn counts(counts: &UpsertCounts) -> String {
    format!("{} created, {} updated", counts.created, counts.updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_migrator_shared::types::{
        LegacyKey, LessonReport, LessonStatus, MigrationScope, SkipReason, SkippedEntity,
    };

    #[test]
    fn test_summary_lists_failures_and_skips() {
        let mut report = MigrationReport::new("kmedia-import", MigrationScope::All);
        let mut partial = LessonReport::already_migrated(1);
        partial.status = LessonStatus::PartiallyMigrated;
        partial.counts.collections.created = 1;
        partial.skipped.push(SkippedEntity {
            key: LegacyKey::file_asset(404),
            reason: SkipReason::Structural("container 10 links a missing file asset".to_string()),
        });
        report.push_lesson(partial);
        report.push_lesson(LessonReport::failed(2, "Virtual lesson 2 does not exist"));
        report.orphaned_containers = vec![99, 100];

        let summary = render_summary(&report);

        assert!(summary.contains("over all lessons: done"));
        assert!(summary.contains("0 migrated, 1 partially migrated, 1 failed, 0 already migrated"));
        assert!(summary.contains("Collections: 1 created, 0 updated"));
        assert!(summary.contains("lesson 1 skipped file_asset:404"));
        assert!(summary.contains("lesson 2 failed: Virtual lesson 2 does not exist"));
        assert!(summary.contains("Orphaned containers (not migrated): 99, 100"));
    }

    #[test]
    fn test_summary_shows_abort_reason() {
        let mut report = MigrationReport::new("run", MigrationScope::Lesson(5));
        report.outcome = RunOutcome::Aborted {
            reason: "Target store unavailable".to_string(),
        };

        let summary = render_summary(&report);

        assert!(summary.contains("over lesson 5: aborted (Target store unavailable)"));
    }
}
