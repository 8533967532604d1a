//! Command line arguments of a migration run.
use std::time::Duration;

use catalog_migrator_pipeline::orchestrator::{OrchestratorConfig, DEFAULT_RUN_ID};
use catalog_migrator_shared::types::{Language, MigrationScope};
use clap::Parser;

use crate::errors::MigratorError;

#[derive(Parser, Debug)]
#[command(name = "catalog-migrator", version, about = "Migrates the kmedia legacy catalog into the MDB catalog")]
pub struct Args {
    /// Migrate only this virtual lesson
    #[arg(long)]
    pub lesson: Option<i64>,
    /// Checkpoint namespace of the run
    #[arg(long, env = "MIGRATION_RUN_ID", default_value = DEFAULT_RUN_ID)]
    pub run_id: String,
    /// Ignore existing checkpoints and reprocess every lesson
    #[arg(long)]
    pub fresh: bool,
    /// Write to in-memory stores instead of the target database
    #[arg(long)]
    pub dry_run: bool,
    /// Upper bound on the time spent on a single lesson
    #[arg(long, default_value_t = 120)]
    pub lesson_timeout_secs: u64,
    /// Comma separated language codes to carry (default: every language found)
    #[arg(long, env = "MIGRATION_LANGUAGES")]
    pub languages: Option<String>,
    /// Print the report as JSON
    #[arg(long)]
    pub report_json: bool,
}

impl Args {
    pub fn scope(&self) -> MigrationScope {
        match self.lesson {
            Some(id) => MigrationScope::Lesson(id),
            None => MigrationScope::All,
        }
    }

    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig, MigratorError> {
        let languages = match &self.languages {
            Some(list) => Language::parse_list(list).map_err(|e| MigratorError::config(e.to_string()))?,
            None => Vec::new(),
        };
        if self.lesson_timeout_secs == 0 {
            return Err(MigratorError::config("--lesson-timeout-secs must be positive"));
        }

        Ok(OrchestratorConfig {
            run_id: self.run_id.clone(),
            resume: !self.fresh,
            lesson_timeout: Duration::from_secs(self.lesson_timeout_secs),
            languages,
        })
    }
}
