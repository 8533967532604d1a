use serde::{Deserialize, Serialize};
use std::fmt;

/// Which legacy lessons a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MigrationScope {
    #[default]
    All,
    Lesson(i64),
}

impl fmt::Display for MigrationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationScope::All => f.write_str("all lessons"),
            MigrationScope::Lesson(id) => write!(f, "lesson {id}"),
        }
    }
}
