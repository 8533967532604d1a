use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a legacy record. Legacy ids are only unique within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    VirtualLesson,
    Container,
    FileAsset,
}

impl EntityKind {
    /// Returns the name stored in the `legacy_keys.kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::VirtualLesson => "virtual_lesson",
            EntityKind::Container => "container",
            EntityKind::FileAsset => "file_asset",
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "virtual_lesson" => Ok(EntityKind::VirtualLesson),
            "container" => Ok(EntityKind::Container),
            "file_asset" => Ok(EntityKind::FileAsset),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a legacy record across schemas: `(kind, legacy id)`.
///
/// This is the key the upsert engine uses to decide between creating a target
/// row and updating the one created by an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LegacyKey {
    pub kind: EntityKind,
    pub legacy_id: i64,
}

impl LegacyKey {
    pub fn new(kind: EntityKind, legacy_id: i64) -> Self {
        Self { kind, legacy_id }
    }

    pub fn lesson(legacy_id: i64) -> Self {
        Self::new(EntityKind::VirtualLesson, legacy_id)
    }

    pub fn container(legacy_id: i64) -> Self {
        Self::new(EntityKind::Container, legacy_id)
    }

    pub fn file_asset(legacy_id: i64) -> Self {
        Self::new(EntityKind::FileAsset, legacy_id)
    }
}

impl fmt::Display for LegacyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.legacy_id)
    }
}
