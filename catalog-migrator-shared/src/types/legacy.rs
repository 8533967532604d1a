//! Records of the legacy (kmedia) catalog.
//!
//! These are read-only for the whole run: nothing in the migrator ever writes
//! them back.
use crate::types::{Language, LegacyKey, LocalizedText};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Legacy top-level catalog unit. Becomes a target collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualLesson {
    pub id: i64,
    pub film_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub descriptions: LocalizedText,
}

/// Legacy lesson part. Becomes a target content unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: i64,
    pub virtual_lesson_id: i64,
    pub name: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub descriptions: LocalizedText,
}

/// Legacy leaf record describing one file. Becomes a target file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAsset {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub language: Option<Language>,
    pub size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub descriptions: LocalizedText,
}

/// One row of the legacy container/asset membership table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetLink {
    pub container_id: i64,
    pub file_asset_id: i64,
}

/// A membership row seen from the asset side, with the lesson of the claiming
/// container. Only containers whose lesson exists hold claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetClaim {
    pub file_asset_id: i64,
    pub container_id: i64,
    pub virtual_lesson_id: i64,
}

/// A borrowed reference to any legacy node, used to resolve its descriptions.
#[derive(Debug, Clone, Copy)]
pub enum LegacyNode<'a> {
    Lesson(&'a VirtualLesson),
    Container(&'a Container),
    FileAsset(&'a FileAsset),
}

impl<'a> LegacyNode<'a> {
    pub fn key(&self) -> LegacyKey {
        match self {
            LegacyNode::Lesson(lesson) => LegacyKey::lesson(lesson.id),
            LegacyNode::Container(container) => LegacyKey::container(container.id),
            LegacyNode::FileAsset(asset) => LegacyKey::file_asset(asset.id),
        }
    }

    pub fn descriptions(&self) -> &'a LocalizedText {
        match self {
            LegacyNode::Lesson(lesson) => &lesson.descriptions,
            LegacyNode::Container(container) => &container.descriptions,
            LegacyNode::FileAsset(asset) => &asset.descriptions,
        }
    }
}

/// A container together with the file assets it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerNode {
    pub container: Container,
    pub file_assets: Vec<FileAsset>,
}

/// A problem in the legacy hierarchy that makes one subtree unmigratable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralIssue {
    /// Root of the subtree that is skipped because of the issue.
    pub key: LegacyKey,
    pub reason: String,
}

/// A fully expanded lesson: the lesson, its containers in order, and each
/// container's assets. Subtrees that failed validation are left out of
/// `containers` and listed in `issues` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonTree {
    pub lesson: VirtualLesson,
    pub containers: Vec<ContainerNode>,
    pub issues: Vec<StructuralIssue>,
}

impl LessonTree {
    pub fn file_asset_count(&self) -> usize {
        self.containers.iter().map(|node| node.file_assets.len()).sum()
    }
}
