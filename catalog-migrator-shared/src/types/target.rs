//! Records of the target (MDB) catalog: drafts produced by the mapper, the
//! writes handed to a repository, and the rows read back from it.
use crate::types::{Language, LegacyKey, LocalizedText};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Collection type given to every migrated virtual lesson.
pub const COLLECTION_TYPE: &str = "DAILY_LESSON";

/// Content unit type given to every migrated container.
pub const CONTENT_UNIT_TYPE: &str = "LESSON_PART";

// ============================================================================
// Drafts
// ============================================================================

/// Target shape of a virtual lesson, before any id has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDraft {
    pub key: LegacyKey,
    /// Never empty: the mapper always derives at least one name.
    pub name: LocalizedText,
    pub properties: JsonValue,
}

/// Target shape of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUnitDraft {
    pub key: LegacyKey,
    /// Key of the lesson whose collection this unit belongs to.
    pub parent: LegacyKey,
    pub position: i32,
    /// May be empty, in which case the unit has no name reference.
    pub name: LocalizedText,
    pub properties: JsonValue,
}

/// Target shape of a file asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdbFileDraft {
    pub key: LegacyKey,
    /// Key of the container whose content unit owns this file.
    pub parent: LegacyKey,
    pub uid: String,
    pub name: String,
    pub file_created_at: DateTime<Utc>,
    pub size: Option<i64>,
    pub language: Option<Language>,
    pub properties: JsonValue,
}

/// Any draft the upsert engine accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityDraft {
    Collection(CollectionDraft),
    ContentUnit(ContentUnitDraft),
    File(MdbFileDraft),
}

impl EntityDraft {
    pub fn key(&self) -> LegacyKey {
        match self {
            EntityDraft::Collection(draft) => draft.key,
            EntityDraft::ContentUnit(draft) => draft.key,
            EntityDraft::File(draft) => draft.key,
        }
    }

    pub fn parent(&self) -> Option<LegacyKey> {
        match self {
            EntityDraft::Collection(_) => None,
            EntityDraft::ContentUnit(draft) => Some(draft.parent),
            EntityDraft::File(draft) => Some(draft.parent),
        }
    }
}

/// A content unit draft together with the drafts of its files.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDraft {
    pub unit: ContentUnitDraft,
    pub files: Vec<MdbFileDraft>,
}

/// The complete target shape of one lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonDraft {
    pub collection: CollectionDraft,
    pub units: Vec<UnitDraft>,
}

// ============================================================================
// Writes
// ============================================================================

/// Column values written for a collection, with translations already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionWrite {
    pub name_id: i64,
    pub properties: JsonValue,
}

/// Column values written for a content unit and its collection link.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentUnitWrite {
    pub collection_id: i64,
    pub position: i32,
    pub name_id: Option<i64>,
    pub properties: JsonValue,
}

/// Column values written for a file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileWrite {
    pub content_unit_id: i64,
    pub uid: String,
    pub name: String,
    pub file_created_at: DateTime<Utc>,
    pub size: Option<i64>,
    pub language: Option<Language>,
    pub properties: JsonValue,
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub uid: String,
    pub type_name: String,
    pub name_id: i64,
    pub properties: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub id: i64,
    pub uid: String,
    pub type_name: String,
    pub name_id: Option<i64>,
    pub properties: JsonValue,
    pub created_at: DateTime<Utc>,
}

/// A target file row. `uid`, `name` and `file_created_at` are the fields the
/// admin file listing serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdbFile {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub content_unit_id: i64,
    pub file_created_at: DateTime<Utc>,
    pub size: Option<i64>,
    pub language: Option<Language>,
    pub properties: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringTranslation {
    pub sequence_id: i64,
    pub language: Language,
    pub text: String,
}

/// Result of a single upsert: the target id and whether it was just created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub id: i64,
    pub created: bool,
}

/// Row counts of the target catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCounts {
    pub collections: u64,
    pub content_units: u64,
    pub files: u64,
    pub translations: u64,
}
