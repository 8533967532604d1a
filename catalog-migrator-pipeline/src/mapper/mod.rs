//! Pure transforms from legacy records to target drafts.
//!
//! Nothing in here performs I/O or allocates ids: a draft carries the legacy
//! keys of itself and its parent, and the resolved localized text that the
//! upsert engine will turn into sequence ids.
use catalog_migrator_shared::types::{
    CollectionDraft, Container, ContentUnitDraft, FileAsset, Language, LegacyKey, LegacyNode,
    LessonDraft, LessonTree, MdbFileDraft, UnitDraft, VirtualLesson,
};
use serde_json::json;

use crate::reader::resolve_descriptions;

/// Maps a whole lesson tree. Containers without assets still produce a
/// content unit.
pub fn map_lesson(tree: &LessonTree, languages: &[Language]) -> LessonDraft {
    LessonDraft {
        collection: map_collection(&tree.lesson, languages),
        units: tree
            .containers
            .iter()
            .map(|node| UnitDraft {
                unit: map_content_unit(&node.container, languages),
                files: node
                    .file_assets
                    .iter()
                    .map(|asset| map_file(node.container.id, asset))
                    .collect(),
            })
            .collect(),
    }
}

/// `VirtualLesson -> Collection`.
///
/// The name comes from the lesson's own descriptions. A lesson without any
/// gets a single English name derived from its film date, or its id. Once
/// stored, that English text stays next to any descriptions added later.
pub fn map_collection(lesson: &VirtualLesson, languages: &[Language]) -> CollectionDraft {
    let mut name = resolve_descriptions(LegacyNode::Lesson(lesson), languages);
    if name.is_empty() {
        name.insert(Language::english(), fallback_lesson_name(lesson));
    }

    CollectionDraft {
        key: LegacyKey::lesson(lesson.id),
        name,
        properties: json!({
            "kmedia_id": lesson.id,
            "film_date": lesson.film_date.map(|date| date.format("%Y-%m-%d").to_string()),
        }),
    }
}

fn fallback_lesson_name(lesson: &VirtualLesson) -> String {
    match lesson.film_date {
        Some(date) => format!("Virtual lesson {}", date.format("%Y-%m-%d")),
        None => format!("Virtual lesson {}", lesson.id),
    }
}

/// `Container -> ContentUnit`, parented under the container's lesson.
pub fn map_content_unit(container: &Container, languages: &[Language]) -> ContentUnitDraft {
    ContentUnitDraft {
        key: LegacyKey::container(container.id),
        parent: LegacyKey::lesson(container.virtual_lesson_id),
        position: container.position,
        name: resolve_descriptions(LegacyNode::Container(container), languages),
        properties: json!({
            "kmedia_id": container.id,
            "name": container.name,
        }),
    }
}

/// `FileAsset -> MDBFile`, parented under `container_id`. Uid, name and
/// creation time are copied unchanged.
pub fn map_file(container_id: i64, asset: &FileAsset) -> MdbFileDraft {
    MdbFileDraft {
        key: LegacyKey::file_asset(asset.id),
        parent: LegacyKey::container(container_id),
        uid: asset.uid.clone(),
        name: asset.name.clone(),
        file_created_at: asset.created_at,
        size: asset.size,
        language: asset.language.clone(),
        properties: json!({ "kmedia_id": asset.id }),
    }
}
