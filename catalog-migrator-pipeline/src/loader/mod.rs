//! This module defines the `UpsertEngine`, responsible for writing target
//! drafts so that re-running a migration never duplicates an entity.
//!
//! Every draft is keyed by its legacy key. The first time a key is seen the
//! target row is created together with its mapping; afterwards the mapped row
//! is updated in place.
use std::collections::HashMap;
use std::sync::Arc;

use catalog_migrator_repository::{TargetCatalogRepository, TargetRepositoryError};
use catalog_migrator_shared::types::{
    CollectionDraft, CollectionWrite, ContentUnitDraft, ContentUnitWrite, EntityDraft, FileWrite,
    LegacyKey, LocalizedText, MdbFileDraft, Upserted,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::allocator::TranslationAllocator;
pub use crate::errors::LoaderError;

/// `UpsertEngine` persists entity drafts idempotently.
///
/// Lookups and writes for one legacy key are serialized by an in-process lock
/// per key. Across processes the target repository does the same with its
/// own locking and reports a lost race as `DuplicateLegacyKey`, which is
/// resolved by updating the winner's row.
pub struct UpsertEngine {
    target: Arc<dyn TargetCatalogRepository>,
    allocator: TranslationAllocator,
    key_locks: Mutex<HashMap<LegacyKey, Arc<Mutex<()>>>>,
}

impl UpsertEngine {
    pub fn new(target: Arc<dyn TargetCatalogRepository>, allocator: TranslationAllocator) -> Self {
        Self {
            target,
            allocator,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates or updates the target entity of `draft`.
    ///
    /// The parent key must already be mapped; otherwise, or if the parent row
    /// is gone, the draft fails with a referential-integrity error and nothing
    /// is written.
    pub async fn upsert(&self, draft: &EntityDraft) -> Result<Upserted, LoaderError> {
        let key = draft.key();
        let lock = self.key_lock(key).await;
        let _guard = lock.lock().await;

        let parent_id = match draft.parent() {
            Some(parent) => Some(self.resolve_parent(key, parent).await?),
            None => None,
        };

        let upserted = match self.target.find_by_legacy_key(&key).await? {
            Some(id) => {
                self.update(draft, id, parent_id).await?;
                Upserted { id, created: false }
            }
            None => match self.create(draft, parent_id).await {
                Ok(id) => Upserted { id, created: true },
                Err(LoaderError::Target(TargetRepositoryError::DuplicateLegacyKey { target_id, .. })) => {
                    debug!(legacy_key = %key, target_id, "Lost create race, updating instead");
                    self.update(draft, target_id, parent_id).await?;
                    Upserted { id: target_id, created: false }
                }
                Err(e) => return Err(e),
            },
        };

        debug!(legacy_key = %key, target_id = upserted.id, created = upserted.created, "Upserted entity");
        Ok(upserted)
    }

    async fn key_lock(&self, key: LegacyKey) -> Arc<Mutex<()>> {
        self.key_locks.lock().await.entry(key).or_default().clone()
    }

    async fn resolve_parent(&self, key: LegacyKey, parent: LegacyKey) -> Result<i64, LoaderError> {
        self.target
            .find_by_legacy_key(&parent)
            .await?
            .ok_or(LoaderError::UnmappedParent { key, parent })
    }

    async fn create(&self, draft: &EntityDraft, parent_id: Option<i64>) -> Result<i64, LoaderError> {
        match draft {
            EntityDraft::Collection(collection) => {
                let name_id = self
                    .allocator
                    .set_translations(None, &collection.name)
                    .await?
                    .ok_or(LoaderError::MissingName(collection.key))?;
                let write = collection_write(collection, name_id);
                Ok(self.target.create_collection(&collection.key, &write).await?)
            }
            EntityDraft::ContentUnit(unit) => {
                let name_id = self.allocator.set_translations(None, &unit.name).await?;
                let write = content_unit_write(unit, parent_of(unit.key, parent_id)?, name_id);
                Ok(self.target.create_content_unit(&unit.key, &write).await?)
            }
            EntityDraft::File(file) => {
                let write = file_write(file, parent_of(file.key, parent_id)?);
                Ok(self.target.create_file(&file.key, &write).await?)
            }
        }
    }

    async fn update(&self, draft: &EntityDraft, id: i64, parent_id: Option<i64>) -> Result<(), LoaderError> {
        match draft {
            EntityDraft::Collection(collection) => {
                let existing = self
                    .target
                    .get_collection(id)
                    .await?
                    .ok_or(TargetRepositoryError::StaleMapping { key: collection.key, target_id: id })?;
                let name_id = self
                    .refresh_translations(collection.key, Some(existing.name_id), &collection.name)
                    .await?
                    .ok_or(LoaderError::MissingName(collection.key))?;
                let write = collection_write(collection, name_id);
                self.target.update_collection(&collection.key, id, &write).await?;
            }
            EntityDraft::ContentUnit(unit) => {
                let existing = self
                    .target
                    .get_content_unit(id)
                    .await?
                    .ok_or(TargetRepositoryError::StaleMapping { key: unit.key, target_id: id })?;
                let name_id = self.refresh_translations(unit.key, existing.name_id, &unit.name).await?;
                let write = content_unit_write(unit, parent_of(unit.key, parent_id)?, name_id);
                self.target.update_content_unit(&unit.key, id, &write).await?;
            }
            EntityDraft::File(file) => {
                let write = file_write(file, parent_of(file.key, parent_id)?);
                self.target.update_file(&file.key, id, &write).await?;
            }
        }
        Ok(())
    }

    /// Writes `texts` under the entity's existing sequence id.
    ///
    /// A dangling id is replaced once by a freshly allocated one. If that
    /// fails too the entity is given up as `DanglingSequence`.
    async fn refresh_translations(
        &self,
        key: LegacyKey,
        existing: Option<i64>,
        texts: &LocalizedText,
    ) -> Result<Option<i64>, LoaderError> {
        match self.allocator.set_translations(existing, texts).await {
            Ok(sequence_id) => Ok(sequence_id),
            Err(e) => {
                let Some(sequence_id) = e.dangling_sequence() else {
                    return Err(e.into());
                };
                warn!(legacy_key = %key, sequence_id, "Dangling sequence id, allocating a fresh one");
                match self.allocator.set_translations(None, texts).await {
                    Ok(fresh) => Ok(fresh),
                    Err(retry) if retry.is_durability_failure() => Err(retry.into()),
                    Err(retry) => {
                        warn!(legacy_key = %key, sequence_id, error = %retry, "Retry with a fresh sequence id failed");
                        Err(LoaderError::DanglingSequence { key, sequence_id })
                    }
                }
            }
        }
    }
}

fn parent_of(key: LegacyKey, parent_id: Option<i64>) -> Result<i64, LoaderError> {
    parent_id.ok_or_else(|| {
        LoaderError::Target(TargetRepositoryError::ReferentialIntegrity(format!("{key} has no parent")))
    })
}

fn collection_write(draft: &CollectionDraft, name_id: i64) -> CollectionWrite {
    CollectionWrite {
        name_id,
        properties: draft.properties.clone(),
    }
}

fn content_unit_write(draft: &ContentUnitDraft, collection_id: i64, name_id: Option<i64>) -> ContentUnitWrite {
    ContentUnitWrite {
        collection_id,
        position: draft.position,
        name_id,
        properties: draft.properties.clone(),
    }
}

fn file_write(draft: &MdbFileDraft, content_unit_id: i64) -> FileWrite {
    FileWrite {
        content_unit_id,
        uid: draft.uid.clone(),
        name: draft.name.clone(),
        file_created_at: draft.file_created_at,
        size: draft.size,
        language: draft.language.clone(),
        properties: draft.properties.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_migrator_repository::{InMemoryTargetCatalog, InMemoryTranslationRepository, TranslationRepository};
    use catalog_migrator_shared::types::Language;
    use chrono::Utc;
    use serde_json::json;

    struct Fixture {
        engine: UpsertEngine,
        target: Arc<InMemoryTargetCatalog>,
        translations: Arc<InMemoryTranslationRepository>,
    }

    fn fixture() -> Fixture {
        let translations = Arc::new(InMemoryTranslationRepository::new());
        let target = Arc::new(InMemoryTargetCatalog::new());
        let engine = UpsertEngine::new(target.clone(), TranslationAllocator::new(translations.clone()));
        Fixture { engine, target, translations }
    }

    fn collection(name: &str) -> EntityDraft {
        EntityDraft::Collection(CollectionDraft {
            key: LegacyKey::lesson(1),
            name: LocalizedText::new().with(Language::hebrew(), name),
            properties: json!({"kmedia_id": 1}),
        })
    }

    fn unit(container_id: i64, lesson_id: i64) -> EntityDraft {
        EntityDraft::ContentUnit(ContentUnitDraft {
            key: LegacyKey::container(container_id),
            parent: LegacyKey::lesson(lesson_id),
            position: 0,
            name: LocalizedText::new(),
            properties: json!({"kmedia_id": container_id}),
        })
    }

    fn file(asset_id: i64, container_id: i64) -> EntityDraft {
        EntityDraft::File(MdbFileDraft {
            key: LegacyKey::file_asset(asset_id),
            parent: LegacyKey::container(container_id),
            uid: format!("uid{asset_id}"),
            name: format!("{asset_id}.mp3"),
            file_created_at: Utc::now(),
            size: None,
            language: None,
            properties: json!({"kmedia_id": asset_id}),
        })
    }

    #[tokio::test]
    async fn test_second_upsert_updates_in_place() {
        let f = fixture();

        let first = f.engine.upsert(&collection("א")).await.unwrap();
        let second = f.engine.upsert(&collection("ב")).await.unwrap();

        assert!(first.created);
        assert_eq!(second, Upserted { id: first.id, created: false });
        let row = f.target.get_collection(first.id).await.unwrap().unwrap();
        let texts = f.translations.find_translations(row.name_id).await.unwrap();
        assert_eq!(texts.get(&Language::hebrew()), Some("ב"));
        assert_eq!(f.translations.len().await, 1);
    }

    #[tokio::test]
    async fn test_unmapped_parent_is_rejected() {
        let f = fixture();

        let error = f.engine.upsert(&unit(10, 1)).await.unwrap_err();

        assert!(matches!(error, LoaderError::UnmappedParent { .. }));
        assert!(matches!(error.skip_reason(), catalog_migrator_shared::types::SkipReason::ReferentialIntegrity(_)));
        assert_eq!(f.target.counts().await.unwrap().content_units, 0);
    }

    #[tokio::test]
    async fn test_file_under_removed_unit_is_rejected() {
        let f = fixture();
        f.engine.upsert(&collection("א")).await.unwrap();
        let unit_id = f.engine.upsert(&unit(10, 1)).await.unwrap().id;
        f.target.remove_content_unit(unit_id).await;

        let error = f.engine.upsert(&file(100, 10)).await.unwrap_err();

        assert!(matches!(error, LoaderError::Target(TargetRepositoryError::ReferentialIntegrity(_))));
        assert!(!error.is_durability_failure());
    }

    #[tokio::test]
    async fn test_dangling_name_is_reallocated() {
        let f = fixture();
        let id = f.engine.upsert(&collection("א")).await.unwrap().id;
        let old_name_id = f.target.get_collection(id).await.unwrap().unwrap().name_id;
        f.translations.remove_sequence(old_name_id).await;

        let upserted = f.engine.upsert(&collection("ב")).await.unwrap();

        assert_eq!(upserted.id, id);
        let new_name_id = f.target.get_collection(id).await.unwrap().unwrap().name_id;
        assert!(new_name_id > old_name_id);
        let texts = f.translations.find_translations(new_name_id).await.unwrap();
        assert_eq!(texts.get(&Language::hebrew()), Some("ב"));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_create_once() {
        let f = fixture();
        let draft = collection("א");

        let (a, b) = tokio::join!(f.engine.upsert(&draft), f.engine.upsert(&draft));

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.id, b.id);
        assert!(a.created ^ b.created);
        assert_eq!(f.target.counts().await.unwrap().collections, 1);
    }
}
