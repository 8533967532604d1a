use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use catalog_migrator_shared::types::{
    CatalogCounts, Collection, CollectionWrite, ContentUnit, ContentUnitWrite, FileWrite, LegacyKey,
    MdbFile, COLLECTION_TYPE, CONTENT_UNIT_TYPE,
};
use chrono::Utc;
use tokio::sync::Mutex;

use crate::memory::InMemoryTranslationRepository;
use crate::uid::generate_uid;
use crate::{TargetCatalogRepository, TargetRepositoryError};

#[derive(Debug, Default)]
struct TargetState {
    last_collection_id: i64,
    last_content_unit_id: i64,
    last_file_id: i64,
    collections: BTreeMap<i64, Collection>,
    content_units: BTreeMap<i64, ContentUnit>,
    /// `(collection_id, content_unit_id) -> position`
    links: BTreeMap<(i64, i64), i32>,
    files: BTreeMap<i64, MdbFile>,
    legacy_keys: HashMap<LegacyKey, i64>,
}

impl TargetState {
    /// Fails if `key` is already mapped. Checked and written under one lock,
    /// which plays the part of the advisory lock.
    fn claim(&self, key: &LegacyKey) -> Result<(), TargetRepositoryError> {
        match self.legacy_keys.get(key) {
            Some(target_id) => Err(TargetRepositoryError::DuplicateLegacyKey {
                key: *key,
                target_id: *target_id,
            }),
            None => Ok(()),
        }
    }

    fn require_collection(&self, id: i64) -> Result<(), TargetRepositoryError> {
        if self.collections.contains_key(&id) {
            Ok(())
        } else {
            Err(TargetRepositoryError::ReferentialIntegrity(format!(
                "collection {id} does not exist"
            )))
        }
    }

    fn require_content_unit(&self, id: i64) -> Result<(), TargetRepositoryError> {
        if self.content_units.contains_key(&id) {
            Ok(())
        } else {
            Err(TargetRepositoryError::ReferentialIntegrity(format!(
                "content unit {id} does not exist"
            )))
        }
    }

    fn file_from_write(id: i64, file: &FileWrite) -> MdbFile {
        MdbFile {
            id,
            uid: file.uid.clone(),
            name: file.name.clone(),
            content_unit_id: file.content_unit_id,
            file_created_at: file.file_created_at,
            size: file.size,
            language: file.language.clone(),
            properties: file.properties.clone(),
        }
    }
}

/// Target catalog held in memory. Used by dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryTargetCatalog {
    state: Mutex<TargetState>,
    translations: Option<Arc<InMemoryTranslationRepository>>,
}

impl InMemoryTargetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports the rows of `translations` in [`TargetCatalogRepository::counts`],
    /// the way the target database holds both.
    pub fn with_translations(mut self, translations: Arc<InMemoryTranslationRepository>) -> Self {
        self.translations = Some(translations);
        self
    }

    /// Deletes a content unit, its files and its collection links, leaving
    /// the legacy key map untouched.
    pub async fn remove_content_unit(&self, id: i64) {
        let mut state = self.state.lock().await;
        state.content_units.remove(&id);
        state.links.retain(|(_, unit_id), _| *unit_id != id);
        state.files.retain(|_, file| file.content_unit_id != id);
    }
}

#[async_trait]
impl TargetCatalogRepository for InMemoryTargetCatalog {
    async fn find_by_legacy_key(&self, key: &LegacyKey) -> Result<Option<i64>, TargetRepositoryError> {
        Ok(self.state.lock().await.legacy_keys.get(key).copied())
    }

    async fn create_collection(
        &self,
        key: &LegacyKey,
        collection: &CollectionWrite,
    ) -> Result<i64, TargetRepositoryError> {
        let mut state = self.state.lock().await;
        state.claim(key)?;

        state.last_collection_id += 1;
        let id = state.last_collection_id;
        state.collections.insert(
            id,
            Collection {
                id,
                uid: generate_uid(),
                type_name: COLLECTION_TYPE.to_string(),
                name_id: collection.name_id,
                properties: collection.properties.clone(),
                created_at: Utc::now(),
            },
        );
        state.legacy_keys.insert(*key, id);
        Ok(id)
    }

    async fn update_collection(
        &self,
        key: &LegacyKey,
        id: i64,
        collection: &CollectionWrite,
    ) -> Result<(), TargetRepositoryError> {
        let mut state = self.state.lock().await;
        let row = state
            .collections
            .get_mut(&id)
            .ok_or(TargetRepositoryError::StaleMapping { key: *key, target_id: id })?;
        row.name_id = collection.name_id;
        row.properties = collection.properties.clone();
        Ok(())
    }

    async fn get_collection(&self, id: i64) -> Result<Option<Collection>, TargetRepositoryError> {
        Ok(self.state.lock().await.collections.get(&id).cloned())
    }

    async fn create_content_unit(
        &self,
        key: &LegacyKey,
        unit: &ContentUnitWrite,
    ) -> Result<i64, TargetRepositoryError> {
        let mut state = self.state.lock().await;
        state.claim(key)?;
        state.require_collection(unit.collection_id)?;

        state.last_content_unit_id += 1;
        let id = state.last_content_unit_id;
        state.content_units.insert(
            id,
            ContentUnit {
                id,
                uid: generate_uid(),
                type_name: CONTENT_UNIT_TYPE.to_string(),
                name_id: unit.name_id,
                properties: unit.properties.clone(),
                created_at: Utc::now(),
            },
        );
        state.links.insert((unit.collection_id, id), unit.position);
        state.legacy_keys.insert(*key, id);
        Ok(id)
    }

    async fn update_content_unit(
        &self,
        key: &LegacyKey,
        id: i64,
        unit: &ContentUnitWrite,
    ) -> Result<(), TargetRepositoryError> {
        let mut state = self.state.lock().await;
        state.require_collection(unit.collection_id)?;
        let row = state
            .content_units
            .get_mut(&id)
            .ok_or(TargetRepositoryError::StaleMapping { key: *key, target_id: id })?;
        row.name_id = unit.name_id;
        row.properties = unit.properties.clone();
        state.links.insert((unit.collection_id, id), unit.position);
        Ok(())
    }

    async fn get_content_unit(&self, id: i64) -> Result<Option<ContentUnit>, TargetRepositoryError> {
        Ok(self.state.lock().await.content_units.get(&id).cloned())
    }

    async fn create_file(&self, key: &LegacyKey, file: &FileWrite) -> Result<i64, TargetRepositoryError> {
        let mut state = self.state.lock().await;
        state.claim(key)?;
        state.require_content_unit(file.content_unit_id)?;

        state.last_file_id += 1;
        let id = state.last_file_id;
        state.files.insert(id, TargetState::file_from_write(id, file));
        state.legacy_keys.insert(*key, id);
        Ok(id)
    }

    async fn update_file(&self, key: &LegacyKey, id: i64, file: &FileWrite) -> Result<(), TargetRepositoryError> {
        let mut state = self.state.lock().await;
        state.require_content_unit(file.content_unit_id)?;
        if !state.files.contains_key(&id) {
            return Err(TargetRepositoryError::StaleMapping { key: *key, target_id: id });
        }
        state.files.insert(id, TargetState::file_from_write(id, file));
        Ok(())
    }

    async fn get_file(&self, id: i64) -> Result<Option<MdbFile>, TargetRepositoryError> {
        Ok(self.state.lock().await.files.get(&id).cloned())
    }

    async fn list_collection_units(&self, collection_id: i64) -> Result<Vec<i64>, TargetRepositoryError> {
        let state = self.state.lock().await;
        let mut units: Vec<(i32, i64)> = state
            .links
            .iter()
            .filter(|((collection, _), _)| *collection == collection_id)
            .map(|((_, unit), position)| (*position, *unit))
            .collect();
        units.sort();
        Ok(units.into_iter().map(|(_, unit)| unit).collect())
    }

    async fn list_unit_files(&self, content_unit_id: i64) -> Result<Vec<MdbFile>, TargetRepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .files
            .values()
            .filter(|file| file.content_unit_id == content_unit_id)
            .cloned()
            .collect())
    }

    async fn counts(&self) -> Result<CatalogCounts, TargetRepositoryError> {
        let translations = match &self.translations {
            Some(translations) => translations.len().await as u64,
            None => 0,
        };
        let state = self.state.lock().await;
        Ok(CatalogCounts {
            collections: state.collections.len() as u64,
            content_units: state.content_units.len() as u64,
            files: state.files.len() as u64,
            translations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit_write(collection_id: i64, position: i32) -> ContentUnitWrite {
        ContentUnitWrite {
            collection_id,
            position,
            name_id: None,
            properties: json!({}),
        }
    }

    #[tokio::test]
    async fn test_create_records_mapping() {
        let catalog = InMemoryTargetCatalog::new();
        let key = LegacyKey::lesson(1);
        let id = catalog
            .create_collection(&key, &CollectionWrite { name_id: 5, properties: json!({"kmedia_id": 1}) })
            .await
            .unwrap();

        assert_eq!(catalog.find_by_legacy_key(&key).await.unwrap(), Some(id));
        let collection = catalog.get_collection(id).await.unwrap().unwrap();
        assert_eq!(collection.type_name, COLLECTION_TYPE);
        assert_eq!(collection.uid.len(), 8);
    }

    #[tokio::test]
    async fn test_second_create_for_same_key_is_rejected() {
        let catalog = InMemoryTargetCatalog::new();
        let key = LegacyKey::lesson(1);
        let write = CollectionWrite { name_id: 5, properties: json!({}) };
        let id = catalog.create_collection(&key, &write).await.unwrap();

        let result = catalog.create_collection(&key, &write).await;
        assert!(matches!(
            result,
            Err(TargetRepositoryError::DuplicateLegacyKey { target_id, .. }) if target_id == id
        ));
        assert_eq!(catalog.counts().await.unwrap().collections, 1);
    }

    #[tokio::test]
    async fn test_content_unit_requires_collection() {
        let catalog = InMemoryTargetCatalog::new();
        let result = catalog.create_content_unit(&LegacyKey::container(10), &unit_write(42, 0)).await;

        assert!(matches!(result, Err(TargetRepositoryError::ReferentialIntegrity(_))));
        assert_eq!(catalog.find_by_legacy_key(&LegacyKey::container(10)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_units_listed_by_position() {
        let catalog = InMemoryTargetCatalog::new();
        let collection = catalog
            .create_collection(&LegacyKey::lesson(1), &CollectionWrite { name_id: 1, properties: json!({}) })
            .await
            .unwrap();
        let second = catalog.create_content_unit(&LegacyKey::container(2), &unit_write(collection, 1)).await.unwrap();
        let first = catalog.create_content_unit(&LegacyKey::container(1), &unit_write(collection, 0)).await.unwrap();

        assert_eq!(catalog.list_collection_units(collection).await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn test_update_of_removed_row_is_stale() {
        let catalog = InMemoryTargetCatalog::new();
        let collection = catalog
            .create_collection(&LegacyKey::lesson(1), &CollectionWrite { name_id: 1, properties: json!({}) })
            .await
            .unwrap();
        let key = LegacyKey::container(1);
        let unit = catalog.create_content_unit(&key, &unit_write(collection, 0)).await.unwrap();
        catalog.remove_content_unit(unit).await;

        let result = catalog.update_content_unit(&key, unit, &unit_write(collection, 0)).await;
        assert!(matches!(result, Err(TargetRepositoryError::StaleMapping { .. })));
    }
}
