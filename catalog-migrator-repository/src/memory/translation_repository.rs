use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use catalog_migrator_shared::types::{Language, LocalizedText};
use tokio::sync::Mutex;

use crate::{TranslationRepository, TranslationRepositoryError};

/// Translation store held in memory, with an atomic counter standing in for
/// the database sequence.
#[derive(Debug, Default)]
pub struct InMemoryTranslationRepository {
    last_issued: AtomicI64,
    rows: Mutex<BTreeMap<(i64, Language), String>>,
}

impl InMemoryTranslationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose first issued id is `last_issued + 1`.
    pub fn starting_at(last_issued: i64) -> Self {
        Self {
            last_issued: AtomicI64::new(last_issued),
            rows: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of stored `(sequence_id, language)` rows.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    /// Drops every language of a sequence id.
    pub async fn remove_sequence(&self, sequence_id: i64) {
        self.rows.lock().await.retain(|(id, _), _| *id != sequence_id);
    }
}

#[async_trait]
impl TranslationRepository for InMemoryTranslationRepository {
    async fn next_sequence_id(&self) -> Result<i64, TranslationRepositoryError> {
        Ok(self.last_issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn insert_translation(
        &self,
        sequence_id: i64,
        language: &Language,
        text: &str,
    ) -> Result<(), TranslationRepositoryError> {
        self.rows
            .lock()
            .await
            .insert((sequence_id, language.clone()), text.to_string());
        Ok(())
    }

    async fn update_translation(
        &self,
        sequence_id: i64,
        language: &Language,
        text: &str,
    ) -> Result<(), TranslationRepositoryError> {
        let mut rows = self.rows.lock().await;
        if !rows.keys().any(|(id, _)| *id == sequence_id) {
            return Err(TranslationRepositoryError::DanglingSequence(sequence_id));
        }
        rows.insert((sequence_id, language.clone()), text.to_string());
        Ok(())
    }

    async fn find_translations(&self, sequence_id: i64) -> Result<LocalizedText, TranslationRepositoryError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|((id, _), _)| *id == sequence_id)
            .map(|((_, language), text)| (language.clone(), text.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_ids_continue_after_start() {
        let repository = InMemoryTranslationRepository::starting_at(41);
        assert_eq!(repository.next_sequence_id().await.unwrap(), 42);
        assert_eq!(repository.next_sequence_id().await.unwrap(), 43);
    }

    #[tokio::test]
    async fn test_update_only_touches_one_language() {
        let repository = InMemoryTranslationRepository::new();
        let id = repository.next_sequence_id().await.unwrap();
        repository.insert_translation(id, &Language::hebrew(), "א").await.unwrap();
        repository.insert_translation(id, &Language::russian(), "б").await.unwrap();

        repository.update_translation(id, &Language::hebrew(), "ב").await.unwrap();

        let texts = repository.find_translations(id).await.unwrap();
        assert_eq!(texts.get(&Language::hebrew()), Some("ב"));
        assert_eq!(texts.get(&Language::russian()), Some("б"));
    }

    #[tokio::test]
    async fn test_update_of_unknown_sequence_is_dangling() {
        let repository = InMemoryTranslationRepository::new();
        let result = repository.update_translation(99, &Language::english(), "x").await;
        assert!(matches!(result, Err(TranslationRepositoryError::DanglingSequence(99))));
        assert!(repository.is_empty().await);
    }
}
