//! This module defines the `TranslationRepository` trait over the
//! `(sequence_id, language) -> text` store and its durable sequence counter.
use crate::errors::TranslationRepositoryError;
use catalog_migrator_shared::types::{Language, LocalizedText};

/// Storage primitives for string translations.
///
/// Sequence ids come from a single durable counter shared by every writer, so
/// an id is never issued twice, across runs included.
#[async_trait::async_trait]
pub trait TranslationRepository: Send + Sync {
    /// Draws the next value from the durable counter.
    async fn next_sequence_id(&self) -> Result<i64, TranslationRepositoryError>;

    /// Stores the text of a freshly drawn sequence id.
    async fn insert_translation(
        &self,
        sequence_id: i64,
        language: &Language,
        text: &str,
    ) -> Result<(), TranslationRepositoryError>;

    /// Inserts or overwrites `(sequence_id, language)`, leaving the other
    /// languages of the sequence untouched.
    ///
    /// Fails with `DanglingSequence` if no translation exists for
    /// `sequence_id`. The existence check and the write are atomic.
    async fn update_translation(
        &self,
        sequence_id: i64,
        language: &Language,
        text: &str,
    ) -> Result<(), TranslationRepositoryError>;

    /// Returns every stored language of a sequence id.
    async fn find_translations(&self, sequence_id: i64) -> Result<LocalizedText, TranslationRepositoryError>;
}
