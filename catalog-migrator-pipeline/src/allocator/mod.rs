//! This module defines the `TranslationAllocator`, which issues translation
//! sequence ids and stores localized text against them.
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use catalog_migrator_repository::TranslationRepository;
use catalog_migrator_shared::types::{Language, LocalizedText};
use tracing::{debug, error};

use crate::errors::AllocatorError;

/// `TranslationAllocator` wraps a [`TranslationRepository`] and guarantees
/// that the ids it hands out strictly increase for its whole lifetime.
pub struct TranslationAllocator {
    repository: Arc<dyn TranslationRepository>,
    last_issued: AtomicI64,
}

impl TranslationAllocator {
    pub fn new(repository: Arc<dyn TranslationRepository>) -> Self {
        Self {
            repository,
            last_issued: AtomicI64::new(i64::MIN),
        }
    }

    /// Draws a new sequence id from the durable counter.
    ///
    /// Fails with `NonMonotonic` if the counter returns an id that is not
    /// greater than every id issued before.
    pub async fn next_sequence_id(&self) -> Result<i64, AllocatorError> {
        let issued = self.repository.next_sequence_id().await?;
        let previous = self.last_issued.fetch_max(issued, Ordering::SeqCst);
        if issued <= previous {
            error!(previous, issued, "Sequence counter moved backwards");
            return Err(AllocatorError::NonMonotonic { previous, issued });
        }
        debug!(sequence_id = issued, "Allocated sequence id");
        Ok(issued)
    }

    /// Stores `text` in `language`.
    ///
    /// With no `existing` id a new one is allocated. With one, only
    /// `(existing, language)` is inserted or overwritten.
    pub async fn set_translation(
        &self,
        existing: Option<i64>,
        language: &Language,
        text: &str,
    ) -> Result<i64, AllocatorError> {
        match existing {
            Some(sequence_id) => {
                self.repository.update_translation(sequence_id, language, text).await?;
                Ok(sequence_id)
            }
            None => {
                let sequence_id = self.next_sequence_id().await?;
                self.repository.insert_translation(sequence_id, language, text).await?;
                Ok(sequence_id)
            }
        }
    }

    /// Stores every language of `texts` under one sequence id.
    ///
    /// Returns `existing` untouched when `texts` is empty: nothing is allocated
    /// and nothing is written.
    pub async fn set_translations(
        &self,
        existing: Option<i64>,
        texts: &LocalizedText,
    ) -> Result<Option<i64>, AllocatorError> {
        let mut sequence_id = existing;
        for (language, text) in texts.iter() {
            sequence_id = Some(self.set_translation(sequence_id, language, text).await?);
        }
        Ok(sequence_id)
    }
}
