//! PostgreSQL implementation of the translation store.
//!
//! Sequence ids are drawn from `string_translations_sequence_id_seq`, which
//! lives outside any run state: ids survive restarts and are never handed out
//! twice, though gaps are possible.
use async_trait::async_trait;
use catalog_migrator_shared::types::{Language, LocalizedText};
use sqlx::Row;
use tracing::warn;

use crate::errors::is_unavailable_sqlstate;
use crate::{TranslationRepository, TranslationRepositoryError};

/// SQLSTATE `undefined_table`, also raised for a missing sequence.
const UNDEFINED_TABLE: &str = "42P01";

/// PostgreSQL-backed translation repository.
pub struct PostgresTranslationRepository {
    pool: sqlx::PgPool,
}

impl PostgresTranslationRepository {
    pub async fn new(pool: sqlx::PgPool) -> Result<Self, TranslationRepositoryError> {
        Ok(Self { pool })
    }
}

/// Whether a failed `nextval` means the counter can no longer be trusted.
fn counter_unavailable(sqlstate: Option<&str>) -> bool {
    sqlstate.is_some_and(|code| code == UNDEFINED_TABLE || is_unavailable_sqlstate(code))
}

fn counter_error(error: sqlx::Error) -> TranslationRepositoryError {
    if let Some(db) = error.as_database_error() {
        if counter_unavailable(db.code().as_deref()) {
            return TranslationRepositoryError::Unavailable(db.message().to_string());
        }
    }
    TranslationRepositoryError::DatabaseError(error)
}

#[async_trait]
impl TranslationRepository for PostgresTranslationRepository {
    async fn next_sequence_id(&self) -> Result<i64, TranslationRepositoryError> {
        let id: i64 = sqlx::query_scalar("SELECT nextval('string_translations_sequence_id_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(counter_error)?;
        Ok(id)
    }

    async fn insert_translation(
        &self,
        sequence_id: i64,
        language: &Language,
        text: &str,
    ) -> Result<(), TranslationRepositoryError> {
        sqlx::query(
            "INSERT INTO string_translations (sequence_id, language, text) VALUES ($1, $2, $3) \
             ON CONFLICT (sequence_id, language) DO UPDATE SET text = EXCLUDED.text, updated_at = NOW()",
        )
        .bind(sequence_id)
        .bind(language.as_str())
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_translation(
        &self,
        sequence_id: i64,
        language: &Language,
        text: &str,
    ) -> Result<(), TranslationRepositoryError> {
        // Writes only if some language already exists for the sequence id.
        let result = sqlx::query(
            "INSERT INTO string_translations (sequence_id, language, text) \
             SELECT $1, $2, $3 \
             WHERE EXISTS (SELECT 1 FROM string_translations WHERE sequence_id = $1) \
             ON CONFLICT (sequence_id, language) DO UPDATE SET text = EXCLUDED.text, updated_at = NOW()",
        )
        .bind(sequence_id)
        .bind(language.as_str())
        .bind(text)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TranslationRepositoryError::DanglingSequence(sequence_id));
        }
        Ok(())
    }

    async fn find_translations(&self, sequence_id: i64) -> Result<LocalizedText, TranslationRepositoryError> {
        let rows = sqlx::query(
            "SELECT language, text FROM string_translations WHERE sequence_id = $1 ORDER BY language",
        )
        .bind(sequence_id)
        .fetch_all(&self.pool)
        .await?;

        let mut texts = LocalizedText::new();
        for row in rows {
            let code: String = row.try_get("language")?;
            let text: String = row.try_get("text")?;
            match code.parse::<Language>() {
                Ok(language) => texts.insert(language, text),
                Err(e) => warn!(sequence_id, error = %e, "Ignoring translation with an invalid language code"),
            }
        }
        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_counter_is_unavailable() {
        assert!(counter_unavailable(Some("42P01")));
        assert!(counter_unavailable(Some("57P01")));
    }

    #[test]
    fn test_statement_timeout_is_not_unavailable() {
        assert!(!counter_unavailable(Some("57014")));
        assert!(!counter_unavailable(None));

        let error = counter_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(error, TranslationRepositoryError::DatabaseError(_)));
        assert!(error.is_durability_failure());
    }
}
