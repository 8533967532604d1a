//! PostgreSQL implementation of the target catalog repository.
//!
//! ## Database Tables
//!
//! - `collections`: migrated virtual lessons
//! - `content_units`: migrated containers
//! - `collections_content_units`: collection membership with `position`
//! - `files`: migrated file assets
//! - `legacy_keys`: `(kind, legacy_id) -> target_id`
//!
//! Every create runs in one transaction holding a transaction-scoped advisory
//! lock on the legacy key, so two writers can never both create a row for the
//! same key: the second one observes the mapping and gets `DuplicateLegacyKey`.
use async_trait::async_trait;
use catalog_migrator_shared::types::{
    CatalogCounts, Collection, CollectionWrite, ContentUnit, ContentUnitWrite, FileWrite, LegacyKey,
    MdbFile, COLLECTION_TYPE, CONTENT_UNIT_TYPE,
};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::uid::generate_uid;
use crate::{TargetCatalogRepository, TargetRepositoryError};

/// PostgreSQL-backed target catalog.
pub struct PostgresTargetCatalog {
    pool: sqlx::PgPool,
}

impl PostgresTargetCatalog {
    /// Creates a new target catalog instance.
    ///
    /// # Arguments
    ///
    /// * `pool` - Pool connected to the target database, with the schema in
    ///   [`crate::MIGRATOR`] applied
    pub async fn new(pool: sqlx::PgPool) -> Result<Self, TargetRepositoryError> {
        Ok(Self { pool })
    }

    /// Takes the advisory lock of `key` and fails if the key is already mapped.
    ///
    /// The lock is released when the transaction ends.
    async fn claim_key_tx(
        &self,
        key: &LegacyKey,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), TargetRepositoryError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(key.to_string())
            .execute(&mut **tx)
            .await?;

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT target_id FROM legacy_keys WHERE kind = $1 AND legacy_id = $2")
                .bind(key.kind.as_str())
                .bind(key.legacy_id)
                .fetch_optional(&mut **tx)
                .await?;

        match existing {
            Some(target_id) => Err(TargetRepositoryError::DuplicateLegacyKey { key: *key, target_id }),
            None => Ok(()),
        }
    }

    async fn insert_mapping_tx(
        &self,
        key: &LegacyKey,
        target_id: i64,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), TargetRepositoryError> {
        sqlx::query("INSERT INTO legacy_keys (kind, legacy_id, target_id) VALUES ($1, $2, $3)")
            .bind(key.kind.as_str())
            .bind(key.legacy_id)
            .bind(target_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn touch_mapping_tx(
        &self,
        key: &LegacyKey,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), TargetRepositoryError> {
        sqlx::query("UPDATE legacy_keys SET updated_at = NOW() WHERE kind = $1 AND legacy_id = $2")
            .bind(key.kind.as_str())
            .bind(key.legacy_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn upsert_unit_link_tx(
        &self,
        content_unit_id: i64,
        unit: &ContentUnitWrite,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), TargetRepositoryError> {
        sqlx::query(
            "INSERT INTO collections_content_units (collection_id, content_unit_id, position) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (collection_id, content_unit_id) DO UPDATE SET position = EXCLUDED.position",
        )
        .bind(unit.collection_id)
        .bind(content_unit_id)
        .bind(unit.position)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn collection_from_row(row: &PgRow) -> Result<Collection, sqlx::Error> {
    Ok(Collection {
        id: row.try_get("id")?,
        uid: row.try_get("uid")?,
        type_name: row.try_get("type_name")?,
        name_id: row.try_get("name_id")?,
        properties: row.try_get("properties")?,
        created_at: row.try_get("created_at")?,
    })
}

fn content_unit_from_row(row: &PgRow) -> Result<ContentUnit, sqlx::Error> {
    Ok(ContentUnit {
        id: row.try_get("id")?,
        uid: row.try_get("uid")?,
        type_name: row.try_get("type_name")?,
        name_id: row.try_get("name_id")?,
        properties: row.try_get("properties")?,
        created_at: row.try_get("created_at")?,
    })
}

fn file_from_row(row: &PgRow) -> Result<MdbFile, sqlx::Error> {
    let language: Option<String> = row.try_get("language")?;
    Ok(MdbFile {
        id: row.try_get("id")?,
        uid: row.try_get("uid")?,
        name: row.try_get("name")?,
        content_unit_id: row.try_get("content_unit_id")?,
        file_created_at: row.try_get("file_created_at")?,
        size: row.try_get("size")?,
        language: language.and_then(|code| code.parse().ok()),
        properties: row.try_get("properties")?,
    })
}

#[async_trait]
impl TargetCatalogRepository for PostgresTargetCatalog {
    async fn find_by_legacy_key(&self, key: &LegacyKey) -> Result<Option<i64>, TargetRepositoryError> {
        let target_id =
            sqlx::query_scalar("SELECT target_id FROM legacy_keys WHERE kind = $1 AND legacy_id = $2")
                .bind(key.kind.as_str())
                .bind(key.legacy_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(target_id)
    }

    async fn create_collection(
        &self,
        key: &LegacyKey,
        collection: &CollectionWrite,
    ) -> Result<i64, TargetRepositoryError> {
        let mut tx = self.pool.begin().await?;
        self.claim_key_tx(key, &mut tx).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO collections (uid, type_name, name_id, properties) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(generate_uid())
        .bind(COLLECTION_TYPE)
        .bind(collection.name_id)
        .bind(&collection.properties)
        .fetch_one(&mut *tx)
        .await?;

        self.insert_mapping_tx(key, id, &mut tx).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update_collection(
        &self,
        key: &LegacyKey,
        id: i64,
        collection: &CollectionWrite,
    ) -> Result<(), TargetRepositoryError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE collections SET name_id = $2, properties = $3 WHERE id = $1")
            .bind(id)
            .bind(collection.name_id)
            .bind(&collection.properties)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TargetRepositoryError::StaleMapping { key: *key, target_id: id });
        }

        self.touch_mapping_tx(key, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_collection(&self, id: i64) -> Result<Option<Collection>, TargetRepositoryError> {
        let row = sqlx::query(
            "SELECT id, uid, type_name, name_id, properties, created_at FROM collections WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(collection_from_row).transpose()?)
    }

    async fn create_content_unit(
        &self,
        key: &LegacyKey,
        unit: &ContentUnitWrite,
    ) -> Result<i64, TargetRepositoryError> {
        let mut tx = self.pool.begin().await?;
        self.claim_key_tx(key, &mut tx).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO content_units (uid, type_name, name_id, properties) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(generate_uid())
        .bind(CONTENT_UNIT_TYPE)
        .bind(unit.name_id)
        .bind(&unit.properties)
        .fetch_one(&mut *tx)
        .await?;

        self.upsert_unit_link_tx(id, unit, &mut tx).await?;
        self.insert_mapping_tx(key, id, &mut tx).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update_content_unit(
        &self,
        key: &LegacyKey,
        id: i64,
        unit: &ContentUnitWrite,
    ) -> Result<(), TargetRepositoryError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE content_units SET name_id = $2, properties = $3 WHERE id = $1")
            .bind(id)
            .bind(unit.name_id)
            .bind(&unit.properties)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TargetRepositoryError::StaleMapping { key: *key, target_id: id });
        }

        self.upsert_unit_link_tx(id, unit, &mut tx).await?;
        self.touch_mapping_tx(key, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_content_unit(&self, id: i64) -> Result<Option<ContentUnit>, TargetRepositoryError> {
        let row = sqlx::query(
            "SELECT id, uid, type_name, name_id, properties, created_at FROM content_units WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(content_unit_from_row).transpose()?)
    }

    async fn create_file(&self, key: &LegacyKey, file: &FileWrite) -> Result<i64, TargetRepositoryError> {
        let mut tx = self.pool.begin().await?;
        self.claim_key_tx(key, &mut tx).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (uid, name, size, language, content_unit_id, file_created_at, properties) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(&file.uid)
        .bind(&file.name)
        .bind(file.size)
        .bind(file.language.as_ref().map(|l| l.as_str()))
        .bind(file.content_unit_id)
        .bind(file.file_created_at)
        .bind(&file.properties)
        .fetch_one(&mut *tx)
        .await?;

        self.insert_mapping_tx(key, id, &mut tx).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update_file(&self, key: &LegacyKey, id: i64, file: &FileWrite) -> Result<(), TargetRepositoryError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE files SET uid = $2, name = $3, size = $4, language = $5, content_unit_id = $6, \
             file_created_at = $7, properties = $8 WHERE id = $1",
        )
        .bind(id)
        .bind(&file.uid)
        .bind(&file.name)
        .bind(file.size)
        .bind(file.language.as_ref().map(|l| l.as_str()))
        .bind(file.content_unit_id)
        .bind(file.file_created_at)
        .bind(&file.properties)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(TargetRepositoryError::StaleMapping { key: *key, target_id: id });
        }

        self.touch_mapping_tx(key, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_file(&self, id: i64) -> Result<Option<MdbFile>, TargetRepositoryError> {
        let row = sqlx::query(
            "SELECT id, uid, name, content_unit_id, file_created_at, size, language, properties \
             FROM files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(file_from_row).transpose()?)
    }

    async fn list_collection_units(&self, collection_id: i64) -> Result<Vec<i64>, TargetRepositoryError> {
        let ids = sqlx::query_scalar(
            "SELECT content_unit_id FROM collections_content_units \
             WHERE collection_id = $1 ORDER BY position, content_unit_id",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_unit_files(&self, content_unit_id: i64) -> Result<Vec<MdbFile>, TargetRepositoryError> {
        let rows = sqlx::query(
            "SELECT id, uid, name, content_unit_id, file_created_at, size, language, properties \
             FROM files WHERE content_unit_id = $1 ORDER BY id",
        )
        .bind(content_unit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(file_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn counts(&self) -> Result<CatalogCounts, TargetRepositoryError> {
        let row = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM collections) AS collections, \
                (SELECT COUNT(*) FROM content_units) AS content_units, \
                (SELECT COUNT(*) FROM files) AS files, \
                (SELECT COUNT(*) FROM string_translations) AS translations",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CatalogCounts {
            collections: row.try_get::<i64, _>("collections")? as u64,
            content_units: row.try_get::<i64, _>("content_units")? as u64,
            files: row.try_get::<i64, _>("files")? as u64,
            translations: row.try_get::<i64, _>("translations")? as u64,
        })
    }
}
