//! PostgreSQL implementation of the legacy source catalog.
//!
//! Reads the kmedia tables:
//!
//! - `virtual_lessons` / `lesson_descriptions`
//! - `containers` / `container_descriptions`
//! - `containers_file_assets` (container/asset membership)
//! - `file_assets` / `file_asset_descriptions`
//!
//! Description rows are keyed by `lang_id`. Rows with a language code that
//! cannot be parsed are dropped with a warning rather than failing the lesson.
use std::collections::HashMap;

use async_trait::async_trait;
use catalog_migrator_shared::types::{
    AssetClaim, AssetLink, Container, FileAsset, Language, LocalizedText, MigrationScope, VirtualLesson,
};
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::warn;

use crate::{SourceCatalog, SourceCatalogError};

/// PostgreSQL-backed, read-only view of the legacy catalog.
pub struct PostgresSourceCatalog {
    pool: sqlx::PgPool,
}

impl PostgresSourceCatalog {
    /// Creates a new source catalog over a pool connected to the legacy database.
    pub async fn new(pool: sqlx::PgPool) -> Result<Self, SourceCatalogError> {
        Ok(Self { pool })
    }

    /// Loads `(owner_id, lang_id, text)` rows and groups them per owner.
    async fn load_descriptions(
        &self,
        sql: &str,
        owner_ids: &[i64],
    ) -> Result<HashMap<i64, LocalizedText>, SourceCatalogError> {
        let mut descriptions: HashMap<i64, LocalizedText> = HashMap::new();
        if owner_ids.is_empty() {
            return Ok(descriptions);
        }

        let rows = sqlx::query(sql).bind(owner_ids).fetch_all(&self.pool).await?;
        for row in rows {
            let owner_id: i64 = row.try_get("owner_id")?;
            let lang_id: String = row.try_get("lang_id")?;
            let text: Option<String> = row.try_get("text")?;

            let Some(text) = text else { continue };
            match lang_id.parse::<Language>() {
                Ok(language) => descriptions.entry(owner_id).or_default().insert(language, text),
                Err(e) => warn!(owner_id, error = %e, "Ignoring description with an invalid language code"),
            }
        }
        Ok(descriptions)
    }
}

fn container_from_row(row: &PgRow) -> Result<Container, sqlx::Error> {
    Ok(Container {
        id: row.try_get("id")?,
        virtual_lesson_id: row.try_get("virtual_lesson_id")?,
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
        position: row.try_get::<Option<i32>, _>("position")?.unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        descriptions: LocalizedText::new(),
    })
}

fn file_asset_from_row(row: &PgRow) -> Result<FileAsset, sqlx::Error> {
    let id: i64 = row.try_get("id")?;
    let language = match row.try_get::<Option<String>, _>("lang_id")? {
        Some(code) => match code.parse::<Language>() {
            Ok(language) => Some(language),
            Err(e) => {
                warn!(file_asset_id = id, error = %e, "Ignoring invalid file asset language");
                None
            }
        },
        None => None,
    };

    Ok(FileAsset {
        id,
        uid: row.try_get("uid")?,
        name: row.try_get("name")?,
        language,
        size: row.try_get("size")?,
        created_at: row.try_get("created_at")?,
        descriptions: LocalizedText::new(),
    })
}

#[async_trait]
impl SourceCatalog for PostgresSourceCatalog {
    async fn list_lesson_ids(&self, scope: &MigrationScope) -> Result<Vec<i64>, SourceCatalogError> {
        match scope {
            MigrationScope::Lesson(id) => Ok(vec![*id]),
            MigrationScope::All => {
                let rows = sqlx::query("SELECT id FROM virtual_lessons ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?;
                rows.iter()
                    .map(|row| row.try_get::<i64, _>("id").map_err(SourceCatalogError::from))
                    .collect()
            }
        }
    }

    async fn fetch_lesson(&self, lesson_id: i64) -> Result<Option<VirtualLesson>, SourceCatalogError> {
        let row = sqlx::query("SELECT id, film_date, created_at FROM virtual_lessons WHERE id = $1")
            .bind(lesson_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut descriptions = self
            .load_descriptions(
                "SELECT virtual_lesson_id AS owner_id, lang_id, description AS text \
                 FROM lesson_descriptions WHERE virtual_lesson_id = ANY($1)",
                &[lesson_id],
            )
            .await?;

        Ok(Some(VirtualLesson {
            id: row.try_get("id")?,
            film_date: row.try_get("film_date")?,
            created_at: row.try_get("created_at")?,
            descriptions: descriptions.remove(&lesson_id).unwrap_or_default(),
        }))
    }

    async fn fetch_containers(&self, lesson_id: i64) -> Result<Vec<Container>, SourceCatalogError> {
        let rows = sqlx::query(
            "SELECT id, virtual_lesson_id, name, position, created_at \
             FROM containers WHERE virtual_lesson_id = $1 \
             ORDER BY position NULLS LAST, id",
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await?;

        let mut containers = rows
            .iter()
            .map(container_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<i64> = containers.iter().map(|c| c.id).collect();
        let mut descriptions = self
            .load_descriptions(
                "SELECT container_id AS owner_id, lang_id, container_desc AS text \
                 FROM container_descriptions WHERE container_id = ANY($1)",
                &ids,
            )
            .await?;
        for container in &mut containers {
            container.descriptions = descriptions.remove(&container.id).unwrap_or_default();
        }

        Ok(containers)
    }

    async fn fetch_asset_links(&self, container_ids: &[i64]) -> Result<Vec<AssetLink>, SourceCatalogError> {
        if container_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT container_id, file_asset_id FROM containers_file_assets \
             WHERE container_id = ANY($1) ORDER BY container_id, file_asset_id",
        )
        .bind(container_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AssetLink, SourceCatalogError> {
                Ok(AssetLink {
                    container_id: row.try_get("container_id")?,
                    file_asset_id: row.try_get("file_asset_id")?,
                })
            })
            .collect()
    }

    async fn fetch_asset_claims(&self, asset_ids: &[i64]) -> Result<Vec<AssetClaim>, SourceCatalogError> {
        if asset_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT DISTINCT cfa.file_asset_id, cfa.container_id, c.virtual_lesson_id \
             FROM containers_file_assets cfa \
             JOIN containers c ON c.id = cfa.container_id \
             JOIN virtual_lessons vl ON vl.id = c.virtual_lesson_id \
             WHERE cfa.file_asset_id = ANY($1) \
             ORDER BY c.virtual_lesson_id, cfa.container_id, cfa.file_asset_id",
        )
        .bind(asset_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AssetClaim, SourceCatalogError> {
                Ok(AssetClaim {
                    file_asset_id: row.try_get("file_asset_id")?,
                    container_id: row.try_get("container_id")?,
                    virtual_lesson_id: row.try_get("virtual_lesson_id")?,
                })
            })
            .collect()
    }

    async fn fetch_file_assets(&self, asset_ids: &[i64]) -> Result<Vec<FileAsset>, SourceCatalogError> {
        if asset_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, uid, name, lang_id, size, created_at \
             FROM file_assets WHERE id = ANY($1) ORDER BY id",
        )
        .bind(asset_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut assets = rows
            .iter()
            .map(file_asset_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<i64> = assets.iter().map(|a| a.id).collect();
        let mut descriptions = self
            .load_descriptions(
                "SELECT file_id AS owner_id, lang_id, filedesc AS text \
                 FROM file_asset_descriptions WHERE file_id = ANY($1)",
                &ids,
            )
            .await?;
        for asset in &mut assets {
            asset.descriptions = descriptions.remove(&asset.id).unwrap_or_default();
        }

        Ok(assets)
    }

    async fn list_orphaned_containers(&self) -> Result<Vec<i64>, SourceCatalogError> {
        let rows = sqlx::query(
            "SELECT c.id FROM containers c \
             LEFT JOIN virtual_lessons vl ON vl.id = c.virtual_lesson_id \
             WHERE vl.id IS NULL ORDER BY c.id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<i64, _>("id").map_err(SourceCatalogError::from))
            .collect()
    }
}
