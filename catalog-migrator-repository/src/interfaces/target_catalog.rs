//! This module defines the `TargetCatalogRepository` trait, which provides an
//! interface for writing the migrated catalog and its legacy key map.
//! Rows are only ever created or updated, never deleted and reinserted.
use crate::errors::TargetRepositoryError;
use catalog_migrator_shared::types::{
    CatalogCounts, Collection, CollectionWrite, ContentUnit, ContentUnitWrite, FileWrite, LegacyKey,
    MdbFile,
};

/// A trait that defines the interface for the target catalog.
///
/// Every `create_*` method creates the row and records the
/// `legacy key -> target id` mapping atomically. If the key is already mapped
/// when the write runs, nothing is written and `DuplicateLegacyKey` carries the
/// existing id.
#[async_trait::async_trait]
pub trait TargetCatalogRepository: Send + Sync {
    /// Returns the target id a legacy key was migrated to, if any.
    async fn find_by_legacy_key(&self, key: &LegacyKey) -> Result<Option<i64>, TargetRepositoryError>;

    async fn create_collection(
        &self,
        key: &LegacyKey,
        collection: &CollectionWrite,
    ) -> Result<i64, TargetRepositoryError>;

    /// Refreshes the mutable fields of an existing collection.
    ///
    /// Fails with `StaleMapping` if the row `key` maps to no longer exists.
    async fn update_collection(
        &self,
        key: &LegacyKey,
        id: i64,
        collection: &CollectionWrite,
    ) -> Result<(), TargetRepositoryError>;

    async fn get_collection(&self, id: i64) -> Result<Option<Collection>, TargetRepositoryError>;

    /// Creates a content unit and links it under `unit.collection_id`.
    async fn create_content_unit(
        &self,
        key: &LegacyKey,
        unit: &ContentUnitWrite,
    ) -> Result<i64, TargetRepositoryError>;

    /// Refreshes an existing content unit and its link position.
    async fn update_content_unit(
        &self,
        key: &LegacyKey,
        id: i64,
        unit: &ContentUnitWrite,
    ) -> Result<(), TargetRepositoryError>;

    async fn get_content_unit(&self, id: i64) -> Result<Option<ContentUnit>, TargetRepositoryError>;

    async fn create_file(&self, key: &LegacyKey, file: &FileWrite) -> Result<i64, TargetRepositoryError>;

    async fn update_file(&self, key: &LegacyKey, id: i64, file: &FileWrite) -> Result<(), TargetRepositoryError>;

    async fn get_file(&self, id: i64) -> Result<Option<MdbFile>, TargetRepositoryError>;

    /// Content unit ids of a collection, ordered by link position.
    async fn list_collection_units(&self, collection_id: i64) -> Result<Vec<i64>, TargetRepositoryError>;

    /// Files of a content unit, ordered by id.
    async fn list_unit_files(&self, content_unit_id: i64) -> Result<Vec<MdbFile>, TargetRepositoryError>;

    async fn counts(&self) -> Result<CatalogCounts, TargetRepositoryError>;
}
