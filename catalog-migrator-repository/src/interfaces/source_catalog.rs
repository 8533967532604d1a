//! This module defines the `SourceCatalog` trait, the read-only view of the
//! legacy catalog. Implementations return plain records; assembling and
//! validating the lesson hierarchy is left to the caller.
use crate::errors::SourceCatalogError;
use catalog_migrator_shared::types::{AssetClaim, AssetLink, Container, FileAsset, MigrationScope, VirtualLesson};

/// Read-only access to the legacy lessons, containers and file assets.
///
/// No method mutates the source. Every record is returned with its localized
/// descriptions already attached.
#[async_trait::async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Lists the lesson ids a run over `scope` covers, in ascending order.
    ///
    /// For `MigrationScope::Lesson(id)` this is `[id]` whether or not the
    /// lesson exists; a missing lesson surfaces when it is fetched.
    async fn list_lesson_ids(&self, scope: &MigrationScope) -> Result<Vec<i64>, SourceCatalogError>;

    /// Fetches one lesson, or `None` if it does not exist.
    async fn fetch_lesson(&self, lesson_id: i64) -> Result<Option<VirtualLesson>, SourceCatalogError>;

    /// Fetches the containers of a lesson ordered by position, then id.
    async fn fetch_containers(&self, lesson_id: i64) -> Result<Vec<Container>, SourceCatalogError>;

    /// Fetches the container/asset membership rows of the given containers.
    async fn fetch_asset_links(&self, container_ids: &[i64]) -> Result<Vec<AssetLink>, SourceCatalogError>;

    /// Fetches every claim on the given assets across the whole catalog,
    /// ordered by lesson, then container. Containers of missing lessons are
    /// left out.
    async fn fetch_asset_claims(&self, asset_ids: &[i64]) -> Result<Vec<AssetClaim>, SourceCatalogError>;

    /// Fetches the given file assets. Ids with no record are simply absent
    /// from the result.
    async fn fetch_file_assets(&self, asset_ids: &[i64]) -> Result<Vec<FileAsset>, SourceCatalogError>;

    /// Lists containers whose lesson does not exist.
    async fn list_orphaned_containers(&self) -> Result<Vec<i64>, SourceCatalogError>;
}
