use std::collections::BTreeMap;

use async_trait::async_trait;
use catalog_migrator_shared::types::{
    AssetClaim, AssetLink, Container, FileAsset, Language, MigrationScope, VirtualLesson,
};
use tokio::sync::RwLock;

use crate::{SourceCatalog, SourceCatalogError};

#[derive(Debug, Default)]
struct SourceState {
    lessons: BTreeMap<i64, VirtualLesson>,
    containers: BTreeMap<i64, Container>,
    file_assets: BTreeMap<i64, FileAsset>,
    links: Vec<AssetLink>,
}

/// A legacy catalog held in memory.
///
/// Built with the `with_*` methods; the `set_*` methods edit descriptions
/// afterwards, the way an editor would between two runs.
#[derive(Debug, Default)]
pub struct InMemorySourceCatalog {
    state: RwLock<SourceState>,
}

impl InMemorySourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lesson(mut self, lesson: VirtualLesson) -> Self {
        self.state.get_mut().lessons.insert(lesson.id, lesson);
        self
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.state.get_mut().containers.insert(container.id, container);
        self
    }

    /// Adds a file asset and links it to `container_id`.
    pub fn with_file_asset(mut self, container_id: i64, asset: FileAsset) -> Self {
        let state = self.state.get_mut();
        state.links.push(AssetLink {
            container_id,
            file_asset_id: asset.id,
        });
        state.file_assets.insert(asset.id, asset);
        self
    }

    /// Adds a bare membership row, whether or not either side exists.
    pub fn with_link(mut self, container_id: i64, file_asset_id: i64) -> Self {
        self.state.get_mut().links.push(AssetLink {
            container_id,
            file_asset_id,
        });
        self
    }

    pub async fn set_lesson_description(&self, lesson_id: i64, language: Language, text: &str) {
        if let Some(lesson) = self.state.write().await.lessons.get_mut(&lesson_id) {
            lesson.descriptions.insert(language, text);
        }
    }

    pub async fn set_container_description(&self, container_id: i64, language: Language, text: &str) {
        if let Some(container) = self.state.write().await.containers.get_mut(&container_id) {
            container.descriptions.insert(language, text);
        }
    }
}

#[async_trait]
impl SourceCatalog for InMemorySourceCatalog {
    async fn list_lesson_ids(&self, scope: &MigrationScope) -> Result<Vec<i64>, SourceCatalogError> {
        match scope {
            MigrationScope::Lesson(id) => Ok(vec![*id]),
            MigrationScope::All => Ok(self.state.read().await.lessons.keys().copied().collect()),
        }
    }

    async fn fetch_lesson(&self, lesson_id: i64) -> Result<Option<VirtualLesson>, SourceCatalogError> {
        Ok(self.state.read().await.lessons.get(&lesson_id).cloned())
    }

    async fn fetch_containers(&self, lesson_id: i64) -> Result<Vec<Container>, SourceCatalogError> {
        let state = self.state.read().await;
        let mut containers: Vec<Container> = state
            .containers
            .values()
            .filter(|c| c.virtual_lesson_id == lesson_id)
            .cloned()
            .collect();
        containers.sort_by_key(|c| (c.position, c.id));
        Ok(containers)
    }

    async fn fetch_asset_links(&self, container_ids: &[i64]) -> Result<Vec<AssetLink>, SourceCatalogError> {
        let state = self.state.read().await;
        let mut links: Vec<AssetLink> = state
            .links
            .iter()
            .filter(|link| container_ids.contains(&link.container_id))
            .copied()
            .collect();
        links.sort_by_key(|link| (link.container_id, link.file_asset_id));
        Ok(links)
    }

    async fn fetch_asset_claims(&self, asset_ids: &[i64]) -> Result<Vec<AssetClaim>, SourceCatalogError> {
        let state = self.state.read().await;
        let mut claims: Vec<AssetClaim> = state
            .links
            .iter()
            .filter(|link| asset_ids.contains(&link.file_asset_id))
            .filter_map(|link| {
                let container = state.containers.get(&link.container_id)?;
                state.lessons.contains_key(&container.virtual_lesson_id).then_some(AssetClaim {
                    file_asset_id: link.file_asset_id,
                    container_id: link.container_id,
                    virtual_lesson_id: container.virtual_lesson_id,
                })
            })
            .collect();
        claims.sort_by_key(|claim| (claim.virtual_lesson_id, claim.container_id, claim.file_asset_id));
        claims.dedup();
        Ok(claims)
    }

    async fn fetch_file_assets(&self, asset_ids: &[i64]) -> Result<Vec<FileAsset>, SourceCatalogError> {
        let state = self.state.read().await;
        Ok(state
            .file_assets
            .values()
            .filter(|asset| asset_ids.contains(&asset.id))
            .cloned()
            .collect())
    }

    async fn list_orphaned_containers(&self) -> Result<Vec<i64>, SourceCatalogError> {
        let state = self.state.read().await;
        Ok(state
            .containers
            .values()
            .filter(|c| !state.lessons.contains_key(&c.virtual_lesson_id))
            .map(|c| c.id)
            .collect())
    }
}
