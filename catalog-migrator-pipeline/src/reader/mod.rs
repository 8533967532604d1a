//! This module defines the `CatalogReader`, the read-only traversal of the
//! legacy hierarchy (lesson -> containers -> file assets).
//!
//! Lessons are enumerated once into a [`LessonCursor`] and expanded one at a
//! time into a [`LessonTree`] of plain nested sequences.
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use catalog_migrator_repository::SourceCatalog;
use catalog_migrator_shared::types::{
    AssetClaim, ContainerNode, FileAsset, Language, LegacyKey, LegacyNode, LessonTree, LocalizedText,
    MigrationScope, StructuralIssue,
};
use tracing::{debug, warn};

use crate::errors::ReaderError;

/// The lesson ids of a run, consumed as they are read.
///
/// A cursor cannot be rewound; open a new one to enumerate again.
#[derive(Debug)]
pub struct LessonCursor {
    pending: VecDeque<i64>,
}

impl LessonCursor {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            pending: ids.into_iter().collect(),
        }
    }

    /// Removes the given ids from the cursor and returns the ones that were
    /// pending, in cursor order.
    pub fn exclude(&mut self, ids: &HashSet<i64>) -> Vec<i64> {
        let (excluded, kept): (VecDeque<i64>, VecDeque<i64>) =
            self.pending.drain(..).partition(|id| ids.contains(id));
        self.pending = kept;
        excluded.into()
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Iterator for LessonCursor {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        self.pending.pop_front()
    }
}

/// `CatalogReader` walks the legacy catalog through a [`SourceCatalog`].
pub struct CatalogReader {
    source: Arc<dyn SourceCatalog>,
}

impl CatalogReader {
    pub fn new(source: Arc<dyn SourceCatalog>) -> Self {
        Self { source }
    }

    /// Enumerates the lessons in `scope`.
    pub async fn open(&self, scope: &MigrationScope) -> Result<LessonCursor, ReaderError> {
        let ids = self.source.list_lesson_ids(scope).await?;
        debug!(%scope, lesson_count = ids.len(), "Enumerated lessons");
        Ok(LessonCursor::new(ids))
    }

    /// Loads a lesson with its containers and file assets.
    ///
    /// A missing lesson is an error. Problems below the lesson are attached to
    /// the tree as [`StructuralIssue`]s and the affected asset is left out:
    /// a link to an asset that does not exist, or an asset linked to a second
    /// container.
    ///
    /// An asset linked from several containers belongs to the first of them in
    /// catalog order: lowest lesson id, then container order within the lesson.
    /// The answer does not depend on which lessons a run covers.
    pub async fn expand(&self, lesson_id: i64) -> Result<LessonTree, ReaderError> {
        let lesson = self
            .source
            .fetch_lesson(lesson_id)
            .await?
            .ok_or(ReaderError::LessonNotFound(lesson_id))?;

        let containers = self.source.fetch_containers(lesson_id).await?;
        let container_ids: Vec<i64> = containers.iter().map(|c| c.id).collect();
        let links = self.source.fetch_asset_links(&container_ids).await?;

        let asset_ids: Vec<i64> = links
            .iter()
            .map(|link| link.file_asset_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let earlier_claims: HashMap<i64, AssetClaim> = self
            .source
            .fetch_asset_claims(&asset_ids)
            .await?
            .into_iter()
            .filter(|claim| claim.virtual_lesson_id < lesson_id)
            .rev()
            .map(|claim| (claim.file_asset_id, claim))
            .collect();
        let mut assets: HashMap<i64, FileAsset> = self
            .source
            .fetch_file_assets(&asset_ids)
            .await?
            .into_iter()
            .map(|asset| (asset.id, asset))
            .collect();

        let mut issues = Vec::new();
        let mut owners: HashMap<i64, i64> = HashMap::new();
        let mut nodes = Vec::with_capacity(containers.len());

        for container in containers {
            let mut file_assets = Vec::new();
            for link in links.iter().filter(|link| link.container_id == container.id) {
                let asset_id = link.file_asset_id;
                if let Some(claim) = earlier_claims.get(&asset_id) {
                    warn!(
                        lesson_id,
                        file_asset_id = asset_id,
                        owner_lesson_id = claim.virtual_lesson_id,
                        "File asset already belongs to an earlier lesson"
                    );
                    issues.push(StructuralIssue {
                        key: LegacyKey::file_asset(asset_id),
                        reason: format!(
                            "file asset belongs to container {} of lesson {} and is also linked to container {}",
                            claim.container_id, claim.virtual_lesson_id, container.id
                        ),
                    });
                    continue;
                }
                match owners.get(&asset_id) {
                    Some(owner) if *owner == container.id => continue,
                    Some(owner) => {
                        warn!(lesson_id, file_asset_id = asset_id, "File asset linked to more than one container");
                        issues.push(StructuralIssue {
                            key: LegacyKey::file_asset(asset_id),
                            reason: format!(
                                "file asset is linked to container {owner} and container {}",
                                container.id
                            ),
                        });
                        continue;
                    }
                    None => {}
                }

                match assets.remove(&asset_id) {
                    Some(asset) => {
                        owners.insert(asset_id, container.id);
                        file_assets.push(asset);
                    }
                    None => {
                        warn!(lesson_id, file_asset_id = asset_id, "Container links a missing file asset");
                        issues.push(StructuralIssue {
                            key: LegacyKey::file_asset(asset_id),
                            reason: format!("container {} links a missing file asset", container.id),
                        });
                    }
                }
            }
            nodes.push(ContainerNode { container, file_assets });
        }

        Ok(LessonTree {
            lesson,
            containers: nodes,
            issues,
        })
    }

    /// Containers whose lesson does not exist. They are unreachable from any
    /// lesson and only reported.
    pub async fn orphaned_containers(&self) -> Result<Vec<i64>, ReaderError> {
        Ok(self.source.list_orphaned_containers().await?)
    }
}

/// The text of `node` in `language`, if the legacy catalog has one.
pub fn description<'a>(node: LegacyNode<'a>, language: &Language) -> Option<&'a str> {
    node.descriptions().get(language)
}

/// The descriptions of `node` restricted to `languages`. An empty
/// `languages` keeps every language the node has.
pub fn resolve_descriptions(node: LegacyNode<'_>, languages: &[Language]) -> LocalizedText {
    if languages.is_empty() {
        return node.descriptions().clone();
    }
    languages
        .iter()
        .filter_map(|language| description(node, language).map(|text| (language.clone(), text.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_migrator_repository::InMemorySourceCatalog;
    use catalog_migrator_shared::types::{Container, VirtualLesson};
    use chrono::Utc;

    fn lesson(id: i64) -> VirtualLesson {
        VirtualLesson {
            id,
            film_date: None,
            created_at: Utc::now(),
            descriptions: LocalizedText::new(),
        }
    }

    fn container(id: i64, lesson_id: i64, position: i32) -> Container {
        Container {
            id,
            virtual_lesson_id: lesson_id,
            name: format!("container {id}"),
            position,
            created_at: Utc::now(),
            descriptions: LocalizedText::new()
                .with(Language::hebrew(), "עברית")
                .with(Language::russian(), "русский"),
        }
    }

    fn asset(id: i64) -> FileAsset {
        FileAsset {
            id,
            uid: format!("uid{id}"),
            name: format!("file_{id}.mp3"),
            language: None,
            size: None,
            created_at: Utc::now(),
            descriptions: LocalizedText::new(),
        }
    }

    #[tokio::test]
    async fn test_expand_builds_ordered_tree() {
        let source = InMemorySourceCatalog::new()
            .with_lesson(lesson(1))
            .with_container(container(11, 1, 2))
            .with_container(container(10, 1, 1))
            .with_file_asset(10, asset(100))
            .with_file_asset(10, asset(101));
        let reader = CatalogReader::new(Arc::new(source));

        let tree = reader.expand(1).await.unwrap();

        let ids: Vec<i64> = tree.containers.iter().map(|n| n.container.id).collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(tree.containers[0].file_assets.len(), 2);
        assert!(tree.containers[1].file_assets.is_empty());
        assert!(tree.issues.is_empty());
        assert_eq!(tree.file_asset_count(), 2);
    }

    #[tokio::test]
    async fn test_expand_missing_lesson_is_an_error() {
        let reader = CatalogReader::new(Arc::new(InMemorySourceCatalog::new()));

        let result = reader.expand(5).await;
        assert!(matches!(result, Err(ReaderError::LessonNotFound(5))));
    }

    #[tokio::test]
    async fn test_expand_reports_broken_links() {
        let source = InMemorySourceCatalog::new()
            .with_lesson(lesson(1))
            .with_container(container(10, 1, 1))
            .with_container(container(11, 1, 2))
            .with_file_asset(10, asset(100))
            .with_link(11, 100)
            .with_link(11, 404);
        let reader = CatalogReader::new(Arc::new(source));

        let tree = reader.expand(1).await.unwrap();

        assert_eq!(tree.containers[0].file_assets.len(), 1);
        assert!(tree.containers[1].file_assets.is_empty());
        let keys: Vec<LegacyKey> = tree.issues.iter().map(|i| i.key).collect();
        assert_eq!(keys, vec![LegacyKey::file_asset(100), LegacyKey::file_asset(404)]);
    }

    #[tokio::test]
    async fn test_expand_leaves_assets_of_earlier_lessons_out() {
        let source = InMemorySourceCatalog::new()
            .with_lesson(lesson(1))
            .with_lesson(lesson(2))
            .with_container(container(10, 1, 1))
            .with_container(container(20, 2, 1))
            .with_file_asset(10, asset(100))
            .with_file_asset(20, asset(200))
            .with_link(20, 100);
        let reader = CatalogReader::new(Arc::new(source));

        let first = reader.expand(1).await.unwrap();
        assert_eq!(first.containers[0].file_assets.len(), 1);
        assert!(first.issues.is_empty());

        let second = reader.expand(2).await.unwrap();
        let ids: Vec<i64> = second.containers[0].file_assets.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![200]);
        assert_eq!(second.issues.len(), 1);
        assert_eq!(second.issues[0].key, LegacyKey::file_asset(100));
        assert!(second.issues[0].reason.contains("container 10 of lesson 1"));
    }

    #[test]
    fn test_cursor_exclude_keeps_order() {
        let mut cursor = LessonCursor::new(vec![1, 2, 3, 4]);

        let excluded = cursor.exclude(&HashSet::from([3, 1, 9]));

        assert_eq!(excluded, vec![1, 3]);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_resolve_descriptions_filters_languages() {
        let container = container(10, 1, 0);
        let node = LegacyNode::Container(&container);

        let all = resolve_descriptions(node, &[]);
        assert_eq!(all.len(), 2);

        let hebrew_only = resolve_descriptions(node, &[Language::hebrew(), Language::english()]);
        assert_eq!(hebrew_only.len(), 1);
        assert_eq!(description(node, &Language::russian()), Some("русский"));
        assert_eq!(description(node, &Language::english()), None);
    }
}
