#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use catalog_migrator_pipeline::allocator::TranslationAllocator;
use catalog_migrator_pipeline::loader::UpsertEngine;
use catalog_migrator_pipeline::orchestrator::{Orchestrator, OrchestratorConfig};
use catalog_migrator_pipeline::reader::CatalogReader;
use catalog_migrator_repository::{
    CheckpointRepository, InMemoryCheckpointRepository, InMemorySourceCatalog, InMemoryTargetCatalog,
    InMemoryTranslationRepository, SourceCatalog, TargetCatalogRepository, TranslationRepository,
};
use catalog_migrator_shared::types::{
    Container, FileAsset, Language, LegacyKey, LocalizedText, VirtualLesson,
};
use chrono::{NaiveDate, TimeZone, Utc};

/// The stores of one simulated deployment. Every orchestrator built from a
/// harness shares them, the way successive process runs share a database.
pub struct Harness {
    pub source: Arc<InMemorySourceCatalog>,
    pub translations: Arc<InMemoryTranslationRepository>,
    pub target: Arc<InMemoryTargetCatalog>,
    pub checkpoints: Arc<InMemoryCheckpointRepository>,
}

impl Harness {
    pub fn new(source: InMemorySourceCatalog) -> Self {
        let translations = Arc::new(InMemoryTranslationRepository::new());
        Self {
            source: Arc::new(source),
            target: Arc::new(InMemoryTargetCatalog::new().with_translations(translations.clone())),
            translations,
            checkpoints: Arc::new(InMemoryCheckpointRepository::new()),
        }
    }

    /// A fresh orchestrator, as a new process would build it.
    pub fn orchestrator(&self, config: OrchestratorConfig) -> Orchestrator {
        build(
            self.source.clone(),
            self.target.clone(),
            self.translations.clone(),
            self.checkpoints.clone(),
            config,
        )
    }

    pub async fn target_id(&self, key: LegacyKey) -> Option<i64> {
        self.target.find_by_legacy_key(&key).await.unwrap()
    }

    pub async fn unit_name(&self, container_id: i64) -> Option<(i64, LocalizedText)> {
        let id = self.target_id(LegacyKey::container(container_id)).await?;
        let unit = self.target.get_content_unit(id).await.unwrap()?;
        let name_id = unit.name_id?;
        Some((name_id, self.translations.find_translations(name_id).await.unwrap()))
    }

    pub async fn collection_name(&self, lesson_id: i64) -> Option<(i64, LocalizedText)> {
        let id = self.target_id(LegacyKey::lesson(lesson_id)).await?;
        let collection = self.target.get_collection(id).await.unwrap()?;
        let texts = self.translations.find_translations(collection.name_id).await.unwrap();
        Some((collection.name_id, texts))
    }
}

pub fn build(
    source: Arc<dyn SourceCatalog>,
    target: Arc<dyn TargetCatalogRepository>,
    translations: Arc<dyn TranslationRepository>,
    checkpoints: Arc<dyn CheckpointRepository>,
    config: OrchestratorConfig,
) -> Orchestrator {
    Orchestrator::with_config(
        CatalogReader::new(source),
        UpsertEngine::new(target, TranslationAllocator::new(translations)),
        checkpoints,
        config,
    )
}

/// Resuming config under `run_id`.
pub fn config(run_id: &str) -> OrchestratorConfig {
    OrchestratorConfig {
        run_id: run_id.to_string(),
        ..Default::default()
    }
}

/// Config that reprocesses every lesson regardless of checkpoints.
pub fn fresh(run_id: &str) -> OrchestratorConfig {
    OrchestratorConfig {
        resume: false,
        ..config(run_id)
    }
}

pub fn with_timeout(run_id: &str, timeout: Duration) -> OrchestratorConfig {
    OrchestratorConfig {
        lesson_timeout: timeout,
        ..config(run_id)
    }
}

pub fn lesson(id: i64) -> VirtualLesson {
    VirtualLesson {
        id,
        film_date: NaiveDate::from_ymd_opt(2016, 3, 1),
        created_at: Utc.with_ymd_and_hms(2016, 3, 1, 3, 0, 0).unwrap(),
        descriptions: LocalizedText::new().with(Language::hebrew(), format!("שיעור {id}")),
    }
}

pub fn container(id: i64, lesson_id: i64, position: i32) -> Container {
    Container {
        id,
        virtual_lesson_id: lesson_id,
        name: format!("container_{id}"),
        position,
        created_at: Utc.with_ymd_and_hms(2016, 3, 1, 4, 0, 0).unwrap(),
        descriptions: LocalizedText::new()
            .with(Language::hebrew(), format!("חלק {id}"))
            .with(Language::russian(), format!("часть {id}")),
    }
}

pub fn asset(id: i64) -> FileAsset {
    FileAsset {
        id,
        uid: format!("u{id:07}"),
        name: format!("heb_o_rav_{id}.mp3"),
        language: Some(Language::hebrew()),
        size: Some(id * 1000),
        created_at: Utc.with_ymd_and_hms(2016, 3, 1, 5, 0, 0).unwrap(),
        descriptions: LocalizedText::new(),
    }
}

/// Lesson 1 with container 10 holding assets 100 and 101, and container 11
/// holding nothing.
pub fn single_lesson() -> InMemorySourceCatalog {
    InMemorySourceCatalog::new()
        .with_lesson(lesson(1))
        .with_container(container(10, 1, 1))
        .with_container(container(11, 1, 2))
        .with_file_asset(10, asset(100))
        .with_file_asset(10, asset(101))
}

/// Three lessons with one container and one asset each.
pub fn three_lessons() -> InMemorySourceCatalog {
    let mut source = InMemorySourceCatalog::new();
    for id in 1..=3 {
        source = source
            .with_lesson(lesson(id))
            .with_container(container(id * 10, id, 1))
            .with_file_asset(id * 10, asset(id * 100));
    }
    source
}
