use std::sync::Arc;

use catalog_migrator_pipeline::allocator::TranslationAllocator;
use catalog_migrator_pipeline::loader::UpsertEngine;
use catalog_migrator_pipeline::orchestrator::{Orchestrator, OrchestratorConfig};
use catalog_migrator_pipeline::reader::CatalogReader;
use catalog_migrator_repository::{
    CheckpointRepository, InMemoryCheckpointRepository, InMemoryTargetCatalog,
    InMemoryTranslationRepository, PostgresCheckpointRepository, PostgresSourceCatalog,
    PostgresTargetCatalog, PostgresTranslationRepository, TargetCatalogRepository,
    TranslationRepository, MIGRATOR,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::config::Settings;
use crate::errors::MigratorError;

/// `Dependencies` holds the wired orchestrator of a run and the pools it
/// borrows.
///
/// Both pools must be released with [`Dependencies::close`] whatever the
/// outcome of the run.
pub struct Dependencies {
    pub orchestrator: Orchestrator,
    /// The target catalog the orchestrator writes to.
    pub target: Arc<dyn TargetCatalogRepository>,
    source_pool: PgPool,
    target_pool: Option<PgPool>,
}

impl Dependencies {
    /// Connects both catalogs and wires the orchestrator.
    ///
    /// The target schema is brought up to date before anything is returned.
    /// With `dry_run` the target database is never opened: the run writes to
    /// in-memory stores instead.
    pub async fn new(
        settings: &Settings,
        config: OrchestratorConfig,
        dry_run: bool,
    ) -> Result<Self, MigratorError> {
        info!(
            max_connections = settings.max_connections,
            acquire_timeout_secs = settings.acquire_timeout.as_secs(),
            statement_timeout_secs = settings.statement_timeout.as_secs(),
            run_id = %config.run_id,
            dry_run,
            "Initializing dependencies"
        );

        let source_pool = connect(&settings.kmedia_database_url, settings).await?;

        let wired = if dry_run {
            Self::in_memory(source_pool.clone(), config).await
        } else {
            let target_pool = match settings.mdb_database_url.as_deref() {
                Some(url) => connect(url, settings).await,
                None => Err(MigratorError::config("MDB_DATABASE_URL must be set")),
            };
            match target_pool {
                Ok(target_pool) => Self::postgres(source_pool.clone(), target_pool, config).await,
                Err(e) => Err(e),
            }
        };

        if wired.is_err() {
            source_pool.close().await;
        }
        wired
    }

    async fn postgres(
        source_pool: PgPool,
        target_pool: PgPool,
        config: OrchestratorConfig,
    ) -> Result<Self, MigratorError> {
        let wired = async {
            MIGRATOR.run(&target_pool).await?;
            info!("Target schema is up to date");

            let target: Arc<dyn TargetCatalogRepository> =
                Arc::new(PostgresTargetCatalog::new(target_pool.clone()).await?);
            let translations: Arc<dyn TranslationRepository> =
                Arc::new(PostgresTranslationRepository::new(target_pool.clone()).await?);
            let checkpoints: Arc<dyn CheckpointRepository> =
                Arc::new(PostgresCheckpointRepository::new(target_pool.clone()).await?);
            let source = PostgresSourceCatalog::new(source_pool.clone()).await?;

            Ok::<_, MigratorError>((
                wire(Arc::new(source), target.clone(), translations, checkpoints, config),
                target,
            ))
        }
        .await;

        match wired {
            Ok((orchestrator, target)) => Ok(Self {
                orchestrator,
                target,
                source_pool,
                target_pool: Some(target_pool),
            }),
            Err(e) => {
                target_pool.close().await;
                Err(e)
            }
        }
    }

    async fn in_memory(source_pool: PgPool, config: OrchestratorConfig) -> Result<Self, MigratorError> {
        let source = PostgresSourceCatalog::new(source_pool.clone()).await?;
        let translations = Arc::new(InMemoryTranslationRepository::new());
        let target: Arc<dyn TargetCatalogRepository> =
            Arc::new(InMemoryTargetCatalog::new().with_translations(translations.clone()));
        let orchestrator = wire(
            Arc::new(source),
            target.clone(),
            translations,
            Arc::new(InMemoryCheckpointRepository::new()),
            config,
        );

        Ok(Self {
            orchestrator,
            target,
            source_pool,
            target_pool: None,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.target_pool.is_none()
    }

    /// Closes both pools.
    pub async fn close(&self) {
        self.source_pool.close().await;
        if let Some(target_pool) = &self.target_pool {
            target_pool.close().await;
        }
        info!("Database connections closed");
    }
}

fn wire(
    source: Arc<PostgresSourceCatalog>,
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

/// Opens a pool whose connections all carry the configured statement timeout.
async fn connect(database_url: &str, settings: &Settings) -> Result<PgPool, MigratorError> {
    let statement_timeout_ms = settings.statement_timeout.as_millis();

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                let statement = format!("SET statement_timeout = {statement_timeout_ms}");
                conn.execute(statement.as_str()).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;

    Ok(pool)
}
