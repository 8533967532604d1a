//! PostgreSQL implementations of the catalog stores.
//!
//! The legacy catalog is only ever read. The target catalog schema (string
//! translations, collections, content units, files, the legacy key map and the
//! run checkpoints) is embedded as sqlx migrations and applied with
//! [`MIGRATOR`] before a run.
mod checkpoint_repository;
mod source_catalog;
mod target_catalog_repository;
mod translation_repository;

pub use checkpoint_repository::PostgresCheckpointRepository;
pub use source_catalog::PostgresSourceCatalog;
pub use target_catalog_repository::PostgresTargetCatalog;
pub use translation_repository::PostgresTranslationRepository;

/// Embedded migrations for the target catalog schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("src/postgres/migrations");
