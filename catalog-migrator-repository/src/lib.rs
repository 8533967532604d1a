//! # Catalog Migrator Repository
//! This crate provides the storage traits the migrator is written against and
//! their implementations. It includes definitions for errors, interfaces,
//! concrete implementations for PostgreSQL (the legacy source catalog and the
//! target catalog) and in-memory implementations used for dry runs and tests.
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;
mod uid;

pub use errors::{
    CheckpointRepositoryError, SourceCatalogError, TargetRepositoryError, TranslationRepositoryError,
};
pub use interfaces::{CheckpointRepository, SourceCatalog, TargetCatalogRepository, TranslationRepository};
pub use memory::{
    InMemoryCheckpointRepository, InMemorySourceCatalog, InMemoryTargetCatalog,
    InMemoryTranslationRepository,
};
pub use postgres::{
    PostgresCheckpointRepository, PostgresSourceCatalog, PostgresTargetCatalog,
    PostgresTranslationRepository, MIGRATOR,
};
