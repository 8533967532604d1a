//! In-memory implementations of the catalog stores.
//!
//! They follow the same contracts as the PostgreSQL implementations
//! (sequence monotonicity, referential checks, one mapping per legacy key) and
//! back dry runs, where nothing may reach the target database, as well as the
//! pipeline tests.
mod checkpoint_repository;
mod source_catalog;
mod target_catalog;
mod translation_repository;

pub use checkpoint_repository::InMemoryCheckpointRepository;
pub use source_catalog::InMemorySourceCatalog;
pub use target_catalog::InMemoryTargetCatalog;
pub use translation_repository::InMemoryTranslationRepository;
