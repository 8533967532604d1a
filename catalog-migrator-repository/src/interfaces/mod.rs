//! This module defines and re-exports the interfaces for the catalog stores.
//! It serves as a central point for accessing traits related to data interaction.
mod checkpoint_repository;
mod source_catalog;
mod target_catalog;
mod translations;

pub use checkpoint_repository::CheckpointRepository;
pub use source_catalog::SourceCatalog;
pub use target_catalog::TargetCatalogRepository;
pub use translations::TranslationRepository;
