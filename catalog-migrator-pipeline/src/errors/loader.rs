//! Error types for the loader module of the Catalog Migrator Pipeline.
//! Defines the errors that can occur while upserting target entities.
use catalog_migrator_repository::TargetRepositoryError;
use catalog_migrator_shared::types::{LegacyKey, SkipReason};
use thiserror::Error;

use crate::errors::AllocatorError;

/// Represents errors that can occur within the upsert engine.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Target repository error: {0}")]
    Target(#[from] TargetRepositoryError),

    #[error("Allocator error: {0}")]
    Allocator(#[from] AllocatorError),

    /// The parent of `key` has not been migrated.
    #[error("Parent {parent} of {key} has no target mapping")]
    UnmappedParent { key: LegacyKey, parent: LegacyKey },

    /// A translation kept pointing at a missing sequence id after one retry.
    #[error("Translations of {key} reference dangling sequence id {sequence_id}")]
    DanglingSequence { key: LegacyKey, sequence_id: i64 },

    /// A collection draft carried no name at all.
    #[error("Collection {0} has no name")]
    MissingName(LegacyKey),
}

impl LoaderError {
    /// Whether the run must stop writing.
    pub fn is_durability_failure(&self) -> bool {
        match self {
            LoaderError::Target(e) => e.is_durability_failure(),
            LoaderError::Allocator(e) => e.is_durability_failure(),
            _ => false,
        }
    }

    /// How the failed entity is reported.
    pub fn skip_reason(&self) -> SkipReason {
        match self {
            LoaderError::Target(TargetRepositoryError::ReferentialIntegrity(reason)) => {
                SkipReason::ReferentialIntegrity(reason.clone())
            }
            LoaderError::Target(e @ TargetRepositoryError::StaleMapping { .. }) => {
                SkipReason::ReferentialIntegrity(e.to_string())
            }
            LoaderError::UnmappedParent { .. } => SkipReason::ReferentialIntegrity(self.to_string()),
            LoaderError::DanglingSequence { sequence_id, .. } => SkipReason::DanglingSequence(*sequence_id),
            _ => SkipReason::Write(self.to_string()),
        }
    }
}
