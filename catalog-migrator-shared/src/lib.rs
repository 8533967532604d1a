//! # Catalog Migrator Shared
//! This crate defines the data structures shared across the catalog migrator.
//! It includes the legacy catalog records, the target catalog drafts and rows,
//! the legacy keys that tie the two together, and the run report.
pub mod types;
