//! # Catalog Migrator Pipeline
//! This crate holds the stages of a migration run: reading the legacy
//! hierarchy, mapping it to target drafts, allocating translation sequence
//! ids, upserting the drafts, and the orchestrator that drives them lesson by
//! lesson, along with error handling.
pub mod allocator;
pub mod loader;
pub mod mapper;
pub mod orchestrator;
pub mod reader;

pub mod errors;
