//! Catalog Migrator Library
//!
//! This library provides the application layer of the migrator: command line
//! arguments, configuration and dependency wiring, error handling and report
//! rendering.

pub mod cli;
pub mod config;
pub mod errors;
pub mod report;

pub use cli::Args;
pub use config::{Dependencies, Settings};
pub use errors::MigratorError;
