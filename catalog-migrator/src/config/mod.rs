//! Configuration module for the Catalog Migrator.
//! Reads connection settings and wires the run's dependencies.
mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::Settings;
