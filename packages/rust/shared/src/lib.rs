//! Shared types, error model, and configuration for the masterlist pipeline.
//!
//! This crate is the foundation depended on by all other masterlist crates.
//! It provides:
//! - [`MasterlistError`]: the unified error type
//! - Domain types ([`UploadEvent`], [`StudentRecord`], [`StudentMap`])
//! - Database path helpers ([`paths`])
//! - Configuration ([`AppConfig`], [`ParserConfig`], config loading)

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_PROGRAM_CODES, ParserConfig, ParserSection, StorageConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from,
};
pub use error::{MasterlistError, Result};
pub use types::{StudentMap, StudentRecord, UploadEvent};
