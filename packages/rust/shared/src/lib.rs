//! Shared types, error model, and configuration for CourseAtlas.
//!
//! This crate is the foundation depended on by all other CourseAtlas crates.
//! It provides:
//! - [`CatalogError`] — the unified error type
//! - Domain types ([`SubjectListing`], [`CourseStub`], [`CourseFacts`],
//!   [`CourseRecord`], [`CourseDirectory`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CatalogConfig, ENV_BASE_URL, ENV_YEAR, LimitsConfig, LlmConfig, apply_env_overrides,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{CatalogError, Result};
pub use types::{
    CourseDirectory, CourseFacts, CourseRecord, CourseStub, NONE_SENTINEL, RowWarning,
    SubjectListing,
};
