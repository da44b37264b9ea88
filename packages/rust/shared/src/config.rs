//! Application configuration for CourseAtlas.
//!
//! User config lives at `~/.courseatlas/courseatlas.toml`.
//! Environment variables override config file values, which override
//! defaults; CLI flags override everything.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "courseatlas.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".courseatlas";

/// Env var overriding the catalog base URL.
pub const ENV_BASE_URL: &str = "COURSEATLAS_BASE_URL";

/// Env var overriding the target catalog year.
pub const ENV_YEAR: &str = "COURSEATLAS_YEAR";

// ---------------------------------------------------------------------------
// Config structs (matching courseatlas.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog source settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Concurrency caps.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// LLM extraction backend settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog root URL; the target year is appended to form the year page.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Target catalog year.
    #[serde(default = "default_year")]
    pub year: String,

    /// Output artifact path.
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            year: default_year(),
            output_path: default_output_path(),
        }
    }
}

fn default_base_url() -> String {
    "https://courses.illinois.edu/schedule/".into()
}
fn default_year() -> String {
    "2025".into()
}
fn default_output_path() -> String {
    "course-directory.txt".into()
}

/// `[limits]` section — the two independent concurrency gates.
///
/// The LLM cap should stay at or below the subject cap: the LLM backend is
/// the scarcer resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrently-active subject workers.
    #[serde(default = "default_subject_concurrency")]
    pub subject_concurrency: usize,

    /// Maximum concurrently in-flight LLM extraction calls, shared across
    /// all subjects.
    #[serde(default = "default_llm_concurrency")]
    pub llm_concurrency: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            subject_concurrency: default_subject_concurrency(),
            llm_concurrency: default_llm_concurrency(),
        }
    }
}

fn default_subject_concurrency() -> usize {
    8
}
fn default_llm_concurrency() -> usize {
    2
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.courseatlas/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CatalogError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.courseatlas/courseatlas.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk, then apply environment overrides.
/// Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load the application config from a specific file path (no env overrides).
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CatalogError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Apply `COURSEATLAS_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(base) = std::env::var(ENV_BASE_URL) {
        if !base.is_empty() {
            config.catalog.base_url = base;
        }
    }
    if let Ok(year) = std::env::var(ENV_YEAR) {
        if !year.is_empty() {
            config.catalog.year = year;
        }
    }
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CatalogError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CatalogError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CatalogError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the LLM API key from the env var named in the config.
pub fn resolve_api_key(config: &LlmConfig) -> Result<String> {
    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(CatalogError::config(format!(
            "LLM API key not found. Set the {var_name} environment variable."
        ))),
    }
}
