//! Application configuration for snipbook.
//!
//! User config lives at `~/.snipbook/snipbook.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnipbookError};
use crate::types::DedupPolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "snipbook.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".snipbook";

/// Separator token used when none is configured.
pub const DEFAULT_SEPARATOR: &str = "--8<--";

// ---------------------------------------------------------------------------
// Config structs (matching snipbook.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Serialized document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

impl OutputFormat {
    /// File extension used by `build-all`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Literal token between packed entries in one file.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Output document format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Malformed entries tolerated before the run fails.
    #[serde(default)]
    pub max_malformed: usize,

    /// Duplicate-id resolution.
    #[serde(default)]
    pub dedup: DedupPolicy,

    /// Drop snippets scoring below this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<i64>,

    /// Chapters indexed in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            format: OutputFormat::default(),
            max_malformed: 0,
            dedup: DedupPolicy::default(),
            min_score: None,
            concurrency: default_concurrency(),
        }
    }
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.into()
}
fn default_concurrency() -> u32 {
    4
}

// ---------------------------------------------------------------------------
// Build config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime build configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub separator: String,
    pub format: OutputFormat,
    pub max_malformed: usize,
    pub dedup: DedupPolicy,
    pub min_score: Option<i64>,
    pub concurrency: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for BuildConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            separator: config.defaults.separator.clone(),
            format: config.defaults.format,
            max_malformed: config.defaults.max_malformed,
            dedup: config.defaults.dedup,
            min_score: config.defaults.min_score,
            concurrency: config.defaults.concurrency,
        }
    }
}

impl BuildConfig {
    /// Reject settings that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.separator.trim().is_empty() {
            return Err(SnipbookError::config("separator must not be blank"));
        }
        if self.concurrency == 0 {
            return Err(SnipbookError::config("concurrency must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.snipbook/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SnipbookError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.snipbook/snipbook.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SnipbookError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SnipbookError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SnipbookError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SnipbookError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SnipbookError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
