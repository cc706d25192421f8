//! Application configuration for chatmark.
//!
//! User config lives at `~/.chatmark/chatmark.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChatmarkError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "chatmark.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".chatmark";

// ---------------------------------------------------------------------------
// Config structs (matching chatmark.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input handling limits.
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Result cache sizing and expiry.
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTML rendering switches.
    #[serde(default)]
    pub render: RenderConfig,
}

/// `[processing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Inputs longer than this many characters are truncated before processing.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
        }
    }
}

fn default_max_input_chars() -> usize {
    100_000
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached results.
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,

    /// Seconds a cached result lives after it was written.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    500
}
fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Render single newlines as `<br />` (matches the streaming client renderer).
    #[serde(default = "default_true")]
    pub hard_breaks: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            hard_breaks: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Processor config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime processor configuration, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Truncation limit in characters.
    pub max_input_chars: usize,
    /// Maximum number of cached results.
    pub cache_capacity: u64,
    /// Expire-after-write duration for cached results.
    pub cache_ttl: Duration,
    /// Render soft breaks as `<br />`.
    pub hard_breaks: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ProcessorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_input_chars: config.processing.max_input_chars,
            cache_capacity: config.cache.capacity,
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            hard_breaks: config.render.hard_breaks,
        }
    }
}

impl ProcessorConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_input_chars == 0 {
            return Err(ChatmarkError::config("max_input_chars must be positive"));
        }
        if self.cache_capacity == 0 {
            return Err(ChatmarkError::config("cache capacity must be positive"));
        }
        if self.cache_ttl.is_zero() {
            return Err(ChatmarkError::config("cache ttl_secs must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.chatmark/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ChatmarkError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.chatmark/chatmark.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| ChatmarkError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ChatmarkError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ChatmarkError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ChatmarkError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ChatmarkError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
