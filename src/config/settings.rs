//! TOML-based configuration for the expression engine.
//!
//! Supports a config file (pi-engine.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [cache]
//! enabled = true
//! initial_capacity = 10000
//! max_capacity = 50000
//! time_to_idle_seconds = 36000
//!
//! [sql]
//! replace_nulls = true
//!
//! [metadata]
//! snapshot = "${PI_METADATA_DIR}/metadata.json"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::{DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY, DEFAULT_TIME_TO_IDLE_SECS};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Compiled SQL cache.
    pub cache: CacheSettings,

    /// SQL generation.
    pub sql: SqlSettings,

    /// Metadata source.
    pub metadata: MetadataSettings,
}

/// Compiled SQL cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache compiled SQL at all.
    pub enabled: bool,

    /// Entries allocated up front.
    pub initial_capacity: usize,

    /// Entries kept before least-recently-used eviction.
    pub max_capacity: u64,

    /// Seconds an entry may sit unused before it expires.
    pub time_to_idle_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
            time_to_idle_seconds: DEFAULT_TIME_TO_IDLE_SECS,
        }
    }
}

/// SQL generation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlSettings {
    /// Wrap data elements and attributes in `coalesce`.
    pub replace_nulls: bool,
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self {
            replace_nulls: true,
        }
    }
}

/// Metadata source settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataSettings {
    /// JSON metadata snapshot (supports ${ENV_VAR} expansion).
    pub snapshot: Option<String>,
}

impl MetadataSettings {
    /// The snapshot path with environment variables expanded.
    pub fn resolved_snapshot(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.snapshot
            .as_deref()
            .map(|path| expand_env_vars(path).map(PathBuf::from))
            .transpose()
    }
}

impl EngineSettings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and check settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: EngineSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `PI_ENGINE_CONFIG`
    /// 2. `./pi-engine.toml`
    /// 3. `~/.config/pi-engine/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("PI_ENGINE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("pi-engine.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pi-engine").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(EngineSettings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.cache.max_capacity == 0 && self.cache.enabled {
            return Err(SettingsError::InvalidConfig(
                "cache.max_capacity must be positive when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // A lone $ is kept as is
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
