//! Configuration for the expression engine.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CacheSettings, EngineSettings, MetadataSettings, SettingsError, SqlSettings,
};
