//! Context configuration
//!
//! A [`SceneContext`](crate::SceneContext) built with
//! [`with_config`](crate::SceneContext::with_config) reads its DSO search
//! path, proxy mode and update worker count from a [`ContextConfig`]. The
//! config lives in a TOML file; a missing file is created with defaults on
//! first load.
//!
//! # Example
//!
//! ```ignore
//! use rdl2_core::{config, ContextConfig, SceneContext};
//!
//! let config = ContextConfig::load(&config::default_config_path()?)?;
//! let context = SceneContext::with_config(&config)?;
//! ```

mod loader;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use loader::default_config_path;

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Neither RDL2_CONFIG nor the executable location gave a config path
    #[error("Config directory not available - could not resolve executable location")]
    NoConfigDirectory,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Scene context settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// Log filter used when RUST_LOG is unset
    pub log_level: String,

    /// Directories searched before the discovered DSO path, colon separated
    pub dso_path: Option<String>,

    /// Create proxy classes instead of loading plugin behavior
    pub proxy_mode: bool,

    /// Worker threads for `update()` fan-out; 0 uses the global rayon pool
    pub update_threads: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            log_level: "info".to_string(),
            dso_path: None,
            proxy_mode: false,
            update_threads: 0,
        }
    }
}

impl ContextConfig {
    /// Load config from `path`, creating a default file if missing
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            tracing::debug!("Loaded context config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default context config at {:?}", path);
            Ok(default)
        }
    }

    /// Save config to `path`, creating parent directories as needed
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved context config to {:?}", path);
        Ok(())
    }

    /// Replace self with the current contents of `path`
    pub fn reload(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        *self = Self::from_toml_str(&content)?;
        tracing::debug!("Reloaded context config from {:?}", path);
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Effective log filter: "debug" when `debug` is set, else `log_level`
    pub fn log_filter(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }
}
