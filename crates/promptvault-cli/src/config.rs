//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! where prompts are stored, which origin serves the front-end shell, and the
//! offline cache version.
//!
//! Configuration is stored at `~/.config/promptvault/config.json`. The
//! `PROMPTVAULT_DATA_DIR` and `PROMPTVAULT_ORIGIN` environment variables
//! override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use promptvault_core::offline::manifest::CACHE_VERSION;
use promptvault_core::offline::Manifest;
use serde::{Deserialize, Serialize};
use url::Url;

/// Application name used for config/data/cache directory paths
const APP_NAME: &str = "promptvault";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_DATA_DIR: &str = "PROMPTVAULT_DATA_DIR";
const ENV_ORIGIN: &str = "PROMPTVAULT_ORIGIN";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the prompt collection
    pub data_dir: Option<PathBuf>,
    /// Origin serving the front-end shell, e.g. `https://user.github.io`
    pub origin: Option<String>,
    /// Offline cache generation; bump when the shell assets change
    pub cache_version: Option<u32>,
    /// Replaces the built-in list of shell assets
    pub offline_paths: Option<Vec<String>>,
    /// Document served to offline navigations
    pub fallback_document: Option<String>,
    /// Also write logs to a daily file under the data directory
    pub log_to_file: bool,
}

impl Config {
    /// Load from the default location, or `explicit_path` if given.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        let config = if path.exists() {
            Self::read(&path)?
        } else if explicit_path.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Parse a config file as written, without environment overrides.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = var(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(origin) = var(ENV_ORIGIN).filter(|v| !v.is_empty()) {
            self.origin = Some(origin);
        }
        self
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("logs"))
    }

    /// Directory holding the offline caches. Lives next to the prompts when
    /// a data directory is configured.
    pub fn offline_cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.join("offline"));
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join("offline"))
    }

    /// The offline manifest, if an origin is configured.
    pub fn manifest(&self) -> Result<Option<Manifest>> {
        let Some(ref origin) = self.origin else {
            return Ok(None);
        };
        let origin = Url::parse(origin).with_context(|| format!("Invalid origin: {}", origin))?;

        let version = self.cache_version.unwrap_or(CACHE_VERSION);
        let mut manifest = Manifest::new(origin).with_version(version);
        if let Some(ref paths) = self.offline_paths {
            manifest = manifest.with_paths(paths.iter().cloned());
        }
        if let Some(ref fallback) = self.fallback_document {
            manifest = manifest.with_fallback_document(fallback.clone());
        }
        Ok(Some(manifest))
    }
}
