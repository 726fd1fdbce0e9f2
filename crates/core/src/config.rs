//! User settings.
//!
//! Settings come from `<config_dir>/toolsmith/config.toml`, then environment
//! variables, then command-line flags applied by the front-end.
//!
//! ```toml
//! cache_dir = "/opt/toolsmith"
//! search_path = false
//! max_download_attempts = 5
//!
//! [tools.kn]
//! path = "/usr/local/bin/kn"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::install::{DEFAULT_MAX_DOWNLOAD_ATTEMPTS, ToolCache, default_cache_dir};
use crate::{Error, Result};

/// Environment variable overriding the cache root.
pub const ENV_CACHE_DIR: &str = "TOOLSMITH_CACHE_DIR";
/// Environment variable overriding the manifest path.
pub const ENV_MANIFEST: &str = "TOOLSMITH_MANIFEST";
/// Environment variable toggling the `PATH` lookup (`true`/`false`).
pub const ENV_SEARCH_PATH: &str = "TOOLSMITH_SEARCH_PATH";

/// Per-tool settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSettings {
    /// Explicit executable path, checked before any other location.
    pub path: Option<PathBuf>,
}

/// Settings for resolution and installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Cache root; defaults to `<cache_dir>/toolsmith`.
    pub cache_dir: Option<PathBuf>,
    /// Tool manifest; defaults to `<config_dir>/toolsmith/tools.json`.
    pub manifest: Option<PathBuf>,
    /// Whether to look for tools on `PATH`.
    pub search_path: bool,
    /// Upper bound on download attempts per install.
    pub max_download_attempts: u32,
    /// Seconds to wait for a version probe.
    pub probe_timeout_secs: u64,
    /// Per-tool settings keyed by tool id.
    pub tools: BTreeMap<String, ToolSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            manifest: None,
            search_path: true,
            max_download_attempts: DEFAULT_MAX_DOWNLOAD_ATTEMPTS,
            probe_timeout_secs: 10,
            tools: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Location of the settings file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("toolsmith").join("config.toml"))
    }

    /// Parse settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid TOML or unknown keys.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| Error::configuration(format!("Invalid settings: {e}")))
    }

    /// Load settings from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file exists but cannot be read, or a
    /// configuration error if it is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(?path, "Loaded settings");
                Self::from_toml(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::io(e, path, "read")),
        }
    }

    /// Load the settings file (if any) and apply environment overrides.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`] and [`Settings::apply_env`].
    pub fn discover() -> Result<Self> {
        let settings = match Self::default_path() {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        settings.apply_env()
    }

    /// Apply `TOOLSMITH_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `TOOLSMITH_SEARCH_PATH` is not a
    /// boolean.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Some(dir) = std::env::var_os(ENV_CACHE_DIR).filter(|v| !v.is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(manifest) = std::env::var_os(ENV_MANIFEST).filter(|v| !v.is_empty()) {
            self.manifest = Some(PathBuf::from(manifest));
        }
        if let Ok(value) = std::env::var(ENV_SEARCH_PATH) {
            self.search_path = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(Error::configuration_with_help(
                        format!("Invalid {ENV_SEARCH_PATH} value '{value}'"),
                        "Use true or false",
                    ));
                }
            };
        }
        Ok(self)
    }

    /// The tool cache described by these settings.
    #[must_use]
    pub fn cache(&self) -> ToolCache {
        ToolCache::new(self.cache_dir.clone().unwrap_or_else(default_cache_dir))
    }

    /// Manifest location, falling back to `<config_dir>/toolsmith/tools.json`.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from(".config"))
                .join("toolsmith")
                .join("tools.json")
        })
    }

    /// Explicitly configured executable for `id`.
    #[must_use]
    pub fn tool_path(&self, id: &str) -> Option<&Path> {
        self.tools.get(id)?.path.as_deref()
    }

    /// Timeout for one version probe.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }
}
