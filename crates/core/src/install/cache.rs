//! User-scoped cache holding downloaded archives and installed tools.

use std::path::{Path, PathBuf};

use crate::tools::ToolSpec;
use crate::{Error, Result};

/// Cache of installed tools.
///
/// Default location: `~/.cache/toolsmith/`
///
/// Structure:
/// ```text
/// ~/.cache/toolsmith/
/// ├── downloads/
/// │   ├── kn-linux-amd64.tar.gz        # Verified archive awaiting extraction
/// │   └── kn-linux-amd64.tar.gz.part   # In-flight download
/// └── tools/
///     └── kn/
///         └── kn                       # Installed executable
/// ```
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
}

impl Default for ToolCache {
    fn default() -> Self {
        Self::new(default_cache_dir())
    }
}

impl ToolCache {
    /// Create a cache at the specified root directory.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a tool is installed into.
    #[must_use]
    pub fn tool_dir(&self, id: &str) -> PathBuf {
        self.root.join("tools").join(id)
    }

    /// Path of the installed executable for `spec`.
    #[must_use]
    pub fn binary_path(&self, spec: &ToolSpec) -> PathBuf {
        self.tool_dir(&spec.id).join(&spec.cmd_file_name)
    }

    /// Directory holding downloaded archives.
    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    /// Path of the verified archive for `spec`.
    #[must_use]
    pub fn archive_path(&self, spec: &ToolSpec) -> PathBuf {
        self.downloads_dir().join(&spec.dl_file_name)
    }

    /// Ensure cache directories exist.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.downloads_dir(), self.root.join("tools")] {
            std::fs::create_dir_all(&dir).map_err(|e| Error::io(e, &dir, "create directory"))?;
        }
        Ok(())
    }
}

/// Get the default cache root.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("toolsmith")
}

/// Path of the in-flight download next to `archive`.
#[must_use]
pub fn partial_path(archive: &Path) -> PathBuf {
    let mut name = archive.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    archive.with_file_name(name)
}
