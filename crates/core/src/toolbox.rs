//! The facade tying registry, resolver and installer together.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument};

use crate::config::Settings;
use crate::install::{Downloader, InstallContext, Installer, ToolCache};
use crate::prompt::InstallRequest;
use crate::tools::{
    CommandProbe, RejectedCandidate, Resolution, ResolvedTool, Resolver, ToolRegistry, ToolSpec,
    VersionProbe, candidate_paths,
};
use crate::{Error, Result};

/// Resolution state of one manifest entry.
#[derive(Debug, Clone)]
pub enum ToolState {
    /// A satisfying binary was found.
    Resolved(ResolvedTool),
    /// No candidate satisfied the range.
    Missing(Vec<RejectedCandidate>),
    /// The manifest has no download for this platform.
    Unavailable,
}

/// Status of one manifest entry, as reported by [`Toolbox::status`].
#[derive(Debug, Clone)]
pub struct ToolStatus {
    /// Tool id.
    pub id: String,
    /// Human-readable description (the id for unavailable tools).
    pub description: String,
    /// Required version range label.
    pub range: Option<String>,
    /// Version installed by a download.
    pub version: Option<String>,
    /// Resolution state.
    pub state: ToolState,
}

/// Makes sure required tools are available.
///
/// Holds the immutable registry and the process-wide resolution cache.
/// Installs of the same tool id are serialized.
pub struct Toolbox {
    registry: ToolRegistry,
    resolver: Resolver,
    installer: Installer,
    settings: Settings,
    install_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox")
            .field("platform", &self.registry.platform())
            .field("tools", &self.registry.len())
            .field("cache", &self.installer.cache().root())
            .finish_non_exhaustive()
    }
}

impl Toolbox {
    /// Create a toolbox from a registry and settings, using the command probe
    /// and the default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be created.
    pub fn new(registry: ToolRegistry, settings: &Settings) -> Result<Self> {
        let probe = Arc::new(CommandProbe::new(settings.probe_timeout()));
        Ok(Self::with_parts(
            registry,
            settings,
            probe,
            Downloader::new()?,
        ))
    }

    /// Create a toolbox with an explicit probe and downloader.
    #[must_use]
    pub fn with_parts(
        registry: ToolRegistry,
        settings: &Settings,
        probe: Arc<dyn VersionProbe>,
        downloader: Downloader,
    ) -> Self {
        Self {
            registry,
            resolver: Resolver::new(probe),
            installer: Installer::new(downloader, settings.cache())
                .with_max_attempts(settings.max_download_attempts),
            settings: settings.clone(),
            install_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The tool cache.
    #[must_use]
    pub fn cache(&self) -> &ToolCache {
        self.installer.cache()
    }

    /// Ordered candidate locations for `spec`.
    #[must_use]
    pub fn candidates(&self, spec: &ToolSpec) -> Vec<PathBuf> {
        candidate_paths(
            spec,
            self.settings.tool_path(&spec.id),
            &self.cache().binary_path(spec),
            self.settings.search_path,
        )
    }

    /// Find a usable binary without installing anything.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTool`/`UnsupportedPlatform` for ids the registry cannot
    /// serve, and `ToolNotFound` when no candidate satisfies the range.
    #[instrument(skip(self))]
    pub async fn locate(&self, id: &str) -> Result<ResolvedTool> {
        let spec = self.registry.get(id)?;
        match self.resolver.resolve(spec, &self.candidates(spec)).await {
            Resolution::Found(tool) => Ok(tool),
            Resolution::NotFound(_) => {
                Err(Error::tool_not_found(&spec.id, &spec.version_range_label))
            }
        }
    }

    /// Find a usable binary, installing it when none exists and the user
    /// agrees.
    ///
    /// # Errors
    ///
    /// Returns `UserCancelled` when the install is declined or the download is
    /// cancelled, `InvalidInstall` when the installed binary does not satisfy
    /// the range, and any error from [`Installer::install`].
    #[instrument(skip(self, ctx))]
    pub async fn ensure(&self, id: &str, ctx: &InstallContext<'_>) -> Result<ResolvedTool> {
        let spec = self.registry.get(id)?;
        if let Some(tool) = self.resolver.cached(id).await {
            return Ok(tool);
        }

        let lock = self.install_lock(id);
        let _guard = lock.lock().await;

        let rejected = match self.resolver.resolve(spec, &self.candidates(spec)).await {
            Resolution::Found(tool) => return Ok(tool),
            Resolution::NotFound(rejected) => rejected,
        };

        let destination = self.cache().tool_dir(id);
        let request = InstallRequest {
            spec,
            rejected: &rejected,
            destination: &destination,
        };
        if !ctx.prompter.confirm_install(&request).await {
            debug!(tool = %id, "Install declined");
            return Err(Error::UserCancelled);
        }

        self.install_spec(spec, ctx).await
    }

    /// Install into the cache even if a usable binary exists elsewhere.
    ///
    /// # Errors
    ///
    /// See [`Toolbox::ensure`].
    #[instrument(skip(self, ctx))]
    pub async fn reinstall(&self, id: &str, ctx: &InstallContext<'_>) -> Result<ResolvedTool> {
        let spec = self.registry.get(id)?;
        let lock = self.install_lock(id);
        let _guard = lock.lock().await;

        self.resolver.forget(id).await;
        self.install_spec(spec, ctx).await
    }

    /// Drop the cached resolution for `id`.
    pub async fn forget(&self, id: &str) -> Option<ResolvedTool> {
        self.resolver.forget(id).await
    }

    /// Report the state of every manifest entry without installing.
    pub async fn status(&self) -> Vec<ToolStatus> {
        let mut statuses = Vec::new();

        for spec in self.registry.iter() {
            let state = match self.resolver.resolve(spec, &self.candidates(spec)).await {
                Resolution::Found(tool) => ToolState::Resolved(tool),
                Resolution::NotFound(rejected) => ToolState::Missing(rejected),
            };
            statuses.push(ToolStatus {
                id: spec.id.clone(),
                description: spec.description.clone(),
                range: Some(spec.version_range_label.clone()),
                version: Some(spec.version.clone()),
                state,
            });
        }

        for id in self.registry.unavailable() {
            statuses.push(ToolStatus {
                id: id.to_string(),
                description: id.to_string(),
                range: None,
                version: None,
                state: ToolState::Unavailable,
            });
        }

        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    async fn install_spec(&self, spec: &ToolSpec, ctx: &InstallContext<'_>) -> Result<ResolvedTool> {
        let path = self.installer.install(spec, ctx).await?;

        let version = self.resolver.check(spec, &path).await.map_err(|reason| {
            debug!(tool = %spec.id, ?path, %reason, "Installed binary rejected");
            Error::InvalidInstall {
                id: spec.id.clone(),
                path: path.clone(),
                range: spec.version_range_label.clone(),
            }
        })?;

        let tool = ResolvedTool {
            id: spec.id.clone(),
            path,
            version,
        };
        self.resolver.record(tool.clone()).await;
        info!(tool = %spec.id, "Tool ready");
        Ok(tool)
    }

    fn install_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .install_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.to_string()).or_default())
    }
}
