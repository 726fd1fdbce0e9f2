//! Download, verification and extraction of tools into the cache.
//!
//! The install flow for one tool:
//!
//! 1. Infer the archive format from `dlFileName` (unsupported formats abort
//!    before any request is made).
//! 2. Reuse an already downloaded archive if its checksum matches, otherwise
//!    download it. A checksum mismatch deletes the file and asks the
//!    [`Prompter`](crate::prompt::Prompter) whether to download again.
//! 3. Extract into `<cache>/tools/<id>`, set the executable bit, and remove
//!    the archive.

mod archive;
mod cache;
mod checksum;
mod download;

pub use archive::{ArchiveFormat, extract, make_executable};
pub use cache::{ToolCache, default_cache_dir, partial_path};
pub use checksum::{file_sha256, verify_file};
pub use download::{DownloadProgress, Downloader, NoProgress, ProgressSink};

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::prompt::{Prompter, RetryRequest};
use crate::tools::ToolSpec;
use crate::{Error, Result};

/// Default bound on download attempts for one install.
pub const DEFAULT_MAX_DOWNLOAD_ATTEMPTS: u32 = 3;

/// Front-end hooks for one install.
#[derive(Clone, Copy)]
pub struct InstallContext<'a> {
    /// Answers install and retry questions.
    pub prompter: &'a dyn Prompter,
    /// Receives download progress.
    pub progress: &'a dyn ProgressSink,
    /// Cancels the download.
    pub cancel: &'a CancellationToken,
}

impl std::fmt::Debug for InstallContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Installs tools into a [`ToolCache`].
#[derive(Debug, Clone)]
pub struct Installer {
    downloader: Downloader,
    cache: ToolCache,
    max_attempts: u32,
}

impl Installer {
    /// Create an installer writing into `cache`.
    #[must_use]
    pub fn new(downloader: Downloader, cache: ToolCache) -> Self {
        Self {
            downloader,
            cache,
            max_attempts: DEFAULT_MAX_DOWNLOAD_ATTEMPTS,
        }
    }

    /// Set the bound on download attempts (at least one).
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// The cache this installer writes into.
    #[must_use]
    pub fn cache(&self) -> &ToolCache {
        &self.cache
    }

    /// Install `spec` and return the path of its executable.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArchiveFormat`, `ChecksumMismatch` once retries are
    /// declined or exhausted, `UserCancelled`, `DownloadFailed`, or an
    /// extraction/I/O error.
    pub async fn install(&self, spec: &ToolSpec, ctx: &InstallContext<'_>) -> Result<PathBuf> {
        let format = ArchiveFormat::from_file_name(&spec.dl_file_name)?;
        self.cache.ensure_dirs()?;

        let archive = self.cache.archive_path(spec);
        self.fetch_verified(spec, &archive, ctx).await?;

        let dest = self.cache.tool_dir(&spec.id);
        info!(tool = %spec.id, ?archive, ?dest, "Extracting");
        {
            let archive = archive.clone();
            let dest = dest.clone();
            let prefix = spec.file_prefix.clone();
            let file_name = spec.cmd_file_name.clone();
            tokio::task::spawn_blocking(move || {
                extract(&archive, format, &dest, prefix.as_deref(), &file_name)
            })
            .await
            .map_err(|e| Error::extraction(&spec.dl_file_name, format!("task failed: {e}")))??;
        }

        let binary = self.cache.binary_path(spec);
        if !binary.is_file() {
            return Err(Error::extraction(
                &spec.dl_file_name,
                format!("'{}' not found in archive", spec.cmd_file_name),
            ));
        }
        make_executable(&binary)?;

        if let Err(e) = tokio::fs::remove_file(&archive).await {
            debug!(?archive, error = %e, "Could not remove archive");
        }

        info!(tool = %spec.id, version = %spec.version, ?binary, "Installed");
        Ok(binary)
    }

    /// Make sure a verified archive exists at `archive`.
    async fn fetch_verified(
        &self,
        spec: &ToolSpec,
        archive: &Path,
        ctx: &InstallContext<'_>,
    ) -> Result<()> {
        if archive.is_file() {
            match verify_file(archive, &spec.sha256).await {
                Ok(()) => {
                    debug!(tool = %spec.id, ?archive, "Reusing verified archive");
                    return Ok(());
                }
                Err(Error::ChecksumMismatch { .. }) => {
                    debug!(tool = %spec.id, ?archive, "Discarded stale archive");
                }
                Err(e) => return Err(e),
            }
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            info!(tool = %spec.id, url = %spec.download_url, attempt, "Downloading");
            self.downloader
                .download(&spec.download_url, archive, ctx.progress, ctx.cancel)
                .await?;

            let (file, expected, actual) = match verify_file(archive, &spec.sha256).await {
                Ok(()) => return Ok(()),
                Err(Error::ChecksumMismatch {
                    file,
                    expected,
                    actual,
                }) => (file, expected, actual),
                Err(e) => return Err(e),
            };
            warn!(tool = %spec.id, %expected, %actual, attempt, "Checksum mismatch");

            let request = RetryRequest {
                spec,
                expected: &expected,
                actual: &actual,
                attempt,
            };
            if attempt >= self.max_attempts || !ctx.prompter.confirm_retry(&request).await {
                return Err(Error::ChecksumMismatch {
                    file,
                    expected,
                    actual,
                });
            }
        }
    }
}
