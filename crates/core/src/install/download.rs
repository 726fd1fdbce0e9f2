//! Cancellable HTTP downloads with progress reporting.

use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::cache::partial_path;
use crate::{Error, Result};

/// Bytes received so far for one download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes written.
    pub downloaded: u64,
    /// Total size, when the server sent `Content-Length`.
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Completion percentage, when the total is known.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        let total = self.total.filter(|t| *t > 0)?;
        let pct = self.downloaded.min(total).saturating_mul(100) / total;
        u8::try_from(pct).ok()
    }
}

/// Receives download progress.
pub trait ProgressSink: Send + Sync {
    /// Called when the download starts and after every chunk.
    fn report(&self, progress: DownloadProgress);

    /// Called once the download ended, successfully or not.
    fn finish(&self) {}
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: DownloadProgress) {}
}

/// HTTP downloader.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Create a downloader with the default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TLS backend fails to initialise.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("toolsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Create a downloader around an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` to `dest`.
    ///
    /// Bytes are streamed into `<dest>.part`, which is renamed to `dest` only
    /// after the last chunk was written. On failure or cancellation the
    /// partial file is removed.
    ///
    /// # Errors
    ///
    /// Returns `UserCancelled` when `cancel` fires, `DownloadFailed` for
    /// network errors and non-success statuses, or an I/O error.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let partial = partial_path(dest);
        let result = self.stream_to(url, &partial, progress, cancel).await;
        progress.finish();

        match result {
            Ok(bytes) => {
                tokio::fs::rename(&partial, dest)
                    .await
                    .map_err(|e| Error::io(e, dest, "rename"))?;
                info!(%url, ?dest, bytes, "Downloaded");
                Ok(bytes)
            }
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&partial).await {
                    debug!(?partial, error = %remove, "No partial download to remove");
                }
                Err(e)
            }
        }
    }

    async fn stream_to(
        &self,
        url: &str,
        partial: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        debug!(%url, ?partial, "Starting download");

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::UserCancelled),
            response = self.client.get(url).send() => {
                response.map_err(|e| Error::download_failed(url, e.to_string()))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(Error::download_failed(url, format!("HTTP {status}")));
        }

        let total = response.content_length();
        let mut file = tokio::fs::File::create(partial)
            .await
            .map_err(|e| Error::io(e, partial, "create"))?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        progress.report(DownloadProgress { downloaded, total });

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::UserCancelled),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk.map_err(|e| Error::download_failed(url, e.to_string()))?;

            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(e, partial, "write"))?;
            downloaded += chunk.len() as u64;
            progress.report(DownloadProgress { downloaded, total });
        }

        file.flush()
            .await
            .map_err(|e| Error::io(e, partial, "flush"))?;
        Ok(downloaded)
    }
}
