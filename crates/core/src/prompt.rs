//! User decisions requested during installation.
//!
//! The front-end owns the interaction; the library only asks yes/no
//! questions through [`Prompter`].

use async_trait::async_trait;
use std::path::Path;

use crate::tools::{RejectedCandidate, Rejection, ToolSpec};

/// Context for the "download and install?" question.
#[derive(Debug)]
pub struct InstallRequest<'a> {
    /// Tool to install.
    pub spec: &'a ToolSpec,
    /// Candidates that were checked and rejected.
    pub rejected: &'a [RejectedCandidate],
    /// Where the tool will be installed.
    pub destination: &'a Path,
}

impl InstallRequest<'_> {
    /// One-line explanation suitable for a prompt.
    #[must_use]
    pub fn message(&self) -> String {
        let spec = self.spec;
        let wrong_version = self.rejected.iter().find_map(|c| match &c.reason {
            Rejection::OutOfRange(version) => Some((c.path.as_path(), version)),
            _ => None,
        });

        match wrong_version {
            Some((path, version)) => format!(
                "Found {} {version} at {}, but {} is required. Download and install {}?",
                spec.description,
                path.display(),
                spec.version_range_label,
                spec.version
            ),
            None => format!(
                "Cannot find {} {}. Download and install {}?",
                spec.description, spec.version_range_label, spec.version
            ),
        }
    }
}

/// Context for the "download again?" question after a checksum mismatch.
#[derive(Debug)]
pub struct RetryRequest<'a> {
    /// Tool being installed.
    pub spec: &'a ToolSpec,
    /// Expected digest.
    pub expected: &'a str,
    /// Digest of the discarded download.
    pub actual: &'a str,
    /// Attempts made so far.
    pub attempt: u32,
}

impl RetryRequest<'_> {
    /// One-line explanation suitable for a prompt.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Checksum for downloaded {} v{} is not correct. Download again?",
            self.spec.description, self.spec.version
        )
    }
}

/// Answers the questions the install flow asks.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask whether to download and install a missing tool.
    async fn confirm_install(&self, request: &InstallRequest<'_>) -> bool;

    /// Ask whether to download again after a checksum mismatch.
    async fn confirm_retry(&self, request: &RetryRequest<'_>) -> bool;
}

/// Answers yes to everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

#[async_trait]
impl Prompter for AssumeYes {
    async fn confirm_install(&self, _request: &InstallRequest<'_>) -> bool {
        true
    }

    async fn confirm_retry(&self, _request: &RetryRequest<'_>) -> bool {
        true
    }
}

/// Answers no to everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeNo;

#[async_trait]
impl Prompter for AssumeNo {
    async fn confirm_install(&self, _request: &InstallRequest<'_>) -> bool {
        false
    }

    async fn confirm_retry(&self, _request: &RetryRequest<'_>) -> bool {
        false
    }
}
