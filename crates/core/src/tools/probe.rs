//! Version detection by running a candidate binary.

use async_trait::async_trait;
use semver::Version;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace};

use super::registry::ToolSpec;
use super::version::extract_version;

/// Why a probe could not produce a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The binary could not be started.
    Spawn(String),
    /// The binary did not exit within the timeout.
    Timeout,
    /// Output did not contain a version matching the pattern.
    NoVersion,
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(message) => write!(f, "failed to run: {message}"),
            Self::Timeout => write!(f, "timed out"),
            Self::NoVersion => write!(f, "no version in output"),
        }
    }
}

/// Detects the version of a binary.
///
/// The resolver calls this for every existing candidate; tests substitute a
/// fake to control reported versions without spawning processes.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    /// Report the version of the binary at `path` for `spec`.
    async fn detect(&self, spec: &ToolSpec, path: &Path) -> Result<Version, ProbeFailure>;
}

/// Probe that runs the binary with the spec's version arguments.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    timeout: Duration,
}

impl Default for CommandProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl CommandProbe {
    /// Create a probe with the given timeout per invocation.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl VersionProbe for CommandProbe {
    async fn detect(&self, spec: &ToolSpec, path: &Path) -> Result<Version, ProbeFailure> {
        debug!(tool = %spec.id, ?path, args = ?spec.version_args, "Probing tool version");

        let mut cmd = Command::new(path);
        cmd.args(&spec.version_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ProbeFailure::Spawn(e.to_string())),
            Err(_) => return Err(ProbeFailure::Timeout),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        trace!(tool = %spec.id, status = ?output.status, %stdout, %stderr, "Probe output");

        extract_version(&stdout, &spec.version_pattern)
            .or_else(|| extract_version(&stderr, &spec.version_pattern))
            .ok_or(ProbeFailure::NoVersion)
    }
}
