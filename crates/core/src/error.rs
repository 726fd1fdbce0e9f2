//! Error types for tool resolution and installation.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for toolsmith operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or installing a tool.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// No candidate location holds a binary that satisfies the version range.
    #[error("{id} {range} was not found")]
    #[diagnostic(
        code(toolsmith::tool_not_found),
        help("Run 'toolsmith install {id}' to download it into the tool cache")
    )]
    ToolNotFound {
        /// Tool id.
        id: String,
        /// Human-readable version range label.
        range: String,
    },

    /// The downloaded archive does not have the expected SHA-256 digest.
    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    #[diagnostic(
        code(toolsmith::checksum_mismatch),
        help("The download may be corrupted or the manifest checksum is stale")
    )]
    ChecksumMismatch {
        /// Downloaded file name.
        file: String,
        /// Expected digest (hex).
        expected: String,
        /// Computed digest (hex).
        actual: String,
    },

    /// Network-level download failure.
    #[error("Failed to download {url}: {message}")]
    #[diagnostic(code(toolsmith::download_failed))]
    DownloadFailed {
        /// Requested URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The archive type cannot be inferred from the file name.
    #[error("Unsupported archive format: {file}")]
    #[diagnostic(
        code(toolsmith::unsupported_archive),
        help("Supported formats are .zip, .tar.gz, .tgz and .gz")
    )]
    UnsupportedArchiveFormat {
        /// Archive file name.
        file: String,
    },

    /// The user declined a prompt or cancelled a download.
    #[error("Operation cancelled")]
    #[diagnostic(code(toolsmith::cancelled))]
    UserCancelled,

    /// The tool id is not in the manifest.
    #[error("Unknown tool '{id}'")]
    #[diagnostic(
        code(toolsmith::unknown_tool),
        help("Run 'toolsmith list' to see the tools declared in the manifest")
    )]
    UnknownTool {
        /// Requested tool id.
        id: String,
    },

    /// The manifest has no download for the running platform.
    #[error("{id} is not available for {platform}")]
    #[diagnostic(code(toolsmith::unsupported_platform))]
    UnsupportedPlatform {
        /// Tool id.
        id: String,
        /// Running platform.
        platform: String,
    },

    /// Invalid manifest or settings.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(toolsmith::config))]
    Configuration {
        /// Error message.
        message: String,
        /// Optional help text.
        #[help]
        help: Option<String>,
    },

    /// Archive extraction failed.
    #[error("Failed to extract {archive}: {message}")]
    #[diagnostic(code(toolsmith::extraction))]
    Extraction {
        /// Archive file name.
        archive: String,
        /// Error message.
        message: String,
    },

    /// The freshly installed binary does not report a usable version.
    #[error("Installed {id} at {} does not satisfy {range}", path.display())]
    #[diagnostic(
        code(toolsmith::invalid_install),
        help("Check the version pinned in the manifest against its versionRange")
    )]
    InvalidInstall {
        /// Tool id.
        id: String,
        /// Installed binary path.
        path: PathBuf,
        /// Human-readable version range label.
        range: String,
    },

    /// I/O failure with the operation and path that caused it.
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(" on {}", p.display())))]
    #[diagnostic(
        code(toolsmith::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// Underlying error.
        #[source]
        source: std::io::Error,
        /// Path involved, if any.
        path: Option<Box<Path>>,
        /// Operation that failed.
        operation: String,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    #[diagnostic(code(toolsmith::json))]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a tool-not-found error.
    #[must_use]
    pub fn tool_not_found(id: impl Into<String>, range: impl Into<String>) -> Self {
        Self::ToolNotFound {
            id: id.into(),
            range: range.into(),
        }
    }

    /// Create a checksum mismatch error.
    #[must_use]
    pub fn checksum_mismatch(
        file: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ChecksumMismatch {
            file: file.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a download failure.
    #[must_use]
    pub fn download_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text.
    #[must_use]
    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an extraction error.
    #[must_use]
    pub fn extraction(archive: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the operation and path.
    #[must_use]
    pub fn io(source: std::io::Error, path: impl AsRef<Path>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// True for errors the caller should treat as a silent no-op.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "operation".to_string(),
        }
    }
}
