use clap::{Parser, Subcommand};
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::output;
use crate::tracing::{LogLevel, TracingFormat};

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Download, install or runtime error exit code
pub const EXIT_OTHER: i32 = 3;
/// Exit code for a declined prompt or Ctrl-C (128 + SIGINT)
pub const EXIT_CANCELLED: i32 = 130;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI, manifest or tool lookup error (exit code 2)
    #[error("{message}")]
    #[diagnostic(code(toolsmith::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Download, install or runtime error (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(toolsmith::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The user declined or interrupted the operation (exit code 130, silent)
    #[error("Cancelled")]
    Cancelled,
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }
}

/// Convert `toolsmith_core::Error` to the matching `CliError` variant.
///
/// Manifest, settings and lookup failures are configuration errors the user
/// fixes by editing files or flags; everything else is a runtime failure.
impl From<toolsmith_core::Error> for CliError {
    fn from(err: toolsmith_core::Error) -> Self {
        use toolsmith_core::Error;

        let help = err.help().map(|h| h.to_string());
        match err {
            Error::UserCancelled => Self::Cancelled,
            // Extract just the message to avoid "Configuration error: ..." twice
            Error::Configuration { message, help } => Self::Config { message, help },
            Error::ToolNotFound { .. }
            | Error::UnknownTool { .. }
            | Error::UnsupportedPlatform { .. } => Self::Config {
                message: err.to_string(),
                help,
            },
            Error::ChecksumMismatch { .. }
            | Error::DownloadFailed { .. }
            | Error::UnsupportedArchiveFormat { .. }
            | Error::Extraction { .. }
            | Error::InvalidInstall { .. }
            | Error::Json(_) => Self::Other {
                message: err.to_string(),
                help,
            },
            Error::Io { ref source, .. } => Self::Other {
                message: format!("{err}: {source}"),
                help,
            },
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Other { .. } => EXIT_OTHER,
        CliError::Cancelled => EXIT_CANCELLED,
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool) {
    let code = match err {
        CliError::Config { .. } => "config",
        CliError::Other { .. } => "other",
        CliError::Cancelled => return,
    };

    if json_mode {
        output::json(&ErrorEnvelope::new(serde_json::json!({
            "code": code,
            "message": err.to_string()
        })));
    } else {
        output::report(&Report::new(err.clone()));
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Main CLI entry point for toolsmith.
///
/// Finds, downloads and runs the external command-line tools declared in a
/// JSON manifest, pinned to a version range.
#[derive(Parser, Debug)]
#[command(name = "toolsmith")]
#[command(about = "Find, install and run version-pinned command-line tools")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Tool manifest to read.
    #[arg(long, global = true, value_name = "PATH", help = "Tool manifest (JSON)")]
    pub manifest: Option<PathBuf>,

    /// Cache root for downloads and installed tools.
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Cache root for downloads and installed tools"
    )]
    pub cache_dir: Option<PathBuf>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    /// Emit JSON envelope regardless of format.
    #[arg(long, global = true, help = "Emit JSON envelope regardless of format")]
    pub json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List manifest tools and where they resolve.
    #[command(about = "List manifest tools, their required versions and status")]
    List,
    /// Print the path of a tool without installing it.
    #[command(about = "Print the path of a usable tool binary (never installs)")]
    Which {
        /// Tool id from the manifest.
        id: String,
    },
    /// Make sure tools are installed.
    #[command(about = "Install tools that are missing or out of range")]
    Install {
        /// Tool ids from the manifest.
        #[arg(required = true)]
        ids: Vec<String>,
        /// Answer yes to every prompt.
        #[arg(long, short = 'y', help = "Answer yes to every prompt")]
        yes: bool,
        /// Reinstall into the cache even if a usable binary exists.
        #[arg(long, help = "Reinstall into the cache even if a usable binary exists")]
        force: bool,
    },
    /// Run a tool, installing it first when needed.
    #[command(about = "Run a tool, installing it first when needed")]
    Run {
        /// Tool id from the manifest.
        id: String,
        /// Answer yes to every prompt.
        #[arg(long, short = 'y', help = "Answer yes to every prompt")]
        yes: bool,
        /// Arguments passed to the tool.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// Parse command-line arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
