//! Logging setup for the toolsmith CLI
//!
//! Logs go to stderr so that command output on stdout stays machine-readable.
//! `RUST_LOG` takes precedence over `--level`. Every session is tagged with a
//! correlation id.

use std::io;
use std::sync::OnceLock;
pub use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Multi-line human-readable format
    Pretty,
    /// Single-line format
    Compact,
    /// One JSON object per event
    Json,
    /// Targets, threads and source locations
    Dev,
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Everything, including candidate probes
    Trace,
    /// Resolution and download details
    Debug,
    /// Downloads and installs
    Info,
    /// Checksum mismatches and prompts that could not be shown (default)
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Filter directive covering the CLI and the core library.
    fn directive(self) -> String {
        let level = self.as_str();
        format!("toolsmith={level},toolsmith_core={level}")
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

static CORRELATION_ID: OnceLock<Uuid> = OnceLock::new();

/// Correlation id of this process, created on first use.
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_tracing(format: TracingFormat, level: LogLevel) -> miette::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.directive()))
        .map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let fmt = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    let installed = match format {
        TracingFormat::Pretty => registry.with(fmt.pretty().with_target(true)).try_init(),
        TracingFormat::Compact => registry.with(fmt.compact().with_target(false)).try_init(),
        TracingFormat::Json => registry
            .with(fmt.json().with_current_span(true).with_span_list(true))
            .try_init(),
        TracingFormat::Dev => registry
            .with(
                fmt.with_file(true)
                    .with_line_number(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init(),
    };
    installed.map_err(|e| miette::miette!("Failed to install tracing subscriber: {e}"))?;

    tracing::info!(
        correlation_id = %correlation_id(),
        version = env!("CARGO_PKG_VERSION"),
        ?format,
        "Logging initialized"
    );
    Ok(())
}
