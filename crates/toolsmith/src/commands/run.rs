//! `toolsmith run`

use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::Session;
use crate::cli::{CliError, EXIT_OTHER, OkEnvelope};
use crate::output;

/// Execute the `run` command.
///
/// Ensures the tool, runs it with `args` and returns its exit code. In JSON
/// mode stdout is captured, parsed, and emitted inside the envelope.
///
/// # Errors
///
/// Returns the install error, a spawn failure, or, in JSON mode, a parse
/// failure of the tool's output.
pub async fn execute(
    session: &Session,
    id: &str,
    args: &[String],
    assume_yes: bool,
) -> Result<i32, CliError> {
    let tool = session.ensure(id, assume_yes, false).await?;
    debug!(tool = %id, path = ?tool.path, ?args, "Running tool");

    let mut cmd = Command::new(&tool.path);
    cmd.args(args).stdin(Stdio::inherit()).stderr(Stdio::inherit());

    let spawn_error =
        |e: std::io::Error| CliError::other(format!("Failed to run {}: {e}", tool.path.display()));

    if !session.json {
        let status = cmd
            .stdout(Stdio::inherit())
            .status()
            .await
            .map_err(spawn_error)?;
        return Ok(status.code().unwrap_or(EXIT_OTHER));
    }

    let captured = cmd
        .stdout(Stdio::piped())
        .output()
        .await
        .map_err(spawn_error)?;
    let code = captured.status.code().unwrap_or(EXIT_OTHER);
    let parsed: serde_json::Value = serde_json::from_slice(&captured.stdout).map_err(|e| {
        CliError::other(format!("Output of {id} is not valid JSON: {e}"))
    })?;

    output::json(&OkEnvelope::new(parsed));
    Ok(code)
}
