//! `toolsmith which`

use super::Session;
use crate::cli::{CliError, EXIT_OK, OkEnvelope};
use crate::output;

/// Execute the `which` command.
///
/// Prints the resolved executable path; never installs.
///
/// # Errors
///
/// Returns a configuration error (exit code 2) when no usable binary exists.
pub async fn execute(session: &Session, id: &str) -> Result<i32, CliError> {
    let tool = session.toolbox.locate(id).await?;

    if session.json {
        output::json(&OkEnvelope::new(&tool));
    } else {
        output::line(tool.path.display());
    }
    Ok(EXIT_OK)
}
