//! `toolsmith install`

use serde::Serialize;
use toolsmith_core::ResolvedTool;
use tracing::info;

use super::Session;
use crate::cli::{CliError, EXIT_OK, OkEnvelope};
use crate::output;

/// Execute the `install` command.
///
/// Tools are handled in order; the first failure stops the command.
///
/// # Errors
///
/// Returns the first tool's error, or `Cancelled` when a prompt was declined.
pub async fn execute(
    session: &Session,
    ids: &[String],
    assume_yes: bool,
    force: bool,
) -> Result<i32, CliError> {
    #[derive(Serialize)]
    struct Installed<'a> {
        tools: &'a [ResolvedTool],
    }

    let mut tools = Vec::with_capacity(ids.len());
    for id in ids {
        let tool = session.ensure(id, assume_yes, force).await?;
        info!(tool = %id, path = ?tool.path, "Tool available");
        if !session.json {
            output::line(format!("{} {} {}", tool.id, tool.version, tool.path.display()));
        }
        tools.push(tool);
    }

    if session.json {
        output::json(&OkEnvelope::new(Installed { tools: &tools }));
    }
    Ok(EXIT_OK)
}
