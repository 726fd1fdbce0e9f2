//! `toolsmith list`

use serde::Serialize;
use std::path::PathBuf;
use toolsmith_core::{ToolState, ToolStatus};

use super::Session;
use crate::cli::{CliError, EXIT_OK, OkEnvelope};
use crate::output;

/// One row of `toolsmith list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolReport {
    /// Tool id.
    pub id: String,
    /// Description from the manifest.
    pub description: String,
    /// Required version range label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Version the installer downloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// `resolved`, `missing` or `unavailable`.
    pub state: &'static str,
    /// Resolved executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Version reported by the resolved executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected: Option<String>,
    /// Why each candidate was rejected.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<String>,
}

impl From<ToolStatus> for ToolReport {
    fn from(status: ToolStatus) -> Self {
        let mut report = Self {
            id: status.id,
            description: status.description,
            range: status.range,
            version: status.version,
            state: "unavailable",
            path: None,
            detected: None,
            rejected: Vec::new(),
        };
        match status.state {
            ToolState::Resolved(tool) => {
                report.state = "resolved";
                report.path = Some(tool.path);
                report.detected = Some(tool.version.to_string());
            }
            ToolState::Missing(rejected) => {
                report.state = "missing";
                report.rejected = rejected
                    .iter()
                    .map(|c| format!("{}: {}", c.path.display(), c.reason))
                    .collect();
            }
            ToolState::Unavailable => {}
        }
        report
    }
}

impl ToolReport {
    fn render(&self) -> String {
        let range = self.range.as_deref().unwrap_or("-");
        let head = format!("{:<12} {:<10} {}", self.id, range, self.description);
        match self.state {
            "resolved" => format!(
                "{head}\n    {} ({})",
                self.path.as_ref().map_or_else(String::new, |p| p.display().to_string()),
                self.detected.as_deref().unwrap_or("?")
            ),
            "missing" => {
                let mut text = format!(
                    "{head}\n    not installed (installs {})",
                    self.version.as_deref().unwrap_or("?")
                );
                for reason in &self.rejected {
                    text.push_str("\n      ");
                    text.push_str(reason);
                }
                text
            }
            _ => format!("{head}\n    not available for this platform"),
        }
    }
}

/// Execute the `list` command.
///
/// # Errors
///
/// Never fails once the session is open; the signature matches the other
/// commands.
pub async fn execute(session: &Session) -> Result<i32, CliError> {
    let reports: Vec<ToolReport> = session
        .toolbox
        .status()
        .await
        .into_iter()
        .map(ToolReport::from)
        .collect();

    if session.json {
        output::json(&OkEnvelope::new(&reports));
    } else if reports.is_empty() {
        output::line("No tools declared in the manifest.");
    } else {
        for report in &reports {
            output::line(report.render());
        }
    }
    Ok(EXIT_OK)
}
