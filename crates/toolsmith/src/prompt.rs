//! Terminal implementation of the install prompts.

use async_trait::async_trait;
use std::io::IsTerminal;
use tokio_util::sync::CancellationToken;
use toolsmith_core::prompt::{InstallRequest, Prompter, RetryRequest};
use tracing::{debug, warn};

use crate::output;

/// Asks yes/no questions on the terminal.
///
/// With `assume_yes` every question is answered yes without reading input.
/// Without a terminal on stdin every question is answered no. Ctrl-C while
/// waiting for an answer counts as no.
#[derive(Debug, Clone)]
pub struct TerminalPrompter {
    assume_yes: bool,
    cancel: CancellationToken,
}

impl TerminalPrompter {
    /// Create a prompter.
    #[must_use]
    pub fn new(assume_yes: bool, cancel: CancellationToken) -> Self {
        Self { assume_yes, cancel }
    }

    async fn confirm(&self, question: String) -> bool {
        if self.assume_yes {
            debug!(%question, "Assuming yes");
            return true;
        }
        if !std::io::stdin().is_terminal() {
            warn!(%question, "No terminal to answer the prompt; pass --yes to accept");
            return false;
        }

        let read = tokio::task::spawn_blocking(move || {
            output::ask(&question);
            let mut answer = String::new();
            std::io::stdin().read_line(&mut answer).map(|_| answer)
        });

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            answer = read => match answer {
                Ok(Ok(answer)) => is_yes(&answer),
                Ok(Err(e)) => {
                    warn!(error = %e, "Failed to read answer");
                    false
                }
                Err(e) => {
                    warn!(error = %e, "Prompt task failed");
                    false
                }
            },
        }
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn confirm_install(&self, request: &InstallRequest<'_>) -> bool {
        self.confirm(request.message()).await
    }

    async fn confirm_retry(&self, request: &RetryRequest<'_>) -> bool {
        self.confirm(request.message()).await
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES \r\n"));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }

    #[tokio::test]
    async fn test_assume_yes_skips_input() {
        let prompter = TerminalPrompter::new(true, CancellationToken::new());
        assert!(prompter.confirm("Install?".to_string()).await);
    }
}
