//! toolsmith - command-line front-end for version-pinned tools
//!
//! Wraps [`toolsmith_core`] with argument parsing, terminal prompts, a
//! download progress bar and logging.
//!
//! ```text
//! toolsmith list
//! toolsmith which kn
//! toolsmith install kn odo --yes
//! toolsmith --json run kn -- service list -o json
//! ```

/// CLI argument parsing, errors and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
mod output;
pub mod progress;
pub mod prompt;
/// Tracing setup.
pub mod tracing;

use cli::{EXIT_OTHER, exit_code_for, render_error};
use tokio::runtime::Runtime;

/// Run a parsed command line and return the process exit code.
pub async fn run(cli: cli::Cli) -> i32 {
    if let Err(e) = crate::tracing::init_tracing(cli.log_format, cli.level) {
        output::status(format!("Warning: {e}"));
    }

    let json = cli.json;
    match commands::execute(cli.command, cli.manifest, cli.cache_dir, json).await {
        Ok(code) => code,
        Err(err) => {
            render_error(&err, json);
            exit_code_for(&err)
        }
    }
}

/// Build the tokio runtime and run `cli` on it.
#[must_use]
pub fn run_with_tokio(cli: cli::Cli) -> i32 {
    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => block_on_detached(rt, run(cli)),
        Err(e) => {
            output::status(format!("Fatal error: Failed to create tokio runtime: {e}"));
            EXIT_OTHER
        }
    }
}

/// Drive `future` to completion, then shut the runtime down without waiting
/// for blocking tasks.
///
/// A prompt interrupted by Ctrl-C leaves its stdin read running on the
/// blocking pool until the user presses Enter.
fn block_on_detached<F: Future>(rt: Runtime, future: F) -> F::Output {
    let output = rt.block_on(future);
    rt.shutdown_background();
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_interrupted_read_does_not_delay_exit() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let started = Instant::now();

        let answered = block_on_detached(rt, async {
            let cancel = CancellationToken::new();
            cancel.cancel();
            let read =
                tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(30)));
            tokio::select! {
                biased;
                () = cancel.cancelled() => false,
                _ = read => true,
            }
        });

        assert!(!answered);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
