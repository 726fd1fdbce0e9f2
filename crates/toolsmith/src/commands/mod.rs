//! Command implementations.

pub mod install;
pub mod list;
pub mod run;
pub mod which;

use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use toolsmith_core::install::{InstallContext, NoProgress, ProgressSink};
use toolsmith_core::{Platform, Settings, ToolRegistry, Toolbox};
use tracing::debug;

use crate::cli::{CliError, Commands};
use crate::progress::BarProgress;
use crate::prompt::TerminalPrompter;

/// Everything a command needs: the toolbox, output mode and cancellation.
#[derive(Debug)]
pub struct Session {
    /// Tool resolution and installation.
    pub toolbox: Toolbox,
    /// Emit JSON envelopes instead of text.
    pub json: bool,
    /// Cancelled on Ctrl-C.
    pub cancel: CancellationToken,
}

impl Session {
    /// Load settings and the manifest, applying command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the settings or manifest are
    /// missing or invalid.
    pub fn open(
        manifest: Option<PathBuf>,
        cache_dir: Option<PathBuf>,
        json: bool,
    ) -> Result<Self, CliError> {
        let mut settings = Settings::discover()?;
        if manifest.is_some() {
            settings.manifest = manifest;
        }
        if cache_dir.is_some() {
            settings.cache_dir = cache_dir;
        }

        let manifest_path = settings.manifest_path();
        if !manifest_path.is_file() {
            return Err(CliError::config_with_help(
                format!("Tool manifest not found at {}", manifest_path.display()),
                "Pass --manifest <path> or set TOOLSMITH_MANIFEST",
            ));
        }
        let registry = ToolRegistry::load(&manifest_path, Platform::current())?;
        debug!(manifest = ?manifest_path, tools = registry.len(), "Loaded manifest");

        Ok(Self {
            toolbox: Toolbox::new(registry, &settings)?,
            json,
            cancel: CancellationToken::new(),
        })
    }

    /// Cancel the session token on Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupted");
                cancel.cancel();
            }
        });
    }

    /// Prompter and progress sink for installing `id`.
    #[must_use]
    pub fn frontend(&self, id: &str, assume_yes: bool) -> Frontend {
        let progress: Box<dyn ProgressSink> = if self.json {
            Box::new(NoProgress)
        } else {
            Box::new(BarProgress::new(id))
        };
        Frontend {
            prompter: TerminalPrompter::new(assume_yes, self.cancel.clone()),
            progress,
        }
    }

    /// Ensure `id`, or reinstall it when `force` is set.
    ///
    /// # Errors
    ///
    /// Returns the mapped toolbox error.
    pub async fn ensure(
        &self,
        id: &str,
        assume_yes: bool,
        force: bool,
    ) -> Result<toolsmith_core::ResolvedTool, CliError> {
        let frontend = self.frontend(id, assume_yes);
        let ctx = frontend.context(&self.cancel);
        let tool = if force {
            self.toolbox.reinstall(id, &ctx).await?
        } else {
            self.toolbox.ensure(id, &ctx).await?
        };
        Ok(tool)
    }
}

/// Terminal hooks handed to the install flow.
pub struct Frontend {
    prompter: TerminalPrompter,
    progress: Box<dyn ProgressSink>,
}

impl std::fmt::Debug for Frontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontend")
            .field("prompter", &self.prompter)
            .finish_non_exhaustive()
    }
}

impl Frontend {
    /// Borrow as an install context.
    #[must_use]
    pub fn context<'a>(&'a self, cancel: &'a CancellationToken) -> InstallContext<'a> {
        InstallContext {
            prompter: &self.prompter,
            progress: self.progress.as_ref(),
            cancel,
        }
    }
}

/// Execute a parsed command and return the process exit code.
///
/// # Errors
///
/// Returns the command's error for rendering by the caller.
pub async fn execute(
    command: Commands,
    manifest: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    json: bool,
) -> Result<i32, CliError> {
    let session = Session::open(manifest, cache_dir, json)?;
    session.cancel_on_ctrl_c();

    match command {
        Commands::List => list::execute(&session).await,
        Commands::Which { id } => which::execute(&session, &id).await,
        Commands::Install { ids, yes, force } => {
            install::execute(&session, &ids, yes, force).await
        }
        Commands::Run { id, yes, args } => run::execute(&session, &id, &args, yes).await,
    }
}
