//! Resolution and installation of version-pinned external CLI tools.
//!
//! This crate provides functionality to:
//! - Load a JSON tool manifest and resolve it for the running platform
//! - Find an existing binary whose reported version satisfies a range
//! - Download, verify and extract a pinned release into a per-user cache
//!
//! # Example
//!
//! ```ignore
//! use toolsmith_core::{Settings, ToolRegistry, Toolbox, Platform};
//! use toolsmith_core::install::{InstallContext, NoProgress};
//! use toolsmith_core::prompt::AssumeYes;
//!
//! let settings = Settings::discover()?;
//! let registry = ToolRegistry::load(&settings.manifest_path(), Platform::current())?;
//! let toolbox = Toolbox::new(registry, &settings)?;
//!
//! let cancel = tokio_util::sync::CancellationToken::new();
//! let ctx = InstallContext { prompter: &AssumeYes, progress: &NoProgress, cancel: &cancel };
//! let kn = toolbox.ensure("kn", &ctx).await?;
//! println!("{}", kn.path.display());
//! ```

pub mod config;
mod error;
pub mod install;
pub mod prompt;
mod toolbox;
pub mod tools;

pub use config::Settings;
pub use error::{Error, Result};
pub use toolbox::{ToolState, ToolStatus, Toolbox};
pub use tools::{Platform, ResolvedTool, ToolRegistry, ToolSpec};
