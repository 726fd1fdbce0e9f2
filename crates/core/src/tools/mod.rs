//! Tool metadata and resolution.
//!
//! # Architecture
//!
//! - [`ToolRegistry`] - immutable manifest of tools for the running platform
//! - [`ToolSpec`] - one tool's metadata after platform overrides
//! - [`VersionRange`] - semantic-version constraint a binary must satisfy
//! - [`VersionProbe`] - detects a binary's version ([`CommandProbe`] runs it)
//! - [`Resolver`] - walks candidate paths and caches the first match
//!
//! # Example
//!
//! ```ignore
//! use toolsmith_core::tools::{CommandProbe, Platform, Resolver, ToolRegistry};
//!
//! let registry = ToolRegistry::load(&manifest, Platform::current())?;
//! let spec = registry.get("kn")?;
//! let resolver = Resolver::new(Arc::new(CommandProbe::default()));
//! let resolution = resolver.resolve(spec, &candidates).await;
//! ```

mod platform;
mod probe;
mod registry;
mod resolver;
mod version;

pub use platform::{Arch, Os, Platform};
pub use probe::{CommandProbe, ProbeFailure, VersionProbe};
pub use registry::{ToolRegistry, ToolSpec};
pub use resolver::{
    RejectedCandidate, Rejection, Resolution, ResolvedTool, Resolver, candidate_paths,
};
pub use version::{DEFAULT_VERSION_PATTERN, VersionRange, extract_version};
