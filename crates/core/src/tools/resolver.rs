//! Resolution of a tool id to a version-compatible binary on disk.

use semver::Version;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::probe::{ProbeFailure, VersionProbe};
use super::registry::ToolSpec;

/// A binary whose detected version satisfies its tool's range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTool {
    /// Tool id.
    pub id: String,
    /// Path to the executable.
    pub path: PathBuf,
    /// Version reported by the executable.
    pub version: Version,
}

/// Why a candidate was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing exists at the path.
    Missing,
    /// The version could not be detected.
    Probe(ProbeFailure),
    /// The detected version is outside the range.
    OutOfRange(Version),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "not present"),
            Self::Probe(failure) => write!(f, "{failure}"),
            Self::OutOfRange(version) => write!(f, "version {version} is outside the range"),
        }
    }
}

/// A candidate path and the reason it was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    /// Candidate path.
    pub path: PathBuf,
    /// Reason.
    pub reason: Rejection,
}

/// Outcome of checking a candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The first satisfying candidate.
    Found(ResolvedTool),
    /// No candidate satisfied the range.
    NotFound(Vec<RejectedCandidate>),
}

impl Resolution {
    /// The resolved tool, if any.
    #[must_use]
    pub fn found(self) -> Option<ResolvedTool> {
        match self {
            Self::Found(tool) => Some(tool),
            Self::NotFound(_) => None,
        }
    }
}

/// Checks candidate locations in order and remembers what it found.
///
/// Successful resolutions are cached per tool id for the lifetime of the
/// resolver; a cached id is answered without touching the filesystem or
/// re-running the binary.
pub struct Resolver {
    probe: Arc<dyn VersionProbe>,
    resolved: RwLock<HashMap<String, ResolvedTool>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver using `probe` for version detection.
    #[must_use]
    pub fn new(probe: Arc<dyn VersionProbe>) -> Self {
        Self {
            probe,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached resolution for `id`.
    pub async fn cached(&self, id: &str) -> Option<ResolvedTool> {
        self.resolved.read().await.get(id).cloned()
    }

    /// Record a resolution, replacing any previous one for the same id.
    pub async fn record(&self, tool: ResolvedTool) {
        info!(tool = %tool.id, path = ?tool.path, version = %tool.version, "Resolved tool");
        self.resolved.write().await.insert(tool.id.clone(), tool);
    }

    /// Drop the cached resolution for `id`.
    pub async fn forget(&self, id: &str) -> Option<ResolvedTool> {
        self.resolved.write().await.remove(id)
    }

    /// Resolve `spec` against `candidates`, consulting the cache first.
    ///
    /// A found tool is recorded in the cache.
    pub async fn resolve(&self, spec: &ToolSpec, candidates: &[PathBuf]) -> Resolution {
        if let Some(tool) = self.cached(&spec.id).await {
            debug!(tool = %spec.id, path = ?tool.path, "Using cached resolution");
            return Resolution::Found(tool);
        }

        let resolution = self.check_candidates(spec, candidates).await;
        if let Resolution::Found(tool) = &resolution {
            self.record(tool.clone()).await;
        }
        resolution
    }

    /// Check candidates in order without consulting or updating the cache.
    pub async fn check_candidates(&self, spec: &ToolSpec, candidates: &[PathBuf]) -> Resolution {
        let mut rejected = Vec::new();

        for path in candidates {
            match self.check(spec, path).await {
                Ok(version) => {
                    return Resolution::Found(ResolvedTool {
                        id: spec.id.clone(),
                        path: path.clone(),
                        version,
                    });
                }
                Err(reason) => {
                    debug!(tool = %spec.id, ?path, %reason, "Rejected candidate");
                    rejected.push(RejectedCandidate {
                        path: path.clone(),
                        reason,
                    });
                }
            }
        }

        Resolution::NotFound(rejected)
    }

    /// Check a single candidate.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason when the candidate is unusable.
    pub async fn check(&self, spec: &ToolSpec, path: &Path) -> Result<Version, Rejection> {
        if !path.is_file() {
            return Err(Rejection::Missing);
        }
        let version = self
            .probe
            .detect(spec, path)
            .await
            .map_err(Rejection::Probe)?;
        if spec.version_range.matches(&version) {
            Ok(version)
        } else {
            Err(Rejection::OutOfRange(version))
        }
    }
}

/// Build the ordered candidate list for `spec`.
///
/// Order: explicitly configured path, the install location in the tool cache,
/// then the `PATH` lookup result when `search_path` is enabled. Duplicates are
/// dropped, keeping the first occurrence.
#[must_use]
pub fn candidate_paths(
    spec: &ToolSpec,
    configured: Option<&Path>,
    cache_path: &Path,
    search_path: bool,
) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut push = |path: PathBuf| {
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    };

    if let Some(path) = configured {
        push(path.to_path_buf());
    }
    push(cache_path.to_path_buf());
    if search_path {
        match which::which(&spec.cmd_file_name) {
            Ok(path) => push(path),
            Err(e) => debug!(tool = %spec.id, error = %e, "Not found on PATH"),
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::platform::Platform;
    use crate::tools::registry::ToolRegistry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const SHA: &str = "0000000000000000000000000000000000000000000000000000000000000000";

    fn spec() -> ToolSpec {
        let json = format!(
            r#"{{ "toolx": {{ "version": "1.5.0", "versionRange": ">=1.0.0 <2.0.0",
                "url": "https://example.com/toolx.tar.gz", "sha256sum": "{SHA}",
                "platform": {{ "linux": {{}}, "darwin": {{}}, "windows": {{}} }} }} }}"#
        );
        ToolRegistry::from_json(&json, Platform::current())
            .unwrap()
            .get("toolx")
            .unwrap()
            .clone()
    }

    /// Reports versions from a table keyed by path, counting invocations.
    struct TableProbe {
        versions: Mutex<HashMap<PathBuf, Version>>,
        calls: AtomicUsize,
    }

    impl TableProbe {
        fn new(entries: &[(&Path, &str)]) -> Self {
            Self {
                versions: Mutex::new(
                    entries
                        .iter()
                        .map(|(p, v)| (p.to_path_buf(), Version::parse(v).unwrap()))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VersionProbe for TableProbe {
        async fn detect(&self, _spec: &ToolSpec, path: &Path) -> Result<Version, ProbeFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.versions
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or(ProbeFailure::NoVersion)
        }
    }

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        path
    }

    #[tokio::test]
    async fn test_first_satisfying_candidate_wins() {
        let temp = TempDir::new().unwrap();
        let system = touch(&temp, "system-toolx");
        let cached = temp.path().join("cache-toolx");
        let probe = Arc::new(TableProbe::new(&[(&system, "1.2.0")]));
        let resolver = Resolver::new(probe);

        let resolution = resolver.resolve(&spec(), &[system.clone(), cached]).await;

        assert_eq!(
            resolution.found().map(|t| t.path),
            Some(system),
            "system binary in range should be chosen"
        );
    }

    #[tokio::test]
    async fn test_out_of_range_falls_through_to_not_found() {
        let temp = TempDir::new().unwrap();
        let system = touch(&temp, "system-toolx");
        let cached = temp.path().join("cache-toolx");
        let probe = Arc::new(TableProbe::new(&[(&system, "0.9.0")]));
        let resolver = Resolver::new(probe);

        let resolution = resolver
            .resolve(&spec(), &[system.clone(), cached.clone()])
            .await;

        let Resolution::NotFound(rejected) = resolution else {
            panic!("expected NotFound");
        };
        assert_eq!(
            rejected,
            vec![
                RejectedCandidate {
                    path: system,
                    reason: Rejection::OutOfRange(Version::new(0, 9, 0)),
                },
                RejectedCandidate {
                    path: cached,
                    reason: Rejection::Missing,
                },
            ]
        );
        assert!(resolver.cached("toolx").await.is_none());
    }

    #[tokio::test]
    async fn test_cached_resolution_skips_probe() {
        let temp = TempDir::new().unwrap();
        let system = touch(&temp, "system-toolx");
        let probe = Arc::new(TableProbe::new(&[(&system, "1.2.0")]));
        let resolver = Resolver::new(probe.clone());

        let first = resolver.resolve(&spec(), &[system.clone()]).await;
        let second = resolver.resolve(&spec(), &[system.clone()]).await;

        assert_eq!(first, second);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forget_forces_recheck() {
        let temp = TempDir::new().unwrap();
        let system = touch(&temp, "system-toolx");
        let probe = Arc::new(TableProbe::new(&[(&system, "1.2.0")]));
        let resolver = Resolver::new(probe.clone());

        resolver.resolve(&spec(), &[system.clone()]).await;
        assert!(resolver.forget("toolx").await.is_some());
        resolver.resolve(&spec(), &[system]).await;

        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_probe_failure_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let broken = touch(&temp, "broken");
        let good = touch(&temp, "good");
        let probe = Arc::new(TableProbe::new(&[(&good, "1.9.9")]));
        let resolver = Resolver::new(probe);

        let tool = resolver
            .resolve(&spec(), &[broken, good.clone()])
            .await
            .found()
            .unwrap();

        assert_eq!(tool.path, good);
        assert_eq!(tool.version, Version::new(1, 9, 9));
    }

    #[test]
    fn test_candidate_paths_order_and_dedup() {
        let spec = spec();
        let configured = PathBuf::from("/opt/toolx/toolx");
        let cache = PathBuf::from("/home/u/.cache/toolsmith/tools/toolx/toolx");

        let candidates = candidate_paths(&spec, Some(&cache), &cache, false);
        assert_eq!(candidates, vec![cache.clone()]);

        let candidates = candidate_paths(&spec, Some(&configured), &cache, false);
        assert_eq!(candidates, vec![configured, cache]);
    }
}
