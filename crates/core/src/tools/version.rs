//! Version ranges and version extraction from tool output.

use regex::Regex;
use semver::{Version, VersionReq};
use std::sync::LazyLock;

use crate::{Error, Result};

/// Pattern used when a manifest entry does not declare `versionPattern`.
pub const DEFAULT_VERSION_PATTERN: &str = r"v?(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)";

/// Splits whitespace-separated comparators: `>=1.0.0 <2.0.0`.
#[allow(clippy::expect_used)]
static COMPARATOR_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d|\*|[xX])\s+([<>=~^])").expect("static regex"));

/// Semantic-version constraint.
///
/// Accepts the comma-separated syntax of the `semver` crate as well as the
/// whitespace-separated form used by npm-style ranges. Alternatives are
/// separated by `||`; a version matches when any alternative matches.
#[derive(Debug, Clone)]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Parse a range expression.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any alternative fails to parse.
    pub fn parse(raw: &str) -> Result<Self> {
        let alternatives = raw
            .split("||")
            .map(|alt| {
                let alt = alt.trim();
                let normalized = COMPARATOR_GAP.replace_all(alt, "$1, $2");
                VersionReq::parse(&normalized).map_err(|e| {
                    Error::configuration(format!("Invalid version range '{raw}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: raw.trim().to_string(),
            alternatives,
        })
    }

    /// Check whether a version satisfies the range.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The range as written in the manifest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compile a version pattern, checking it has a capture group.
///
/// # Errors
///
/// Returns a configuration error for invalid regexes or patterns without a
/// capture group.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    let regex = Regex::new(pattern)
        .map_err(|e| Error::configuration(format!("Invalid version pattern '{pattern}': {e}")))?;
    if regex.captures_len() < 2 {
        return Err(Error::configuration(format!(
            "Version pattern '{pattern}' must contain a capture group"
        )));
    }
    Ok(regex)
}

/// Find the first line of `output` matching `pattern` and parse its first
/// capture group as a semantic version.
#[must_use]
pub fn extract_version(output: &str, pattern: &Regex) -> Option<Version> {
    output.lines().find_map(|line| {
        let captures = pattern.captures(line.trim())?;
        let raw = captures.get(1)?.as_str();
        Version::parse(raw.trim_start_matches('v')).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_whitespace_separated_range() {
        let range = VersionRange::parse(">=1.0.0 <2.0.0").unwrap();
        assert!(range.matches(&v("1.2.0")));
        assert!(range.matches(&v("1.0.0")));
        assert!(!range.matches(&v("0.9.0")));
        assert!(!range.matches(&v("2.0.0")));
    }

    #[test]
    fn test_comma_separated_range() {
        let range = VersionRange::parse(">=0.26.0, <0.27.0").unwrap();
        assert!(range.matches(&v("0.26.3")));
        assert!(!range.matches(&v("0.27.0")));
    }

    #[test]
    fn test_alternatives() {
        let range = VersionRange::parse("^1.2.0 || >=3.0.0 <3.1.0").unwrap();
        assert!(range.matches(&v("1.9.0")));
        assert!(range.matches(&v("3.0.4")));
        assert!(!range.matches(&v("2.0.0")));
        assert!(!range.matches(&v("3.1.0")));
    }

    #[test]
    fn test_display_keeps_raw_text() {
        let range = VersionRange::parse(" >=1.0.0 <2.0.0 ").unwrap();
        assert_eq!(range.to_string(), ">=1.0.0 <2.0.0");
    }

    #[test]
    fn test_invalid_range() {
        let err = VersionRange::parse(">=one").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_extract_default_pattern() {
        let pattern = compile_pattern(DEFAULT_VERSION_PATTERN).unwrap();
        let output = "Client Version: v1.2.0\nServer Version: v1.5.1\n";
        assert_eq!(extract_version(output, &pattern), Some(v("1.2.0")));
    }

    #[test]
    fn test_extract_skips_non_matching_lines() {
        let pattern = compile_pattern(r"^Version:\s+v?(\d+\.\d+\.\d+)").unwrap();
        let output = "Build Date: 2024-01-01\nVersion: v1.8.1\nGit Revision: abc\n";
        assert_eq!(extract_version(output, &pattern), Some(v("1.8.1")));
    }

    #[test]
    fn test_extract_prerelease() {
        let pattern = compile_pattern(DEFAULT_VERSION_PATTERN).unwrap();
        assert_eq!(
            extract_version("odo v2.0.0-rc1 (abc123)", &pattern),
            Some(v("2.0.0-rc1"))
        );
    }

    #[test]
    fn test_extract_no_version() {
        let pattern = compile_pattern(DEFAULT_VERSION_PATTERN).unwrap();
        assert_eq!(extract_version("command not understood", &pattern), None);
    }

    #[test]
    fn test_pattern_requires_capture_group() {
        assert!(compile_pattern(r"\d+\.\d+\.\d+").is_err());
        assert!(compile_pattern(r"(\d+").is_err());
    }
}
