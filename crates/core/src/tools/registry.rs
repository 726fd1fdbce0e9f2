//! Tool registry loaded from the JSON manifest.
//!
//! The manifest describes every external CLI the front-end depends on. It is
//! read once, resolved against the running [`Platform`], and never mutated
//! afterwards.

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

use super::platform::{Os, Platform};
use super::version::{DEFAULT_VERSION_PATTERN, VersionRange, compile_pattern};
use crate::{Error, Result};

/// Raw manifest entry as written in JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ToolEntry {
    description: Option<String>,
    vendor: Option<String>,
    version: Option<String>,
    version_range: Option<String>,
    version_range_label: Option<String>,
    version_args: Option<Vec<String>>,
    version_pattern: Option<String>,
    url: Option<String>,
    sha256sum: Option<String>,
    dl_file_name: Option<String>,
    cmd_file_name: Option<String>,
    file_prefix: Option<String>,
    #[serde(default)]
    platform: BTreeMap<String, ToolEntry>,
}

impl ToolEntry {
    /// Overlay `other` on top of `self`; set fields in `other` win.
    fn overlay(mut self, other: &Self) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field.clone_from(&other.$field); })*
            };
        }
        take!(
            description,
            vendor,
            version,
            version_range,
            version_range_label,
            version_args,
            version_pattern,
            url,
            sha256sum,
            dl_file_name,
            cmd_file_name,
            file_prefix
        );
        self
    }

    /// Pick the override for `platform`, preferring `<os>-<arch>` over `<os>`.
    fn for_platform(&self, platform: &Platform) -> Option<Self> {
        let os_entry = self
            .platform
            .iter()
            .find(|(key, _)| !key.contains('-') && Os::parse(key) == Some(platform.os))
            .map(|(_, entry)| entry);
        let arch_entry = self
            .platform
            .iter()
            .find(|(key, _)| Platform::parse(key).as_ref() == Some(platform))
            .map(|(_, entry)| entry);

        if os_entry.is_none() && arch_entry.is_none() {
            return None;
        }

        let mut base = self.clone();
        base.platform.clear();
        if let Some(entry) = os_entry {
            base = base.overlay(entry);
        }
        if let Some(entry) = arch_entry {
            base = base.overlay(entry);
        }
        Some(base)
    }
}

/// Immutable description of one tool for the running platform.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Tool id (manifest key).
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Vendor name, when declared.
    pub vendor: Option<String>,
    /// Version installed by the download.
    pub version: String,
    /// Range an existing binary must satisfy.
    pub version_range: VersionRange,
    /// Short range label for messages, e.g. `v1.x`.
    pub version_range_label: String,
    /// Arguments that make the tool print its version.
    pub version_args: Vec<String>,
    /// Pattern whose first capture group is the version.
    pub version_pattern: Regex,
    /// Archive download URL.
    pub download_url: String,
    /// Expected SHA-256 of the archive (lowercase hex).
    pub sha256: String,
    /// File name of the downloaded archive.
    pub dl_file_name: String,
    /// File name of the executable inside the install directory.
    pub cmd_file_name: String,
    /// Archive path prefix stripped during extraction.
    pub file_prefix: Option<String>,
}

impl ToolSpec {
    fn from_entry(id: &str, entry: ToolEntry, platform: &Platform) -> Result<Self> {
        let missing = |field: &str| {
            Error::configuration_with_help(
                format!("Tool '{id}' has no '{field}' for {platform}"),
                format!("Add '{field}' to the '{id}' entry or its platform override"),
            )
        };

        let version = entry.version.ok_or_else(|| missing("version"))?;
        let range_text = entry.version_range.ok_or_else(|| missing("versionRange"))?;
        let version_range = VersionRange::parse(&range_text)?;
        let url = entry.url.ok_or_else(|| missing("url"))?;
        let sha256 = entry.sha256sum.ok_or_else(|| missing("sha256sum"))?;
        if sha256.len() != 64 || !sha256.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::configuration(format!(
                "Tool '{id}' has an invalid sha256sum for {platform}"
            )));
        }

        let download_url = expand_template(&url, &version, platform);
        let dl_file_name = match entry.dl_file_name {
            Some(name) => expand_template(&name, &version, platform),
            None => file_name_from_url(&download_url).ok_or_else(|| missing("dlFileName"))?,
        };
        let cmd_file_name =
            platform.executable_name(entry.cmd_file_name.as_deref().unwrap_or(id));
        let pattern = entry
            .version_pattern
            .as_deref()
            .unwrap_or(DEFAULT_VERSION_PATTERN);

        Ok(Self {
            id: id.to_string(),
            description: entry.description.unwrap_or_else(|| id.to_string()),
            vendor: entry.vendor,
            version_range_label: entry
                .version_range_label
                .unwrap_or_else(|| version_range.to_string()),
            version,
            version_range,
            version_args: entry
                .version_args
                .unwrap_or_else(|| vec!["version".to_string()]),
            version_pattern: compile_pattern(pattern)?,
            download_url,
            sha256: sha256.to_ascii_lowercase(),
            dl_file_name,
            cmd_file_name,
            file_prefix: entry.file_prefix.filter(|p| !p.is_empty()),
        })
    }
}

/// Registry of tool specifications for one platform.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    platform: Platform,
    tools: BTreeMap<String, ToolSpec>,
    unavailable: BTreeSet<String>,
}

impl ToolRegistry {
    /// Parse a JSON manifest for `platform`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed JSON or an invalid entry.
    pub fn from_json(json: &str, platform: Platform) -> Result<Self> {
        let entries: BTreeMap<String, ToolEntry> = serde_json::from_str(json).map_err(|e| {
            Error::configuration_with_help(
                format!("Invalid tool manifest: {e}"),
                "The manifest is a JSON object keyed by tool id",
            )
        })?;

        let mut tools = BTreeMap::new();
        let mut unavailable = BTreeSet::new();
        for (id, entry) in entries {
            match entry.for_platform(&platform) {
                Some(resolved) => {
                    let spec = ToolSpec::from_entry(&id, resolved, &platform)?;
                    tools.insert(id, spec);
                }
                None => {
                    debug!(%id, %platform, "Tool has no download for this platform");
                    unavailable.insert(id);
                }
            }
        }

        Ok(Self {
            platform,
            tools,
            unavailable,
        })
    }

    /// Load a JSON manifest from disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a configuration
    /// error if it is invalid.
    pub fn load(path: &Path, platform: Platform) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        Self::from_json(&json, platform)
    }

    /// The platform the registry was resolved for.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Look up a tool.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` when the tool exists without a download
    /// for this platform, `UnknownTool` when it is not declared at all.
    pub fn get(&self, id: &str) -> Result<&ToolSpec> {
        if let Some(spec) = self.tools.get(id) {
            return Ok(spec);
        }
        if self.unavailable.contains(id) {
            return Err(Error::UnsupportedPlatform {
                id: id.to_string(),
                platform: self.platform.to_string(),
            });
        }
        Err(Error::UnknownTool { id: id.to_string() })
    }

    /// Iterate over tools available on this platform, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }

    /// Ids declared in the manifest but unavailable on this platform.
    pub fn unavailable(&self) -> impl Iterator<Item = &str> {
        self.unavailable.iter().map(String::as_str)
    }

    /// Number of tools available on this platform.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if no tool is available on this platform.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Expand `{version}`, `{os}` and `{arch}` in a manifest string.
fn expand_template(template: &str, version: &str, platform: &Platform) -> String {
    template
        .replace("{version}", version)
        .replace("{os}", &platform.os.to_string())
        .replace("{arch}", platform.arch.asset_name())
}

fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::platform::Arch;

    const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn manifest() -> String {
        format!(
            r#"{{
                "kn": {{
                    "description": "Knative CLI",
                    "vendor": "Red Hat",
                    "version": "1.8.1",
                    "versionRange": ">=1.0.0 <2.0.0",
                    "versionRangeLabel": "v1.x",
                    "url": "https://example.com/kn/v{{version}}/kn-{{os}}-{{arch}}.tar.gz",
                    "sha256sum": "{SHA_A}",
                    "platform": {{
                        "linux": {{}},
                        "darwin": {{ "filePrefix": "kn-darwin" }},
                        "darwin-arm64": {{ "sha256sum": "{SHA_B}" }},
                        "win32": {{ "url": "https://example.com/kn/kn-windows.zip" }}
                    }}
                }},
                "odo": {{
                    "version": "3.0.0",
                    "versionRange": "^3.0.0",
                    "url": "https://example.com/odo.tar.gz",
                    "sha256sum": "{SHA_A}",
                    "platform": {{ "linux": {{ "cmdFileName": "odo-cli" }} }}
                }}
            }}"#
        )
    }

    #[test]
    fn test_linux_entry() {
        let registry =
            ToolRegistry::from_json(&manifest(), Platform::new(Os::Linux, Arch::X86_64)).unwrap();
        let kn = registry.get("kn").unwrap();

        assert_eq!(kn.description, "Knative CLI");
        assert_eq!(kn.vendor.as_deref(), Some("Red Hat"));
        assert_eq!(
            kn.download_url,
            "https://example.com/kn/v1.8.1/kn-linux-amd64.tar.gz"
        );
        assert_eq!(kn.dl_file_name, "kn-linux-amd64.tar.gz");
        assert_eq!(kn.cmd_file_name, "kn");
        assert_eq!(kn.version_range_label, "v1.x");
        assert_eq!(kn.version_args, vec!["version".to_string()]);
        assert!(kn.file_prefix.is_none());

        let odo = registry.get("odo").unwrap();
        assert_eq!(odo.cmd_file_name, "odo-cli");
        assert_eq!(odo.version_range_label, "^3.0.0");
    }

    #[test]
    fn test_arch_override_wins_over_os() {
        let registry =
            ToolRegistry::from_json(&manifest(), Platform::new(Os::Darwin, Arch::Arm64)).unwrap();
        let kn = registry.get("kn").unwrap();

        assert_eq!(kn.sha256, SHA_B);
        assert_eq!(kn.file_prefix.as_deref(), Some("kn-darwin"));

        let registry =
            ToolRegistry::from_json(&manifest(), Platform::new(Os::Darwin, Arch::X86_64)).unwrap();
        assert_eq!(registry.get("kn").unwrap().sha256, SHA_A);
    }

    #[test]
    fn test_windows_entry_uses_exe() {
        let registry =
            ToolRegistry::from_json(&manifest(), Platform::new(Os::Windows, Arch::X86_64))
                .unwrap();
        let kn = registry.get("kn").unwrap();

        assert_eq!(kn.cmd_file_name, "kn.exe");
        assert_eq!(kn.dl_file_name, "kn-windows.zip");
    }

    #[test]
    fn test_unavailable_platform() {
        let registry =
            ToolRegistry::from_json(&manifest(), Platform::new(Os::Darwin, Arch::X86_64)).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(matches!(
            registry.get("odo"),
            Err(Error::UnsupportedPlatform { .. })
        ));
        assert!(matches!(
            registry.get("helm"),
            Err(Error::UnknownTool { .. })
        ));
        assert_eq!(registry.unavailable().collect::<Vec<_>>(), vec!["odo"]);
    }

    #[test]
    fn test_missing_checksum_is_rejected() {
        let json = r#"{ "kn": { "version": "1.0.0", "versionRange": "^1", "url": "https://x/kn.zip", "platform": { "linux": {} } } }"#;
        let err = ToolRegistry::from_json(json, Platform::new(Os::Linux, Arch::X86_64))
            .unwrap_err();
        assert!(err.to_string().contains("sha256sum"));
    }

    #[test]
    fn test_invalid_checksum_is_rejected() {
        let json = r#"{ "kn": { "version": "1.0.0", "versionRange": "^1", "url": "https://x/kn.zip", "sha256sum": "xyz", "platform": { "linux": {} } } }"#;
        assert!(ToolRegistry::from_json(json, Platform::new(Os::Linux, Arch::X86_64)).is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let json = r#"{ "kn": { "verison": "1.0.0" } }"#;
        assert!(ToolRegistry::from_json(json, Platform::current()).is_err());
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://x.com/a/b/kn.tar.gz?token=1").as_deref(),
            Some("kn.tar.gz")
        );
        assert_eq!(file_name_from_url("https://x.com/a/"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ToolRegistry::load(Path::new("/nonexistent/tools.json"), Platform::current())
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
