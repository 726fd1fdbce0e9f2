//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use toolsmith_core::ToolRegistry;
use toolsmith_core::prompt::{InstallRequest, Prompter, RetryRequest};
use toolsmith_core::tools::Platform;

/// Platform key that never matches the running platform.
pub const OTHER_OS: &str = if cfg!(windows) { "linux" } else { "windows" };

/// Build a gzip-compressed tarball in memory.
pub fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Manifest with a single `kn` entry available on every platform.
pub fn kn_manifest(url: &str, sha: &str, extra: &str) -> String {
    format!(
        r#"{{
            "kn": {{
                "description": "Knative CLI",
                "version": "1.8.1",
                "versionRange": ">=1.0.0 <2.0.0",
                "versionRangeLabel": "v1.x",
                "url": "{url}",
                "sha256sum": "{sha}"
                {extra},
                "platform": {{ "linux": {{}}, "darwin": {{}}, "windows": {{}} }}
            }},
            "odo": {{
                "description": "OpenShift Do",
                "version": "3.0.0",
                "versionRange": "^3.0.0",
                "url": "https://example.com/odo.tar.gz",
                "sha256sum": "{sha}",
                "platform": {{ "{OTHER_OS}": {{}} }}
            }}
        }}"#
    )
}

pub fn registry(json: &str) -> ToolRegistry {
    ToolRegistry::from_json(json, Platform::current()).unwrap()
}

/// Shell script printing `output` for any arguments.
#[cfg(unix)]
pub fn script(output: &str) -> Vec<u8> {
    format!("#!/bin/sh\necho \"{output}\"\n").into_bytes()
}

/// Write an executable script at `path`.
#[cfg(unix)]
pub fn write_script(path: &Path, output: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, script(output)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

/// Prompter with a fixed answer that counts the questions it was asked.
#[derive(Debug, Default)]
pub struct CountingPrompter {
    pub answer: bool,
    pub installs: AtomicU32,
    pub retries: AtomicU32,
}

impl CountingPrompter {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            ..Self::default()
        }
    }

    pub fn installs(&self) -> u32 {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Prompter for CountingPrompter {
    async fn confirm_install(&self, _request: &InstallRequest<'_>) -> bool {
        self.installs.fetch_add(1, Ordering::SeqCst);
        self.answer
    }

    async fn confirm_retry(&self, _request: &RetryRequest<'_>) -> bool {
        self.retries.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}
