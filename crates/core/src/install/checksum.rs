//! SHA-256 digests of downloaded files.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::{Error, Result};

/// Compute the SHA-256 of a file as lowercase hex.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub async fn file_sha256(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::io(e, path, "open"))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .map_err(|e| Error::io(e, path, "read"))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify that the file at `path` has the expected digest.
///
/// On mismatch the file is deleted before the error is returned, so a corrupt
/// archive never survives in the cache.
///
/// # Errors
///
/// Returns `ChecksumMismatch` when the digest differs, or an I/O error.
pub async fn verify_file(path: &Path, expected: &str) -> Result<()> {
    let actual = file_sha256(path).await?;
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }

    tokio::fs::remove_file(path)
        .await
        .map_err(|e| Error::io(e, path, "remove"))?;

    let file = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    Err(Error::checksum_mismatch(file, expected, actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // sha256("hello world")
    const HELLO: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[tokio::test]
    async fn test_file_sha256() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello");
        std::fs::write(&path, b"hello world").unwrap();

        assert_eq!(file_sha256(&path).await.unwrap(), HELLO);
    }

    #[tokio::test]
    async fn test_verify_accepts_uppercase_expected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello");
        std::fs::write(&path, b"hello world").unwrap();

        verify_file(&path, &HELLO.to_uppercase()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_verify_mismatch_deletes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kn.tar.gz");
        std::fs::write(&path, b"tampered").unwrap();

        let err = verify_file(&path, HELLO).await.unwrap_err();

        assert!(matches!(
            err,
            Error::ChecksumMismatch { ref file, ref expected, .. }
                if file == "kn.tar.gz" && expected == HELLO
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = file_sha256(Path::new("/nonexistent/file")).await.unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
