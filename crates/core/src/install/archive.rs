//! Archive extraction into the tool cache.
//!
//! Extraction goes to a temporary sibling of the destination which replaces
//! the destination only when every entry was written.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, trace};

use crate::{Error, Result};

/// Archive formats recognised by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.gz` or `.tgz`
    TarGz,
    /// `.gz` holding a single file
    Gz,
}

impl ArchiveFormat {
    /// Infer the format from a file name.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArchiveFormat` for any other extension.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Ok(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if lower.ends_with(".gz") {
            Ok(Self::Gz)
        } else {
            Err(Error::UnsupportedArchiveFormat {
                file: name.to_string(),
            })
        }
    }
}

/// Extract `archive` into `dest`, replacing anything already there.
///
/// `prefix`, when set, restricts extraction to entries under that directory
/// and removes it from their paths. For [`ArchiveFormat::Gz`] the single
/// member is written as `dest/<file_name>`.
///
/// # Errors
///
/// Returns an extraction error for corrupt archives, or an I/O error.
pub fn extract(
    archive: &Path,
    format: ArchiveFormat,
    dest: &Path,
    prefix: Option<&str>,
    file_name: &str,
) -> Result<()> {
    let archive_name = archive
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let temp_dir = dest.with_file_name(format!(
        ".{}.tmp",
        dest.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("extract")
    ));

    // Clean up any previous failed extraction
    if temp_dir.exists() {
        std::fs::remove_dir_all(&temp_dir).map_err(|e| Error::io(e, &temp_dir, "remove"))?;
    }
    std::fs::create_dir_all(&temp_dir).map_err(|e| Error::io(e, &temp_dir, "create directory"))?;

    debug!(?archive, ?format, ?dest, ?prefix, "Extracting archive");
    let result = match format {
        ArchiveFormat::Zip => extract_zip(archive, &archive_name, &temp_dir, prefix),
        ArchiveFormat::TarGz => extract_tar_gz(archive, &archive_name, &temp_dir, prefix),
        ArchiveFormat::Gz => extract_gz(archive, &archive_name, &temp_dir.join(file_name)),
    };

    if let Err(e) = result {
        let _ = std::fs::remove_dir_all(&temp_dir);
        return Err(e);
    }

    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| Error::io(e, dest, "remove"))?;
    }
    std::fs::rename(&temp_dir, dest).map_err(|e| Error::io(e, dest, "rename"))?;
    Ok(())
}

/// Map an archive entry path to its path below the extraction root.
///
/// Returns `None` for entries outside `prefix`, the prefix directory itself,
/// and paths that would escape the root.
fn target_path(entry: &Path, prefix: Option<&str>) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    let relative = match prefix {
        Some(prefix) => normalized.strip_prefix(prefix).ok()?.to_path_buf(),
        None => normalized,
    };
    (!relative.as_os_str().is_empty()).then_some(relative)
}

fn extract_zip(archive: &Path, name: &str, root: &Path, prefix: Option<&str>) -> Result<()> {
    let file = File::open(archive).map_err(|e| Error::io(e, archive, "open"))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| Error::extraction(name, format!("invalid zip: {e}")))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| Error::extraction(name, format!("failed to read entry: {e}")))?;

        let Some(relative) = entry
            .enclosed_name()
            .and_then(|path| target_path(&path, prefix))
        else {
            trace!(entry = entry.name(), "Skipping zip entry");
            continue;
        };
        let outpath = root.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)
                .map_err(|e| Error::io(e, &outpath, "create directory"))?;
            continue;
        }

        write_entry(&mut entry, &outpath)?;
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            set_mode(&outpath, mode)?;
        }
    }
    Ok(())
}

fn extract_tar_gz(archive: &Path, name: &str, root: &Path, prefix: Option<&str>) -> Result<()> {
    let file = File::open(archive).map_err(|e| Error::io(e, archive, "open"))?;
    let mut tar = Archive::new(GzDecoder::new(file));
    let invalid = |e: std::io::Error| Error::extraction(name, e.to_string());

    for entry in tar.entries().map_err(invalid)? {
        let mut entry = entry.map_err(invalid)?;
        let entry_path = entry.path().map_err(invalid)?.into_owned();

        let Some(relative) = target_path(&entry_path, prefix) else {
            trace!(?entry_path, "Skipping tar entry");
            continue;
        };
        let outpath = root.join(relative);

        match entry.header().entry_type() {
            EntryType::Directory => {
                std::fs::create_dir_all(&outpath)
                    .map_err(|e| Error::io(e, &outpath, "create directory"))?;
            }
            EntryType::Regular | EntryType::Continuous => {
                write_entry(&mut entry, &outpath)?;
                #[cfg(unix)]
                if let Ok(mode) = entry.header().mode() {
                    set_mode(&outpath, mode)?;
                }
            }
            other => trace!(?entry_path, ?other, "Skipping unsupported tar entry type"),
        }
    }
    Ok(())
}

fn extract_gz(archive: &Path, name: &str, outpath: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| Error::io(e, archive, "open"))?;
    let mut decoder = GzDecoder::new(file);
    let mut out = File::create(outpath).map_err(|e| Error::io(e, outpath, "create"))?;
    std::io::copy(&mut decoder, &mut out).map_err(|e| Error::extraction(name, e.to_string()))?;
    Ok(())
}

fn write_entry(reader: &mut impl Read, outpath: &Path) -> Result<()> {
    if let Some(parent) = outpath.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create directory"))?;
    }
    let mut out = File::create(outpath).map_err(|e| Error::io(e, outpath, "create"))?;
    std::io::copy(reader, &mut out).map_err(|e| Error::io(e, outpath, "write"))?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|e| Error::io(e, path, "set permissions"))
}

/// Mark `path` executable for everyone who can read it.
///
/// # Errors
///
/// Returns an I/O error if the permissions cannot be changed.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)
        .map_err(|e| Error::io(e, path, "stat"))?
        .permissions()
        .mode();
    set_mode(path, mode | 0o755)
}

/// Windows has no executable bit.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_tarball(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, &content[..]).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap();
    }

    fn create_zip(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(
            ArchiveFormat::from_file_name("kn.zip").unwrap(),
            ArchiveFormat::Zip
        );
        assert_eq!(
            ArchiveFormat::from_file_name("kn-linux.TAR.GZ").unwrap(),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_file_name("kn.tgz").unwrap(),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_file_name("odo.gz").unwrap(),
            ArchiveFormat::Gz
        );
        assert!(matches!(
            ArchiveFormat::from_file_name("kn.exe"),
            Err(Error::UnsupportedArchiveFormat { .. })
        ));
        assert!(matches!(
            ArchiveFormat::from_file_name("kn.tar.xz"),
            Err(Error::UnsupportedArchiveFormat { .. })
        ));
    }

    #[test]
    fn test_target_path() {
        assert_eq!(
            target_path(Path::new("./bin/kn"), None),
            Some(PathBuf::from("bin/kn"))
        );
        assert_eq!(target_path(Path::new("../etc/passwd"), None), None);
        assert_eq!(target_path(Path::new("/abs/kn"), None), None);
        assert_eq!(
            target_path(Path::new("kn-darwin/kn"), Some("kn-darwin")),
            Some(PathBuf::from("kn"))
        );
        assert_eq!(target_path(Path::new("kn-darwin/"), Some("kn-darwin/")), None);
        assert_eq!(target_path(Path::new("LICENSE"), Some("kn-darwin")), None);
    }

    #[test]
    fn test_extract_tar_gz_with_prefix() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("kn.tar.gz");
        create_tarball(
            &archive,
            &[("kn-linux/kn", b"binary"), ("README.md", b"readme")],
        );
        let dest = temp.path().join("tools").join("kn");

        extract(&archive, ArchiveFormat::TarGz, &dest, Some("kn-linux"), "kn").unwrap();

        assert_eq!(std::fs::read(dest.join("kn")).unwrap(), b"binary");
        assert!(!dest.join("README.md").exists());
        assert!(!temp.path().join("tools").join(".kn.tmp").exists());
    }

    #[test]
    fn test_extract_zip_replaces_previous_install() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("kn.zip");
        create_zip(&archive, &[("kn", b"new"), ("docs/kn.1", b"man")]);
        let dest = temp.path().join("kn");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("stale"), b"old").unwrap();

        extract(&archive, ArchiveFormat::Zip, &dest, None, "kn").unwrap();

        assert_eq!(std::fs::read(dest.join("kn")).unwrap(), b"new");
        assert_eq!(std::fs::read(dest.join("docs/kn.1")).unwrap(), b"man");
        assert!(!dest.join("stale").exists());
    }

    #[test]
    fn test_extract_single_gz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("odo.gz");
        let mut encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        encoder.write_all(b"odo binary").unwrap();
        encoder.finish().unwrap();
        let dest = temp.path().join("odo");

        extract(&archive, ArchiveFormat::Gz, &dest, None, "odo").unwrap();

        assert_eq!(std::fs::read(dest.join("odo")).unwrap(), b"odo binary");
    }

    #[test]
    fn test_corrupt_archive_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("kn.zip");
        std::fs::write(&archive, b"not a zip").unwrap();
        let dest = temp.path().join("kn");

        let err = extract(&archive, ArchiveFormat::Zip, &dest, None, "kn").unwrap_err();

        assert!(matches!(err, Error::Extraction { .. }));
        assert!(!dest.exists());
        assert!(!temp.path().join(".kn.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("kn");
        std::fs::write(&path, b"x").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();

        make_executable(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
