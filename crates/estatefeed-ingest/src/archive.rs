//! Archive validation and extraction
//!
//! Every run unpacks its archive into a fresh [`ScratchDir`] under the
//! configured scratch root. The directory is removed when the run closes it,
//! and again on drop if a failure path never got that far.

use crate::config::ArchiveConfig;
use estatefeed_common::{ImportError, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Local file header signature
const ZIP_ENTRY_SIGNATURE: &[u8; 4] = b"PK\x03\x04";
/// End-of-central-directory signature; an archive with no entries starts with it
const ZIP_EMPTY_SIGNATURE: &[u8; 4] = b"PK\x05\x06";

// ============================================================================
// Validation
// ============================================================================

/// Check that the archive exists, is a non-empty ZIP within the size limit
///
/// Returns the archive size in bytes.
pub async fn validate_archive(config: &ArchiveConfig) -> Result<u64> {
    let path = &config.archive_path;

    if path.as_os_str().is_empty() {
        return Err(ImportError::invalid_input("no archive selected"));
    }

    let is_zip_name = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);
    if !is_zip_name {
        return Err(ImportError::invalid_input(format!(
            "unsupported file type: {}",
            path.display()
        )));
    }

    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ImportError::invalid_input(format!(
                "archive does not exist: {}",
                path.display()
            )));
        },
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_file() {
        return Err(ImportError::invalid_input(format!("not a file: {}", path.display())));
    }

    let size = metadata.len();
    if size == 0 {
        return Err(ImportError::invalid_input(format!("archive is empty: {}", path.display())));
    }
    if size > config.max_archive_bytes {
        return Err(ImportError::invalid_input(format!(
            "archive is {} bytes, limit is {}",
            size, config.max_archive_bytes
        )));
    }

    let mut signature = [0u8; 4];
    let mut file = tokio::fs::File::open(path).await?;
    let is_zip = match file.read_exact(&mut signature).await {
        Ok(_) => &signature == ZIP_ENTRY_SIGNATURE || &signature == ZIP_EMPTY_SIGNATURE,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e.into()),
    };
    if !is_zip {
        return Err(ImportError::invalid_input(format!(
            "not a ZIP archive: {}",
            path.display()
        )));
    }

    debug!(archive = %path.display(), size_bytes = size, "Archive validated");
    Ok(size)
}

// ============================================================================
// Scratch directory
// ============================================================================

/// Per-run working directory, removed recursively on close or drop
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a uniquely named directory under `root`
    ///
    /// The name carries a millisecond timestamp followed by a random suffix,
    /// so two runs started in the same millisecond still get distinct
    /// directories.
    pub fn create(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
        let dir = tempfile::Builder::new()
            .prefix(&format!("estatefeed-{}-", stamp))
            .tempdir_in(root)?;
        debug!(path = %dir.path().display(), "Created scratch directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory now, logging rather than failing on error
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "Removed scratch directory"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove scratch directory"),
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Unpack every entry of `archive` into `dest`, keeping relative paths
///
/// Returns the number of files written.
pub async fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();

    let count = tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest))
        .await
        .map_err(|e| ImportError::extraction(format!("extraction task failed: {}", e)))??;

    info!(files = count, "Archive extracted");
    Ok(count)
}

fn extract_blocking(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| ImportError::extraction(format!("{}: {}", archive.display(), e)))?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| ImportError::extraction(format!("entry {}: {}", index, e)))?;

        let relative: PathBuf = match entry.enclosed_name() {
            Some(name) => name.to_path_buf(),
            None => {
                return Err(ImportError::extraction(format!(
                    "entry '{}' points outside the extraction directory",
                    entry.name()
                )));
            },
        };
        let target = dest.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| ImportError::extraction(format!("{}: {}", relative.display(), e)))?;

        debug!(entry = %relative.display(), size_bytes = entry.size(), "Extracted entry");
        written += 1;
    }

    Ok(written)
}
