//! Feed file discovery inside an extracted archive

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const MACOS_METADATA_DIR: &str = "__MACOSX";

/// Recursively list every regular `.xml` file (any case) under `root`
///
/// Entries are visited sorted by file name. Hidden entries and `__MACOSX`
/// resource-fork directories are skipped along with everything below them.
/// Unreadable directory entries are logged and skipped. An empty result is not an error here; the pipeline
/// decides what an archive without feeds means.
pub fn locate_feeds(root: &Path) -> Vec<PathBuf> {
    let mut feeds = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_archive_artifact(entry.file_name()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry while locating feeds");
                continue;
            },
        };

        if entry.file_type().is_file() && is_feed_file(entry.path()) {
            debug!(feed = %entry.path().display(), "Found feed file");
            feeds.push(entry.into_path());
        }
    }

    feeds
}

/// Metadata that archivers add next to the real content
fn is_archive_artifact(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') || name == MACOS_METADATA_DIR
}

fn is_feed_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_locates_nested_xml_any_case() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::write(root.join("top.xml"), "<a/>").unwrap();
        fs::write(root.join("a/b/c/deep.XML"), "<a/>").unwrap();
        fs::write(root.join("a/photo.jpg"), "x").unwrap();
        fs::write(root.join("a/notes.xml.bak"), "x").unwrap();

        let mut found: Vec<String> = locate_feeds(root)
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        found.sort();

        assert_eq!(found, vec!["a/b/c/deep.XML", "top.xml"]);
    }

    #[test]
    fn test_directory_named_xml_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("feeds.xml")).unwrap();
        assert!(locate_feeds(tmp.path()).is_empty());
    }

    #[test]
    fn test_skips_macos_metadata_and_hidden_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("__MACOSX/feeds")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::create_dir_all(root.join("feeds")).unwrap();
        fs::write(root.join("offers.xml"), "<a/>").unwrap();
        fs::write(root.join("feeds/more.xml"), "<a/>").unwrap();
        fs::write(root.join("__MACOSX/._offers.xml"), [0u8, 5, 22, 7]).unwrap();
        fs::write(root.join("__MACOSX/feeds/._more.xml"), [0u8, 5, 22, 7]).unwrap();
        fs::write(root.join("feeds/._more.xml"), [0u8, 5, 22, 7]).unwrap();
        fs::write(root.join(".cache/index.xml"), "<a/>").unwrap();

        let found: Vec<String> = locate_feeds(root)
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(found, vec!["feeds/more.xml", "offers.xml"]);
    }

    #[test]
    fn test_sorted_by_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b.xml", "c.xml", "a.xml"] {
            fs::write(tmp.path().join(name), "<a/>").unwrap();
        }
        let names: Vec<String> = locate_feeds(tmp.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.xml", "b.xml", "c.xml"]);
    }

    #[test]
    fn test_stable_within_run() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["one.xml", "two.xml", "three.xml"] {
            fs::write(tmp.path().join(name), "<a/>").unwrap();
        }
        assert_eq!(locate_feeds(tmp.path()), locate_feeds(tmp.path()));
    }
}
