//! Working-tree snapshots taken around a command.
//!
//! The caller takes one listing immediately before running a command and one
//! immediately after; anything present only in the second is a new output.
use crate::audit::is_sidecar;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Regular files under `root`, as `/`-separated paths relative to it.
///
/// Each directory is listed in sorted order. Hidden directories are not
/// descended into and sidecars are never listed. Names that are not valid
/// UTF-8 are skipped with a warning.
pub fn take_snapshot(root: &Path) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    collect_files(root, "", &mut entries)?;
    Ok(entries)
}

/// Entries of `after` missing from `before`, in `after`'s order.
pub fn diff_new_entries(before: &[String], after: &[String]) -> Vec<String> {
    let before: HashSet<&str> = before.iter().map(String::as_str).collect();
    after
        .iter()
        .filter(|entry| !before.contains(entry.as_str()))
        .cloned()
        .collect()
}

fn collect_files(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read {}", dir.display()))?;
        children.push(entry);
    }
    children.sort_by_key(|entry| entry.file_name());

    for entry in children {
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            // Recorded paths are JSON strings; a lossy name would point elsewhere.
            tracing::warn!(path = %path.display(), "skipping path that is not valid UTF-8");
            continue;
        };
        let rel = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let file_type = entry
            .file_type()
            .with_context(|| format!("inspect {}", path.display()))?;
        if file_type.is_dir() {
            if !name.starts_with('.') {
                collect_files(&path, &rel, out)?;
            }
        } else if !is_sidecar(&path) {
            out.push(rel);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, b"x").expect("write file");
    }

    #[test]
    fn snapshot_walks_nested_directories_relative_to_root() {
        let dir = TempDir::new().expect("temp dir");
        touch(dir.path(), "seq.txt");
        touch(dir.path(), "out/rev.txt");
        touch(dir.path(), "out/deeper/more.txt");

        let mut listing = take_snapshot(dir.path()).expect("snapshot");
        listing.sort();
        assert_eq!(listing, vec!["out/deeper/more.txt", "out/rev.txt", "seq.txt"]);
    }

    #[test]
    fn snapshot_skips_sidecars_and_hidden_directories() {
        let dir = TempDir::new().expect("temp dir");
        touch(dir.path(), "hello.txt");
        touch(dir.path(), "hello.txt.au");
        touch(dir.path(), ".git/HEAD");
        touch(dir.path(), ".hidden-file");

        let mut listing = take_snapshot(dir.path()).expect("snapshot");
        listing.sort();
        assert_eq!(listing, vec![".hidden-file", "hello.txt"]);
    }

    #[test]
    fn diff_keeps_order_of_later_listing() {
        let before = vec!["a.txt".to_string(), "c.txt".to_string()];
        let after = vec![
            "z.txt".to_string(),
            "a.txt".to_string(),
            "b.txt".to_string(),
            "c.txt".to_string(),
        ];

        assert_eq!(diff_new_entries(&before, &after), vec!["z.txt", "b.txt"]);
        assert!(diff_new_entries(&after, &before).is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn snapshot_skips_names_that_are_not_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().expect("temp dir");
        touch(dir.path(), "good.txt");
        let bad = dir.path().join(OsStr::from_bytes(b"bad\xff.txt"));
        fs::write(&bad, b"x").expect("write non-utf8 name");
        fs::create_dir(dir.path().join(OsStr::from_bytes(b"dir\xfe"))).expect("mkdir");
        touch(&dir.path().join(OsStr::from_bytes(b"dir\xfe")), "inner.txt");

        let listing = take_snapshot(dir.path()).expect("snapshot");

        assert_eq!(listing, vec!["good.txt"]);
    }

    #[test]
    fn snapshot_of_missing_root_names_the_directory() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("gone");

        let err = take_snapshot(&missing).expect_err("missing root");
        assert!(format!("{err:#}").contains("gone"));
    }
}
