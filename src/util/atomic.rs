//! Crash-safe file rewrites.
//!
//! A batch rewrites whatever files the location list names, scripts
//! included. Temp files are created `0600`, so without carrying the mode
//! over every rewritten file would lose its execute and group bits. The new
//! text goes to a hidden sibling that is synced and renamed over the target;
//! readers see either the old file or the new one.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

const TEMP_PREFIX: &str = ".batch-replace-";

/// Replace the contents of `path` with `content`, keeping its permissions.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    // `Path::parent` of a bare file name is the empty path.
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = std::fs::metadata(path).ok().map(|m| m.permissions());

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;

    if let Some(permissions) = permissions {
        tmp.as_file()
            .set_permissions(permissions)
            .with_context(|| format!("failed to copy permissions of {}", path.display()))?;
    }

    tmp.write_all(content.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .with_context(|| format!("failed to write new contents for {}", path.display()))?;

    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to rename over {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "before\n").expect("seed");

        atomic_write(&path, "after\n").expect("writes");

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "after\n");
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.txt");

        atomic_write(&path, "new file\n").expect("writes");

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt"]);
    }

    #[test]
    fn test_missing_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("no/such/dir/a.txt");
        assert!(atomic_write(&path, "x").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("script.sh");
        std::fs::write(&path, "echo old\n").expect("seed");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        atomic_write(&path, "echo new\n").expect("writes");

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
