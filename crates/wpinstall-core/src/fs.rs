//! Filesystem primitives used by the install pipeline.
//!
//! Removal helpers are idempotent: a missing path is not an error, so the
//! rollback path can call them unconditionally and repeatedly.

use crate::error::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Create a directory and all parents, idempotent.
pub fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Remove a file. A missing file is not an error.
pub fn remove_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("file at {} doesn't exist", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a directory with everything below it. A symlink (even one
/// pointing at a directory) or a plain file at `path` is unlinked, never
/// followed. A missing path is not an error.
pub fn remove_dir_recursive(path: &Path) -> Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_dir() {
        return remove_file(path);
    }
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Atomically write `data` to `path` using a tempfile in the same directory.
pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Mark a file as executable (0755). No-op on platforms without unix modes.
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Move every entry of `from` (dotfiles included) into `to`, replacing
/// entries of the same name. `to` is created when missing.
pub fn move_dir_contents(from: &Path, to: &Path) -> Result<()> {
    create_dir(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if target.is_dir() {
            remove_dir_recursive(&target)?;
        } else if target.exists() {
            remove_file(&target)?;
        }
        std::fs::rename(entry.path(), &target)?;
    }
    Ok(())
}

/// First directory directly below `dir` whose name contains `needle`,
/// i.e. the match of the glob `dir/*needle*`.
pub fn find_dir_containing(dir: &Path, needle: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(needle))
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// A directory that is removed when the guard goes out of scope, on every
/// exit path including early returns through `?`.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(path: PathBuf) -> Result<Self> {
        create_dir(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = remove_dir_recursive(&self.path) {
            tracing::warn!("failed to remove {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/wp-cli.yml");
        write_file(&path, b"data").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "data");
    }

    #[test]
    fn create_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x/y");
        create_dir(&path).unwrap();
        create_dir(&path).unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn remove_file_twice_is_fine() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".db.env");
        std::fs::write(&path, "DB_NAME=x").unwrap();
        remove_file(&path).unwrap();
        remove_file(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn remove_dir_recursive_twice_is_fine() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("cms");
        std::fs::create_dir_all(root.join("wp-content/plugins/auth0")).unwrap();
        std::fs::write(root.join("wp-config.php"), "<?php").unwrap();
        std::fs::write(root.join("wp-content/plugins/auth0/.hidden"), "x").unwrap();
        remove_dir_recursive(&root).unwrap();
        assert!(!root.exists());
        remove_dir_recursive(&root).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn remove_dir_recursive_unlinks_symlinked_dir() {
        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("shared");
        std::fs::create_dir(&shared).unwrap();
        std::fs::write(shared.join("keep.txt"), "keep").unwrap();
        let link = dir.path().join("WPResources");
        std::os::unix::fs::symlink(&shared, &link).unwrap();

        remove_dir_recursive(&link).unwrap();
        assert!(std::fs::symlink_metadata(&link).is_err());
        assert_eq!(std::fs::read_to_string(shared.join("keep.txt")).unwrap(), "keep");
    }

    #[cfg(unix)]
    #[test]
    fn remove_dir_recursive_keeps_targets_of_nested_links() {
        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("shared");
        std::fs::create_dir(&shared).unwrap();
        std::fs::write(shared.join("keep.txt"), "keep").unwrap();
        let root = dir.path().join("cms");
        std::fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&shared, root.join("uploads")).unwrap();

        remove_dir_recursive(&root).unwrap();
        assert!(!root.exists());
        assert!(shared.join("keep.txt").exists());
    }

    #[test]
    fn remove_dir_recursive_removes_plain_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("WPResources");
        std::fs::write(&path, "x").unwrap();
        remove_dir_recursive(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn move_dir_contents_includes_dotfiles() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("bedrock");
        let to = dir.path().join("cms");
        std::fs::create_dir_all(from.join("web")).unwrap();
        std::fs::write(from.join(".env.example"), "A=1").unwrap();
        std::fs::write(from.join("composer.json"), "{}").unwrap();
        move_dir_contents(&from, &to).unwrap();
        assert!(to.join("web").is_dir());
        assert!(to.join(".env.example").exists());
        assert!(to.join("composer.json").exists());
        assert_eq!(std::fs::read_dir(&from).unwrap().count(), 0);
    }

    #[test]
    fn find_dir_containing_matches_glob() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("wp-graphql-gutenberg-0.4.1")).unwrap();
        std::fs::write(dir.path().join("auth0.zip"), "").unwrap();
        assert!(find_dir_containing(dir.path(), "wp-graphql-gutenberg").is_some());
        assert!(find_dir_containing(dir.path(), "auth0").is_none());
        assert!(find_dir_containing(&dir.path().join("missing"), "x").is_none());
    }

    #[test]
    fn scratch_dir_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth0-tmp");
        {
            let scratch = ScratchDir::create(path.clone()).unwrap();
            std::fs::write(scratch.path().join("composer.phar"), "x").unwrap();
        }
        assert!(!path.exists());
    }
}
