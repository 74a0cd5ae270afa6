use std::path::{Path, PathBuf};

use anyhow::Context;

/// Where the site is installed, and the executable to delete afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRoot {
    pub path: PathBuf,
    /// Set only when the root was derived from the executable's location.
    pub artifact: Option<PathBuf>,
}

/// Resolve the document root.
///
/// Priority:
/// 1. `--document-root` flag / `WPINSTALL_DOCUMENT_ROOT` env var
/// 2. The directory holding the running executable, which is uploaded next
///    to the site it installs
pub fn resolve_document_root(explicit: Option<&Path>) -> anyhow::Result<DocumentRoot> {
    if let Some(p) = explicit {
        return Ok(DocumentRoot {
            path: p.to_path_buf(),
            artifact: None,
        });
    }

    let exe = std::env::current_exe().context("cannot locate the running executable")?;
    let path = exe
        .parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("{} has no parent directory", exe.display()))?;
    Ok(DocumentRoot {
        path,
        artifact: Some(exe),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins_and_keeps_executable() {
        let dir = TempDir::new().unwrap();
        let root = resolve_document_root(Some(dir.path())).unwrap();
        assert_eq!(root.path, dir.path());
        assert_eq!(root.artifact, None);
    }

    #[test]
    fn default_root_is_executable_dir() {
        let root = resolve_document_root(None).unwrap();
        let exe = root.artifact.unwrap();
        assert_eq!(exe.parent(), Some(root.path.as_path()));
    }
}
