//! Flat `KEY=VALUE` env files (`.db.env`, `.auth0.env`).

use crate::error::{InstallError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvMap {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl EnvMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Like [`EnvMap::get`] but a missing key is an error naming the file.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| InstallError::MissingEnvKey {
            key: key.to_string(),
            path: self.path.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read an env file. A missing or unreadable file yields an empty map.
///
/// Blank lines and lines starting with `#` are skipped, each remaining line
/// is split on its first `=`, and the last occurrence of a key wins.
pub fn read(path: &Path) -> EnvMap {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("env file {} not read: {e}", path.display());
            String::new()
        }
    };
    EnvMap {
        path: path.to_path_buf(),
        values: parse(&content),
    }
}

fn parse(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            values.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    values
}
