//! Persistence for finished analyses.
//!
//! The analysis core never touches storage; callers hand results to a
//! [`ResultStore`] after `analyze` returns.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::audio::AnalysisResult;

pub trait ResultStore {
    fn put(&self, key: &str, result: &AnalysisResult) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<AnalysisResult>>;
    /// Stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>>;
}

/// One pretty-printed `<key>.json` file per result.
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data_dir>/tunebeat/results`, falling back to the home directory.
    pub fn default_dir() -> Result<PathBuf> {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .context("Cannot determine data directory")?;
        Ok(base.join("tunebeat").join("results"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let name = sanitize_key(key);
        if name.is_empty() {
            anyhow::bail!("Invalid result key: {:?}", key);
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }
}

impl ResultStore for JsonDirStore {
    fn put(&self, key: &str, result: &AnalysisResult) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create result dir: {}", self.dir.display()))?;
        let path = self.path_for(key)?;
        let json = serde_json::to_string_pretty(result).context("Failed to serialize result")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write result: {}", path.display()))?;
        log::debug!("Saved result to {}", path.display());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<AnalysisResult>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read result: {}", path.display()))?;
        let result = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse result: {}", path.display()))?;
        Ok(Some(result))
    }

    fn keys(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list result dir: {}", self.dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Keeps `[A-Za-z0-9_-]`, mapping everything else to `_`.
pub fn sanitize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_keys() {
        assert_eq!(sanitize_key("take 1.wav"), "take_1_wav");
        assert_eq!(sanitize_key("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_key("  "), "");
    }

    #[test]
    fn empty_key_is_rejected() {
        let store = JsonDirStore::new("/nonexistent");
        assert!(store.get("").is_err());
    }

    #[test]
    fn missing_dir_has_no_keys() {
        let store = JsonDirStore::new("/nonexistent/tunebeat-results");
        assert!(store.keys().unwrap().is_empty());
        assert!(store.get("anything").unwrap().is_none());
    }
}
