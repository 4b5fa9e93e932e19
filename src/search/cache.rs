//! Offline copies of category data.
//!
//! Each category is one JSON file, `<dir>/<category>.json`, holding the raw
//! source records (the same shape the backend returns). Searchers fall back
//! to it when the remote call fails.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::mapping::extract_list;
use crate::models::Category;

pub struct OfflineCache {
    dir: PathBuf,
}

impl OfflineCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, category: Category) -> PathBuf {
        self.dir.join(format!("{}.json", category.as_str()))
    }

    /// Cached records for `category`, or `None` if nothing usable is stored.
    pub fn load(&self, category: Category) -> Option<Vec<Value>> {
        let path = self.file_for(category);
        let raw = std::fs::read_to_string(&path).ok()?;
        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring corrupt cache file: {}", e);
                return None;
            }
        };
        extract_list(&parsed, category).ok()
    }

    /// Replace the cached records for `category`.
    pub fn store(&self, category: Category, records: &[Value]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir: {}", self.dir.display()))?;
        let path = self.file_for(category);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(records)?;
        std::fs::write(&tmp, body)
            .with_context(|| format!("Failed to write cache file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace cache file: {}", path.display()))?;
        Ok(())
    }

    /// Add `records` to the cached copy, replacing any cached record with the
    /// same `key` value (compared case-insensitively). Records without the
    /// key are appended.
    pub fn merge(&self, category: Category, records: &[Value], key: &str) -> Result<()> {
        let key_of = |v: &Value| v.get(key).and_then(Value::as_str).map(str::to_lowercase);
        let incoming: Vec<String> = records.iter().filter_map(key_of).collect();

        let mut merged: Vec<Value> = self
            .load(category)
            .unwrap_or_default()
            .into_iter()
            .filter(|v| key_of(v).map_or(true, |k| !incoming.contains(&k)))
            .collect();
        merged.extend(records.iter().cloned());
        self.store(category, &merged)
    }
}
