use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::now_utc_iso;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedText {
    pub text: String,
    pub model: String,
    pub provider: String,
    #[serde(default)]
    pub cached_at: String,
}

impl CachedText {
    pub fn new(
        text: impl Into<String>,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            provider: provider.into(),
            cached_at: now_utc_iso(),
        }
    }
}

/// JSON-object file of generated texts keyed by request hash.
///
/// Reads go to disk every time and writes merge into whatever is on disk, so two
/// sessions sharing a cache file never drop each other's entries.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    path: PathBuf,
}

impl ResponseCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<CachedText> {
        let payload = read_json_object(&self.path)?;
        serde_json::from_value(payload.get(key)?.clone()).ok()
    }

    pub fn put(&self, key: &str, entry: &CachedText) -> anyhow::Result<()> {
        let mut on_disk = read_json_object(&self.path).unwrap_or_default();
        let snapshot = serde_json::to_value(entry)?;
        if on_disk.get(key) == Some(&snapshot) {
            return Ok(());
        }
        on_disk.insert(key.to_string(), snapshot);
        write_json_object(&self.path, &on_disk)
    }

    pub fn len(&self) -> usize {
        read_json_object(&self.path)
            .map(|payload| payload.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    parsed.as_object().cloned()
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(payload)?)
        .with_context(|| format!("failed writing cache {}", path.display()))?;
    Ok(())
}
