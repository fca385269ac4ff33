use crate::domain::paths;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub source: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    pub bytes: usize,
    pub fetched_at: DateTime<Utc>,
}

/// Record of what was downloaded, from where and when.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub async fn load<S: Storage>(storage: &S) -> Result<Self> {
        if !storage.exists(paths::MANIFEST).await {
            return Ok(Self::default());
        }
        let data = storage.read_file(paths::MANIFEST).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub async fn save<S: Storage>(&self, storage: &S) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        storage.write_file(paths::MANIFEST, &json).await
    }

    pub fn record(&mut self, name: impl Into<String>, entry: ManifestEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use tempfile::TempDir;

    fn entry(path: &str, rows: usize) -> ManifestEntry {
        ManifestEntry {
            source: "https://example.com/targets.csv".to_string(),
            path: path.to_string(),
            rows: Some(rows),
            bytes: 42,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_missing_manifest_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        let manifest = Manifest::load(&storage).await.unwrap();
        assert!(manifest.entries.is_empty());
    }

    #[tokio::test]
    async fn test_record_replaces_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        let mut manifest = Manifest::default();
        manifest.record("sector-5-targets", entry("tesstargets/a.csv", 10));
        manifest.record("sector-5-targets", entry("tesstargets/a.csv", 12));
        manifest.save(&storage).await.unwrap();

        let loaded = Manifest::load(&storage).await.unwrap();
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.get("sector-5-targets").unwrap().rows, Some(12));
        assert_eq!(loaded, manifest);
    }
}
