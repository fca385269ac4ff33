use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Storage rooted at the configured data path.
    pub fn from_config<P: ConfigProvider>(config: &P) -> Self {
        Self::new(config.data_path())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Creates the data root if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        if !self.base_path.is_dir() {
            tracing::info!("Making data path at {}", self.base_path.display());
            fs::create_dir_all(&self.base_path)?;
        }
        Ok(())
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.full_path(path))?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }

    fn describe(&self, path: &str) -> String {
        self.full_path(path).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().join("data"));

        assert!(!storage.exists("toi/toi_catalog_mit.csv").await);
        storage
            .write_file("toi/toi_catalog_mit.csv", b"toi_id\n101.01\n")
            .await
            .unwrap();

        assert!(storage.exists("toi/toi_catalog_mit.csv").await);
        assert_eq!(
            storage.read_file("toi/toi_catalog_mit.csv").await.unwrap(),
            b"toi_id\n101.01\n"
        );
    }

    #[test]
    fn test_rooted_at_configured_data_path() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tess");
        let config = crate::config::FetchConfig {
            data_path: root.to_string_lossy().into_owned(),
            ..Default::default()
        };

        let storage = LocalStorage::from_config(&config);

        assert_eq!(storage.base_path(), root.as_path());
        assert_eq!(
            storage.describe("toi/toi_catalog_mit.csv"),
            root.join("toi/toi_catalog_mit.csv").display().to_string()
        );
    }

    #[test]
    fn test_ensure_root() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().join("nested").join("data"));
        storage.ensure_root().unwrap();
        assert!(storage.base_path().is_dir());
        // idempotent
        storage.ensure_root().unwrap();
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        let err = storage.read_file("manifest.json").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::FetchError::IoError(_)));
    }
}
