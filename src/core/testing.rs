//! In-memory doubles shared by the core unit tests.

use crate::domain::model::{Endpoints, RequestSettings, Table};
use crate::domain::ports::{CatalogService, ConfigProvider, Storage};
use crate::utils::error::{FetchError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(path).cloned()
    }

    pub async fn get_table(&self, path: &str) -> Option<Table> {
        let data = self.get_file(path).await?;
        Table::from_csv(&data).ok()
    }

    pub async fn put(&self, path: &str, data: &[u8]) {
        self.files
            .lock()
            .await
            .insert(path.to_string(), data.to_vec());
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            FetchError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.put(path, data).await;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.files.lock().await.contains_key(path)
    }

    fn describe(&self, path: &str) -> String {
        format!("memory://{}", path)
    }
}

/// Answers TIC queries from a fixed table and counts calls.
pub struct MockCatalog {
    rows: Table,
    pub calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new(csv: &str) -> Self {
        Self {
            rows: Table::from_csv(csv.as_bytes()).unwrap(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogService for MockCatalog {
    async fn query_tic(&self, ticids: &[String]) -> Result<Table> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let wanted = Table::from_rows(
            vec!["ID".to_string()],
            ticids.iter().map(|id| vec![id.clone()]).collect(),
        )?;
        // Same row order as the fixture, like a real catalog scan.
        let mut found = self.rows.inner_join(&wanted, "ID", "ID")?;
        found.dedup_by("ID")?;
        Ok(found)
    }
}

pub struct MockConfig {
    pub endpoints: Endpoints,
    pub num_sectors: u32,
    pub force_redownload: bool,
    pub settings: RequestSettings,
}

impl MockConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoints: Endpoints::with_base(base_url),
            num_sectors: 3,
            force_redownload: false,
            settings: RequestSettings {
                timeout_seconds: 5,
                retry_attempts: 0,
                retry_delay_ms: 0,
            },
        }
    }
}

impl ConfigProvider for MockConfig {
    fn data_path(&self) -> &str {
        "memory"
    }

    fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    fn force_redownload(&self) -> bool {
        self.force_redownload
    }

    fn concurrent_requests(&self) -> usize {
        2
    }

    fn catalog_batch_size(&self) -> usize {
        100
    }

    fn request_settings(&self) -> &RequestSettings {
        &self.settings
    }
}
