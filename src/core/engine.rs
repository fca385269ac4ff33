use crate::core::manifest::{Manifest, ManifestEntry};
use crate::domain::model::{Acquired, CacheStatus, Table};
use crate::domain::ports::{DataProduct, Storage};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use chrono::Utc;
use tokio::sync::Mutex;

/// Drives a [`DataProduct`] through cache lookup, download and storage.
pub struct AcquisitionEngine<S: Storage> {
    storage: S,
    force_redownload: bool,
    monitor: SystemMonitor,
    manifest_lock: Mutex<()>,
}

impl<S: Storage> AcquisitionEngine<S> {
    pub fn new(storage: S, force_redownload: bool) -> Self {
        Self::new_with_monitoring(storage, force_redownload, false)
    }

    pub fn new_with_monitoring(storage: S, force_redownload: bool, monitor_enabled: bool) -> Self {
        Self {
            storage,
            force_redownload,
            monitor: SystemMonitor::new(monitor_enabled),
            manifest_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn monitor(&self) -> &SystemMonitor {
        &self.monitor
    }

    pub async fn acquire<P: DataProduct + ?Sized>(&self, product: &P, force: bool) -> Result<Acquired> {
        let path = product.cache_path();
        let force = force || self.force_redownload;

        if !force && self.storage.exists(&path).await {
            tracing::debug!("{}: using cached {}", product.name(), self.storage.describe(&path));
            let cached = self.read_table(&path).await?;

            let acquired = match product.refresh(&cached).await? {
                Some(updated) => {
                    let bytes = self.write_table(&path, &updated).await?;
                    self.record(
                        product.name(),
                        ManifestEntry {
                            source: product.source(),
                            path: path.clone(),
                            rows: Some(updated.len()),
                            bytes,
                            fetched_at: Utc::now(),
                        },
                    )
                    .await?;
                    Acquired {
                        table: updated,
                        path,
                        status: CacheStatus::Refreshed,
                    }
                }
                None => Acquired {
                    table: cached,
                    path,
                    status: CacheStatus::Cached,
                },
            };
            return Ok(acquired);
        }

        let source = product.source();
        tracing::info!("Getting {} from {}", product.name(), source);
        let raw = product.extract().await?;
        tracing::debug!("{}: extracted {} rows", product.name(), raw.len());
        let table = product.transform(raw).await?;

        let bytes = self.write_table(&path, &table).await?;
        self.record(
            product.name(),
            ManifestEntry {
                source,
                path: path.clone(),
                rows: Some(table.len()),
                bytes,
                fetched_at: Utc::now(),
            },
        )
        .await?;

        tracing::info!(
            "Saved {} ({} rows) to {}",
            product.name(),
            table.len(),
            self.storage.describe(&path)
        );
        self.monitor.log_stats(&product.name());

        Ok(Acquired {
            table,
            path,
            status: CacheStatus::Downloaded,
        })
    }

    pub async fn read_table(&self, path: &str) -> Result<Table> {
        let data = self.storage.read_file(path).await?;
        Table::from_csv(&data)
    }

    /// Writes `table` as CSV and returns the number of bytes written.
    pub async fn write_table(&self, path: &str, table: &Table) -> Result<usize> {
        let data = table.to_csv()?;
        self.storage.write_file(path, &data).await?;
        Ok(data.len())
    }

    pub async fn record(&self, name: impl Into<String>, entry: ManifestEntry) -> Result<()> {
        let _guard = self.manifest_lock.lock().await;
        let mut manifest = Manifest::load(&self.storage).await?;
        manifest.record(name, entry);
        manifest.save(&self.storage).await
    }
}
