use crate::domain::model::{Endpoints, RequestSettings, Table};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Byte storage rooted at the data directory. Paths are relative to that root.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    /// Human-readable location of `path`, for log messages and reports.
    fn describe(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn data_path(&self) -> &str;
    fn endpoints(&self) -> &Endpoints;
    fn num_sectors(&self) -> u32;
    fn force_redownload(&self) -> bool;
    fn concurrent_requests(&self) -> usize;
    fn catalog_batch_size(&self) -> usize;
    fn request_settings(&self) -> &RequestSettings;
}

/// A remote stellar catalog that can be queried by TIC ID.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn query_tic(&self, ticids: &[String]) -> Result<Table>;
}

/// A remote table that is fetched once and then served from the local cache.
#[async_trait]
pub trait DataProduct: Send + Sync {
    /// Key used in the download manifest.
    fn name(&self) -> String;
    /// Where the product comes from, for logs and the manifest.
    fn source(&self) -> String;
    fn cache_path(&self) -> String;

    async fn extract(&self) -> Result<Table>;

    async fn transform(&self, table: Table) -> Result<Table> {
        Ok(table)
    }

    /// Gives a cached product the chance to pick up local additions.
    /// `Some` means the cache should be rewritten with the returned table.
    async fn refresh(&self, _cached: &Table) -> Result<Option<Table>> {
        Ok(None)
    }
}
