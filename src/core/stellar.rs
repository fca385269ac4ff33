use crate::adapters::http::HttpFetcher;
use crate::domain::model::{Endpoints, Table};
use crate::domain::paths;
use crate::domain::ports::{CatalogService, DataProduct, Storage};
use crate::utils::error::{FetchError, Result};
use async_trait::async_trait;

/// Columns kept from the sector target list; MAST has Tmag, RA and Dec at
/// higher precision.
const OBSERVATION_COLUMNS: [&str; 3] = ["TICID", "Camera", "CCD"];

/// TIC parameters for every star observed in one sector, joined with the
/// camera/CCD pointing and, when available locally, photometric noise.
pub struct SectorTargets<'a, S: Storage, C: CatalogService> {
    sector: u32,
    endpoints: &'a Endpoints,
    http: &'a HttpFetcher,
    catalog: &'a C,
    storage: &'a S,
}

impl<'a, S: Storage, C: CatalogService> SectorTargets<'a, S, C> {
    pub fn new(
        sector: u32,
        endpoints: &'a Endpoints,
        http: &'a HttpFetcher,
        catalog: &'a C,
        storage: &'a S,
    ) -> Self {
        Self {
            sector,
            endpoints,
            http,
            catalog,
            storage,
        }
    }

    /// Noise values (`ID`, `noise`) for this sector, if the user has placed
    /// a noise file under the data root.
    async fn load_noise(&self) -> Result<Option<Table>> {
        let path = paths::sector_noise(self.sector);
        if !self.storage.exists(&path).await {
            return Ok(None);
        }
        let data = self.storage.read_file(&path).await?;
        let noise = Table::from_csv(&data)?.select(&["ID", "noise"])?;
        Ok(Some(noise))
    }
}

#[async_trait]
impl<S: Storage, C: CatalogService> DataProduct for SectorTargets<'_, S, C> {
    fn name(&self) -> String {
        format!("sector-{}-targets", self.sector)
    }

    fn source(&self) -> String {
        self.endpoints.sector_pointings_url(self.sector)
    }

    fn cache_path(&self) -> String {
        paths::sector_targets(self.sector)
    }

    async fn extract(&self) -> Result<Table> {
        let url = self.source();
        let body = self.http.get_ok(&url).await.map_err(|e| match e {
            FetchError::HttpStatus { .. } => FetchError::SectorUnavailable {
                sector: self.sector,
            },
            other => other,
        })?;

        Table::from_csv(&body)?.select(&OBSERVATION_COLUMNS)
    }

    async fn transform(&self, observations: Table) -> Result<Table> {
        let ticids: Vec<String> = observations
            .column("TICID")?
            .into_iter()
            .map(str::to_string)
            .collect();

        tracing::info!(
            "Querying MAST for {} sector {} observed targets",
            ticids.len(),
            self.sector
        );
        let tic = self.catalog.query_tic(&ticids).await?;

        let mut merged = tic.inner_join(&observations, "ID", "TICID")?;
        merged.drop_column("TICID");

        match self.load_noise().await? {
            Some(noise) => {
                merged = merged.inner_join(&noise, "ID", "ID")?;
            }
            None => tracing::warn!(
                "Noise values not found at {}: place the sector noise file there to include them",
                self.storage.describe(&paths::sector_noise(self.sector))
            ),
        }

        merged.rename(&[("ID", "ticid")]);
        Ok(merged)
    }

    async fn refresh(&self, cached: &Table) -> Result<Option<Table>> {
        if cached.has_column("noise") {
            return Ok(None);
        }
        let Some(noise) = self.load_noise().await? else {
            return Ok(None);
        };

        let mut updated = cached.inner_join(&noise, "ticid", "ID")?;
        updated.drop_column("ID");
        tracing::info!(
            "Added photometric noise values to sector {} targets",
            self.sector
        );
        Ok(Some(updated))
    }
}
