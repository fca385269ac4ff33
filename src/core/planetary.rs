use crate::adapters::http::HttpFetcher;
use crate::domain::model::{Endpoints, Table, ToiSource};
use crate::domain::paths;
use crate::domain::ports::DataProduct;
use crate::utils::error::Result;
use async_trait::async_trait;

/// TEV column headers and their Exoplanet Archive style short names.
pub const MIT_COLUMN_MAP: &[(&str, &str)] = &[
    ("Source Pipeline", "pipeline"),
    ("Full TOI ID", "toi_id"),
    ("TOI Disposition", "toi_pdisposition"),
    ("TIC Right Ascension", "tic_ra"),
    ("TIC Declination", "tic_dec"),
    ("TMag Value", "tmag"),
    ("TMag Uncertainty", "tmag_err"),
    ("Orbital Epoch Value", "epoch"),
    ("Orbital Epoch Error", "epoch_err"),
    ("Orbital Period Value", "toi_period"),
    ("Orbital Period Error", "toi_period_err"),
    ("Transit Duration Value", "toi_transit_dur"),
    ("Transit Duration Error", "toi_transit_dur_err"),
    ("Transit Depth Value", "toi_transit_depth"),
    ("Transit Depth Error", "toi_transit_depth_err"),
    ("Sectors", "sectors"),
    ("Public Comment", "comment"),
    ("Surface Gravity Value", "surface_grav"),
    ("Surface Gravity Uncertainty", "surface_grav_err"),
    ("Signal ID", "signal_id"),
    ("Star Radius Value", "srad"),
    ("Star Radius Error", "srad_err"),
    ("Planet Radius Value", "toi_prad"),
    ("Planet Radius Error", "toi_prad_err"),
    ("Planet Equilibrium Temperature (K) Value", "ptemp"),
    ("Effective Temperature Value", "steff"),
    ("Effective Temperature Uncertainty", "steff_err"),
    ("Effective Stellar Flux Value", "sflux"),
    ("Signal-to-noise", "snr"),
    ("Centroid Offset", "centroid_offset"),
    ("TFOP Master", "tfop_master"),
    ("TFOP SG1a", "tfop_sg1a"),
    ("TFOP SG1b", "tfop_sg1b"),
    ("TFOP SG2", "tfop_sg2"),
    ("TFOP SG3", "tfop_sg3"),
    ("TFOP SG4", "tfop_sg4"),
    ("TFOP SG5", "tfop_sg5"),
    ("Alerted", "alerted"),
    ("Updated", "updated"),
];

/// The full TESS Objects of Interest table from one of the public releases.
pub struct TessObjectsOfInterest<'a> {
    source: ToiSource,
    endpoints: &'a Endpoints,
    http: &'a HttpFetcher,
}

impl<'a> TessObjectsOfInterest<'a> {
    pub fn new(source: ToiSource, endpoints: &'a Endpoints, http: &'a HttpFetcher) -> Self {
        Self {
            source,
            endpoints,
            http,
        }
    }
}

#[async_trait]
impl DataProduct for TessObjectsOfInterest<'_> {
    fn name(&self) -> String {
        format!("toi-{}", self.source)
    }

    fn source(&self) -> String {
        self.endpoints.toi_url(self.source).to_string()
    }

    fn cache_path(&self) -> String {
        paths::toi_catalog(self.source)
    }

    async fn extract(&self) -> Result<Table> {
        let body = self.http.get_ok(self.endpoints.toi_url(self.source)).await?;
        Table::from_csv(&body)
    }

    async fn transform(&self, mut table: Table) -> Result<Table> {
        if self.source == ToiSource::Mit {
            table.rename(MIT_COLUMN_MAP);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::AcquisitionEngine;
    use crate::core::testing::MockStorage;
    use crate::domain::model::{CacheStatus, RequestSettings};
    use crate::utils::error::FetchError;
    use httpmock::prelude::*;

    fn http() -> HttpFetcher {
        HttpFetcher::new(&RequestSettings {
            timeout_seconds: 5,
            retry_attempts: 0,
            retry_delay_ms: 0,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_mit_columns_are_renamed() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/data/collection/193/csv/6/");
                then.status(200).body(
                    "Full TOI ID,TIC,Orbital Period Value,Planet Radius Value,TFOP SG1a\n101.01,231663901,1.43,13.3,PC\n",
                );
            })
            .await;
        let endpoints = Endpoints::with_base(&server.base_url());
        let http = http();
        let storage = MockStorage::new();
        let engine = AcquisitionEngine::new(storage.clone(), false);

        let product = TessObjectsOfInterest::new(ToiSource::Mit, &endpoints, &http);
        let acquired = engine.acquire(&product, false).await.unwrap();

        mock.assert_async().await;
        assert_eq!(acquired.path, "toi/toi_catalog_mit.csv");
        assert_eq!(
            acquired.table.headers(),
            &["toi_id", "TIC", "toi_period", "toi_prad", "tfop_sg1a"]
        );
        assert!(storage.get_file("toi/toi_catalog_mit.csv").await.is_some());
    }

    #[tokio::test]
    async fn test_caltech_table_kept_as_is_and_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/cgi-bin/nstedAPI/nph-nstedAPI")
                    .query_param("table", "toi");
                then.status(200)
                    .body("# Exoplanet Archive TOI table\ntoi,tid,pl_orbper\n101.01,231663901,1.43\n");
            })
            .await;
        let endpoints = Endpoints::with_base(&server.base_url());
        let http = http();
        let storage = MockStorage::new();
        let engine = AcquisitionEngine::new(storage.clone(), false);
        let product = TessObjectsOfInterest::new(ToiSource::Caltech, &endpoints, &http);

        let first = engine.acquire(&product, false).await.unwrap();
        let second = engine.acquire(&product, false).await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(first.table.headers(), &["toi", "tid", "pl_orbper"]);
        assert_eq!(second.status, CacheStatus::Cached);
        assert_eq!(second.table, first.table);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/data/collection/193/csv/6/");
                then.status(404);
            })
            .await;
        let endpoints = Endpoints::with_base(&server.base_url());
        let http = http();
        let engine = AcquisitionEngine::new(MockStorage::new(), false);

        let product = TessObjectsOfInterest::new(ToiSource::Mit, &endpoints, &http);
        let err = engine.acquire(&product, false).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
    }
}
