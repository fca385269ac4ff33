use crate::adapters::http::HttpFetcher;
use crate::adapters::mast::MastCatalog;
use crate::core::catalog::merge_sector_tables;
use crate::core::engine::AcquisitionEngine;
use crate::core::ffi;
use crate::core::planetary::TessObjectsOfInterest;
use crate::core::sectors;
use crate::core::stellar::SectorTargets;
use crate::domain::model::{
    Acquired, CutoutRequest, CutoutTarget, Endpoints, SectorCount, SectorSelection, Table,
    ToiSource,
};
use crate::domain::paths;
use crate::domain::ports::{CatalogService, ConfigProvider, Storage};
use crate::utils::error::Result;
use crate::utils::validation::Validate;

/// Entry point for every download the tool offers.
pub struct TessArchive<S: Storage, C: CatalogService> {
    engine: AcquisitionEngine<S>,
    http: HttpFetcher,
    catalog: C,
    endpoints: Endpoints,
    num_sectors: u32,
}

impl<S: Storage> TessArchive<S, MastCatalog> {
    /// Wires the archive to MAST using `config`.
    pub fn from_config<P: ConfigProvider>(config: &P, storage: S, monitor: bool) -> Result<Self> {
        let http = HttpFetcher::new(config.request_settings())?;
        let catalog = MastCatalog::new(
            http.clone(),
            config.endpoints().mast_invoke.clone(),
            config.catalog_batch_size(),
            config.concurrent_requests(),
        );
        let engine =
            AcquisitionEngine::new_with_monitoring(storage, config.force_redownload(), monitor);

        Ok(Self::new(
            engine,
            http,
            catalog,
            config.endpoints().clone(),
            config.num_sectors(),
        ))
    }
}

impl<S: Storage, C: CatalogService> TessArchive<S, C> {
    pub fn new(
        engine: AcquisitionEngine<S>,
        http: HttpFetcher,
        catalog: C,
        endpoints: Endpoints,
        num_sectors: u32,
    ) -> Self {
        Self {
            engine,
            http,
            catalog,
            endpoints,
            num_sectors,
        }
    }

    pub fn engine(&self) -> &AcquisitionEngine<S> {
        &self.engine
    }

    pub fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    /// Stellar parameters for every star observed in `sector`.
    pub async fn stars_from_sector(&self, sector: u32, force: bool) -> Result<Acquired> {
        SectorSelection::Single(sector).resolve(self.num_sectors)?;
        let product = SectorTargets::new(
            sector,
            &self.endpoints,
            &self.http,
            &self.catalog,
            self.engine.storage(),
        );
        self.engine.acquire(&product, force).await
    }

    pub async fn stars_from_sectors(
        &self,
        selection: &SectorSelection,
        force: bool,
    ) -> Result<Vec<Acquired>> {
        let sectors = selection.resolve(self.num_sectors)?;
        let mut acquired = Vec::with_capacity(sectors.len());

        for sector in sectors {
            tracing::info!("Getting data from TESS sector {}", sector);
            match self.stars_from_sector(sector, force).await {
                Ok(result) => acquired.push(result),
                Err(e) => {
                    if *selection == SectorSelection::All {
                        tracing::warn!(
                            "Possibly requesting data from a nonexistent sector: run `tess-fetch check-sectors` to ensure data exists"
                        );
                    }
                    return Err(e);
                }
            }
        }
        Ok(acquired)
    }

    /// All requested sectors merged into one catalog. `sectors` defaults
    /// to every configured sector.
    pub async fn stellar_catalog(
        &self,
        sectors: Option<&[u32]>,
        unique: bool,
        force: bool,
    ) -> Result<Table> {
        let selection = match sectors {
            Some(list) => SectorSelection::List(list.to_vec()),
            None => SectorSelection::All,
        };

        let tables: Vec<(u32, Table)> = self
            .stars_from_sectors(&selection, force)
            .await?
            .into_iter()
            .zip(selection.resolve(self.num_sectors)?)
            .map(|(acquired, sector)| (sector, acquired.table))
            .collect();

        let catalog = merge_sector_tables(&tables, unique)?;
        tracing::info!(
            "Stellar catalog has {} rows from {} sector(s)",
            catalog.len(),
            tables.len()
        );
        Ok(catalog)
    }

    /// Writes a merged catalog to its standard location and returns the path.
    pub async fn save_stellar_catalog(&self, catalog: &Table) -> Result<String> {
        self.engine
            .write_table(paths::STELLAR_CATALOG, catalog)
            .await?;
        Ok(self.engine.storage().describe(paths::STELLAR_CATALOG))
    }

    pub async fn tois(&self, source: ToiSource, force: bool) -> Result<Acquired> {
        let product = TessObjectsOfInterest::new(source, &self.endpoints, &self.http);
        self.engine.acquire(&product, force).await
    }

    pub async fn check_sectors(&self) -> Result<SectorCount> {
        sectors::check_num_tess_sectors(&self.http, &self.endpoints, self.num_sectors).await
    }

    pub async fn ffi_cutouts(&self, request: &CutoutRequest, force: bool) -> Result<Vec<String>> {
        request.validate()?;

        let coords = match request.target {
            CutoutTarget::Coordinates { ra, dec } => (ra, dec),
            CutoutTarget::Tic(ticid) => {
                let search: Vec<u32> = match request.sector {
                    Some(sector) => vec![sector],
                    None => (1..=self.num_sectors).collect(),
                };
                ffi::locate_target(self.engine.storage(), &search, ticid).await?
            }
        };

        ffi::fetch_cutouts(
            &self.engine,
            &self.http,
            &self.endpoints,
            request,
            coords,
            force,
        )
        .await
    }
}
