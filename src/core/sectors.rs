use crate::adapters::http::HttpFetcher;
use crate::domain::model::{Endpoints, SectorCount};
use crate::utils::error::Result;

/// Upper bound on probing, in case a mirror answers 200 for every URL.
pub const MAX_PROBED_SECTORS: u32 = 1000;

/// Counts how many consecutive sectors, starting from 1, have a published
/// target list.
pub async fn probe_available_sectors(http: &HttpFetcher, endpoints: &Endpoints) -> Result<u32> {
    let mut available = 0;
    while available < MAX_PROBED_SECTORS {
        let sector = available + 1;
        let url = endpoints.sector_pointings_url(sector);
        let payload = http.get(&url).await?;
        tracing::debug!("Sector {} probe: HTTP {}", sector, payload.status.as_u16());
        if !payload.status.is_success() {
            break;
        }
        available = sector;
    }
    Ok(available)
}

/// Compares the configured sector count against what the archive publishes.
pub async fn check_num_tess_sectors(
    http: &HttpFetcher,
    endpoints: &Endpoints,
    configured: u32,
) -> Result<SectorCount> {
    let available = probe_available_sectors(http, endpoints).await?;
    let count = SectorCount {
        configured,
        available,
    };

    if count.is_current() {
        tracing::info!("All {} configured sectors are available", configured);
    } else {
        tracing::warn!(
            "num_sectors is set to {}, but data was found for {} sectors: update num_sectors for the full data",
            configured,
            available
        );
    }
    Ok(count)
}
