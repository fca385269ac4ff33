//! Full-frame image cutouts from TESScut.
//!
//! TESScut answers with a zip holding one FITS file per sector. The zip is
//! kept as the cache entry and its files are unpacked next to it.

use crate::adapters::http::HttpFetcher;
use crate::core::engine::AcquisitionEngine;
use crate::core::manifest::ManifestEntry;
use crate::domain::model::{normalize_key, CutoutRequest, CutoutTarget, Endpoints, Table};
use crate::domain::paths;
use crate::domain::ports::Storage;
use crate::utils::error::{FetchError, Result};
use crate::utils::validation::{validate_range, Validate};
use chrono::Utc;
use std::io::{Cursor, Read};

pub const MAX_CUTOUT_SIZE: u32 = 100;

impl Validate for CutoutRequest {
    fn validate(&self) -> Result<()> {
        if let CutoutTarget::Coordinates { ra, dec } = self.target {
            validate_range("ra", ra, 0.0, 360.0)?;
            validate_range("dec", dec, -90.0, 90.0)?;
        }
        validate_range("size", self.size, 1, MAX_CUTOUT_SIZE)?;
        if self.sector == Some(0) {
            return Err(FetchError::InvalidConfigValueError {
                field: "sector".to_string(),
                value: "0".to_string(),
                reason: "TESS sectors are numbered from 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Finds a star's `ra`/`dec` in cached sector target tables, searching the
/// given sectors in order.
pub async fn locate_target<S: Storage>(
    storage: &S,
    sectors: &[u32],
    ticid: u64,
) -> Result<(f64, f64)> {
    let wanted = ticid.to_string();
    for &sector in sectors {
        let path = paths::sector_targets(sector);
        if !storage.exists(&path).await {
            continue;
        }
        let table = Table::from_csv(&storage.read_file(&path).await?)?;
        if let Some(coords) = coordinates_in(&table, &wanted)? {
            tracing::debug!("TIC {} found in sector {} targets", ticid, sector);
            return Ok(coords);
        }
    }

    Err(FetchError::TargetNotFound {
        target: format!("TIC {}", ticid),
    })
}

fn coordinates_in(table: &Table, ticid: &str) -> Result<Option<(f64, f64)>> {
    let ticids = table.column("ticid")?;
    let Some(row) = ticids.iter().position(|id| normalize_key(id) == ticid) else {
        return Ok(None);
    };

    let parse = |column: &str| -> Result<f64> {
        let raw = table.value(row, column).ok_or_else(|| FetchError::MissingColumn {
            column: column.to_string(),
            context: "sector targets".to_string(),
        })?;
        raw.trim()
            .parse::<f64>()
            .map_err(|e| FetchError::InvalidTable {
                message: format!("bad {} value '{}' for TIC {}: {}", column, raw, ticid, e),
            })
    };

    Ok(Some((parse("ra")?, parse("dec")?)))
}

/// Downloads (or reuses) the cutout archive and unpacks its files.
/// Returns the storage paths of the unpacked files.
pub async fn fetch_cutouts<S: Storage>(
    engine: &AcquisitionEngine<S>,
    http: &HttpFetcher,
    endpoints: &Endpoints,
    request: &CutoutRequest,
    (ra, dec): (f64, f64),
    force: bool,
) -> Result<Vec<String>> {
    let label = request.label();
    let archive_path = paths::ffi_archive(&label);
    let storage = engine.storage();

    let files = if !force && storage.exists(&archive_path).await {
        tracing::info!("Using cached cutout archive {}", storage.describe(&archive_path));
        unpack(&storage.read_file(&archive_path).await?)?
    } else {
        let mut query = vec![
            ("ra", ra.to_string()),
            ("dec", dec.to_string()),
            ("y", request.size.to_string()),
            ("x", request.size.to_string()),
        ];
        if let Some(sector) = request.sector {
            query.push(("sector", sector.to_string()));
        }

        tracing::info!(
            "Requesting {}x{} pixel cutout at ra={}, dec={} from {}",
            request.size,
            request.size,
            ra,
            dec,
            endpoints.tesscut
        );
        let body = http.get_ok_with_query(&endpoints.tesscut, &query).await?;
        // only a readable archive becomes the cache entry
        let files = unpack(&body)?;
        storage.write_file(&archive_path, &body).await?;
        engine
            .record(
                format!("ffi-{}", label),
                ManifestEntry {
                    source: endpoints.tesscut.clone(),
                    path: archive_path.clone(),
                    rows: None,
                    bytes: body.len(),
                    fetched_at: Utc::now(),
                },
            )
            .await?;
        files
    };

    let mut written = Vec::new();
    for (name, data) in files {
        let path = paths::ffi_file(&label, &name);
        storage.write_file(&path, &data).await?;
        written.push(path);
    }

    if written.is_empty() {
        tracing::warn!("Cutout archive for {} contained no files", label);
    } else {
        tracing::info!("Saved {} cutout file(s) for {}", written.len(), label);
    }
    Ok(written)
}

/// Reads every file entry of a zip, flattened to its base name.
pub fn unpack(archive: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    let mut files = Vec::with_capacity(zip.len());

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        else {
            tracing::warn!("Skipping cutout entry with unsafe name: {}", entry.name());
            continue;
        };

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        files.push((name, data));
    }

    Ok(files)
}
