use crate::config::toml_config::FetchConfig;
use crate::domain::model::{CutoutRequest, CutoutTarget, SectorSelection, ToiSource};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "tess-fetch")]
#[command(version, about = "Download TESS stellar parameters, TOI catalogs and FFI cutouts")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory for downloaded data (overrides the config file)
    #[arg(long, global = true)]
    pub data_path: Option<String>,

    /// Ignore cached files and download again
    #[arg(long, global = true)]
    pub force_redownload: bool,

    #[arg(long, global = true)]
    pub num_sectors: Option<u32>,

    #[arg(long, global = true)]
    pub concurrent_requests: Option<usize>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Log process CPU and memory after each download
    #[arg(long, global = true)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stellar parameters for the stars observed in one or more sectors
    Stars(StarsArgs),

    /// Merge sector target tables into one stellar catalog
    Catalog {
        /// Sectors to merge (default: every configured sector)
        #[arg(long, value_delimiter = ',')]
        sectors: Vec<u32>,

        /// Keep one row per (star, sector) instead of one row per star
        #[arg(long)]
        keep_duplicates: bool,
    },

    /// TESS Objects of Interest table
    Tois {
        /// caltech (NASA Exoplanet Archive) or mit (TEV)
        #[arg(long)]
        source: Option<ToiSource>,
    },

    /// Compare the configured sector count with the published target lists
    CheckSectors,

    /// Full-frame image cutouts from TESScut
    Ffi(FfiArgs),
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct StarsArgs {
    #[arg(long)]
    pub sector: Option<u32>,

    #[arg(long, value_delimiter = ',')]
    pub sectors: Option<Vec<u32>>,

    /// Every configured sector
    #[arg(long)]
    pub all: bool,
}

impl StarsArgs {
    pub fn selection(&self) -> SectorSelection {
        match (&self.sector, &self.sectors) {
            (Some(s), _) => SectorSelection::Single(*s),
            (None, Some(list)) => SectorSelection::List(list.clone()),
            (None, None) => SectorSelection::All,
        }
    }
}

#[derive(Debug, Args)]
pub struct FfiArgs {
    /// Resolve coordinates from cached sector target tables
    #[arg(long, conflicts_with_all = ["ra", "dec"], required_unless_present_all = ["ra", "dec"])]
    pub ticid: Option<u64>,

    /// Right ascension in degrees
    #[arg(long, requires = "dec", allow_negative_numbers = true)]
    pub ra: Option<f64>,

    /// Declination in degrees
    #[arg(long, requires = "ra", allow_negative_numbers = true)]
    pub dec: Option<f64>,

    #[arg(long)]
    pub sector: Option<u32>,

    /// Cutout edge length in pixels
    #[arg(long, default_value_t = CutoutRequest::DEFAULT_SIZE)]
    pub size: u32,
}

impl FfiArgs {
    pub fn to_request(&self) -> Result<CutoutRequest> {
        let target = match (self.ticid, self.ra, self.dec) {
            (Some(ticid), _, _) => CutoutTarget::Tic(ticid),
            (None, Some(ra), Some(dec)) => CutoutTarget::Coordinates { ra, dec },
            _ => {
                return Err(crate::utils::error::FetchError::MissingConfigError {
                    field: "--ticid or --ra/--dec".to_string(),
                })
            }
        };

        let request = CutoutRequest {
            target,
            size: self.size,
            sector: self.sector,
        };
        request.validate()?;
        Ok(request)
    }
}

impl Cli {
    /// The config file (or defaults) with command line overrides applied.
    pub fn load_config(&self) -> Result<FetchConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path.display());
                FetchConfig::from_file(path)?
            }
            None => FetchConfig::default(),
        };

        if let Some(data_path) = &self.data_path {
            config.data_path = data_path.clone();
        }
        if self.force_redownload {
            config.force_redownload = true;
        }
        if let Some(num_sectors) = self.num_sectors {
            config.num_sectors = num_sectors;
        }
        if let Some(concurrent) = self.concurrent_requests {
            config.concurrent_requests = concurrent;
        }

        config.validate()?;
        Ok(config)
    }
}
