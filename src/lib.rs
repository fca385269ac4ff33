pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;

pub use adapters::{http::HttpFetcher, mast::MastCatalog, storage::LocalStorage};
pub use config::FetchConfig;
pub use crate::core::{archive::TessArchive, engine::AcquisitionEngine};
pub use domain::model::{
    Acquired, CacheStatus, CutoutRequest, CutoutTarget, SectorSelection, Table, ToiSource,
};
pub use utils::error::{FetchError, Result};
