pub mod archive;
pub mod catalog;
pub mod engine;
pub mod ffi;
pub mod manifest;
pub mod planetary;
pub mod sectors;
pub mod stellar;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{Acquired, CacheStatus, Table};
pub use crate::domain::ports::{CatalogService, ConfigProvider, DataProduct, Storage};
pub use crate::utils::error::Result;
