//! Storage-relative locations of every product under the data root.

use crate::domain::model::ToiSource;

pub const MANIFEST: &str = "manifest.json";
pub const STELLAR_CATALOG: &str = "tesstargets/TESS_stellar_catalog.csv";

pub fn sector_targets(sector: u32) -> String {
    format!("tesstargets/TESS_targets_S{:03}.csv", sector)
}

pub fn sector_noise(sector: u32) -> String {
    format!("tess_photometric_noise/TESS_noise_S{:03}.csv", sector)
}

pub fn toi_catalog(source: ToiSource) -> String {
    format!("toi/toi_catalog_{}.csv", source)
}

pub fn ffi_archive(label: &str) -> String {
    format!("ffi/{}.zip", label)
}

pub fn ffi_file(label: &str, name: &str) -> String {
    format!("ffi/{}/{}", label, name)
}
