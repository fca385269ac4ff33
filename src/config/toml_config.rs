use crate::domain::model::{Endpoints, RequestSettings, ToiSource};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{FetchError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of TESS sectors with published target lists when this default was set.
pub const DEFAULT_NUM_SECTORS: u32 = 27;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Root directory all products are written under.
    pub data_path: String,
    pub num_sectors: u32,
    /// Ignore cached files and download everything again, e.g. after a new TOI release.
    pub force_redownload: bool,
    pub concurrent_requests: usize,
    /// TIC IDs per MAST request.
    pub catalog_batch_size: usize,
    pub toi_source: ToiSource,
    pub endpoints: Endpoints,
    pub request: RequestSettings,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            data_path: "./data".to_string(),
            num_sectors: DEFAULT_NUM_SECTORS,
            force_redownload: false,
            concurrent_requests: 5,
            catalog_batch_size: 500,
            toi_source: ToiSource::default(),
            endpoints: Endpoints::default(),
            request: RequestSettings::default(),
        }
    }
}

impl FetchConfig {
    /// Loads a configuration file; every field is optional.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FetchError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FetchError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FetchError::ConfigError {
            message: format!("environment substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("data_path", &self.data_path)?;

        validation::validate_url("endpoints.sector_pointings", &self.endpoints.sector_pointings)?;
        validation::validate_placeholder(
            "endpoints.sector_pointings",
            &self.endpoints.sector_pointings,
            "{sector}",
        )?;
        validation::validate_url("endpoints.toi_caltech", &self.endpoints.toi_caltech)?;
        validation::validate_url("endpoints.toi_mit", &self.endpoints.toi_mit)?;
        validation::validate_url("endpoints.mast_invoke", &self.endpoints.mast_invoke)?;
        validation::validate_url("endpoints.tesscut", &self.endpoints.tesscut)?;

        validation::validate_positive_number("num_sectors", self.num_sectors as usize, 1)?;
        validation::validate_positive_number("concurrent_requests", self.concurrent_requests, 1)?;
        validation::validate_positive_number("catalog_batch_size", self.catalog_batch_size, 1)?;
        validation::validate_positive_number(
            "request.timeout_seconds",
            self.request.timeout_seconds as usize,
            1,
        )?;

        Ok(())
    }
}

impl ConfigProvider for FetchConfig {
    fn data_path(&self) -> &str {
        &self.data_path
    }

    fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    fn force_redownload(&self) -> bool {
        self.force_redownload
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }

    fn catalog_batch_size(&self) -> usize {
        self.catalog_batch_size
    }

    fn request_settings(&self) -> &RequestSettings {
        &self.request
    }
}

impl Validate for FetchConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
