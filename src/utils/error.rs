use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Data from sector {sector} is not available")]
    SectorUnavailable { sector: u32 },

    #[error("Catalog query failed: {message}")]
    CatalogError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Column '{column}' missing from {context}")]
    MissingColumn { column: String, context: String },

    #[error("Malformed table: {message}")]
    InvalidTable { message: String },

    #[error("Target {target} not found in cached sector tables")]
    TargetNotFound { target: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FetchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FetchError::ApiError(_)
            | FetchError::HttpStatus { .. }
            | FetchError::SectorUnavailable { .. }
            | FetchError::CatalogError { .. } => ErrorCategory::Network,
            FetchError::CsvError(_)
            | FetchError::SerializationError(_)
            | FetchError::MissingColumn { .. }
            | FetchError::InvalidTable { .. }
            | FetchError::TargetNotFound { .. } => ErrorCategory::Data,
            FetchError::IoError(_) | FetchError::ZipError(_) => ErrorCategory::Storage,
            FetchError::ConfigError { .. }
            | FetchError::InvalidConfigValueError { .. }
            | FetchError::MissingConfigError { .. }
            | FetchError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FetchError::ApiError(_)
            | FetchError::HttpStatus { .. }
            | FetchError::CatalogError { .. } => ErrorSeverity::Medium,
            FetchError::SectorUnavailable { .. }
            | FetchError::TargetNotFound { .. }
            | FetchError::CsvError(_)
            | FetchError::SerializationError(_)
            | FetchError::MissingColumn { .. }
            | FetchError::InvalidTable { .. }
            | FetchError::ZipError(_) => ErrorSeverity::High,
            FetchError::IoError(_)
            | FetchError::ConfigError { .. }
            | FetchError::InvalidConfigValueError { .. }
            | FetchError::MissingConfigError { .. }
            | FetchError::ConfigValidationError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::ApiError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchError::HttpStatus { status, .. } => {
                matches!(status, 408 | 429) || (500..=599).contains(status)
            }
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            FetchError::ApiError(_) | FetchError::HttpStatus { .. } => {
                "Check your network connection and that the archive is reachable, then retry"
                    .to_string()
            }
            FetchError::SectorUnavailable { .. } => {
                "The sector may not be released yet: run `tess-fetch check-sectors` to see which sectors exist"
                    .to_string()
            }
            FetchError::CatalogError { .. } => {
                "MAST may be overloaded: lower --concurrent-requests or the catalog batch size and retry"
                    .to_string()
            }
            FetchError::CsvError(_)
            | FetchError::SerializationError(_)
            | FetchError::InvalidTable { .. } => {
                "The cached file may be corrupt: rerun with --force-redownload".to_string()
            }
            FetchError::MissingColumn { column, .. } => format!(
                "The upstream table no longer has '{}': check whether the archive changed its format",
                column
            ),
            FetchError::TargetNotFound { .. } => {
                "Download the sector target list first with `tess-fetch stars`, or pass --ra/--dec"
                    .to_string()
            }
            FetchError::IoError(_) => {
                "Check that the data path exists and is writable".to_string()
            }
            FetchError::ZipError(_) => {
                "The cutout archive is incomplete: rerun with --force-redownload".to_string()
            }
            FetchError::ConfigError { .. }
            | FetchError::InvalidConfigValueError { .. }
            | FetchError::MissingConfigError { .. }
            | FetchError::ConfigValidationError { .. } => {
                "Fix the configuration file or command line arguments".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not retrieve data: {}", self),
            ErrorCategory::Data => format!("Retrieved data could not be read: {}", self),
            ErrorCategory::Storage => format!("Local data directory problem: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
