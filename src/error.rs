use thiserror::Error;

/// Failures inside the price core. None of these reach `resolve_price` callers;
/// each tier absorbs its own failure and falls through to the next one.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("Live price API credential not configured")]
    ConfigurationMissing,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Corrupt cache file for '{state}': {reason}")]
    CacheReadCorrupt { state: String, reason: String },

    #[error("Failed to write cache for '{state}': {reason}")]
    CacheWrite { state: String, reason: String },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Could not determine the state for district '{0}'")]
    StateNotFound(String),
}

impl From<reqwest::Error> for PriceError {
    fn from(err: reqwest::Error) -> Self {
        PriceError::UpstreamUnavailable(err.to_string())
    }
}

impl From<csv::Error> for PriceError {
    fn from(err: csv::Error) -> Self {
        PriceError::Dataset(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PriceError>;
