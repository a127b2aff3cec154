use std::path::PathBuf;
use std::time::Duration;

// -----------------------------------------------
// DATA.GOV.IN MANDI API
// -----------------------------------------------
pub const DATA_GOV_BASE_URL: &str = "https://api.data.gov.in/resource";
pub const MANDI_RESOURCE_ID: &str = "9ef84268-d588-465a-a308-a864a43d0070";

/// Hard page cap of the upstream resource; anything beyond it is silently dropped.
pub const API_PAGE_LIMIT: usize = 2000;

/// `filters[arrival_date]` is an exact match, there is no "latest" query.
pub const API_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn mandi_resource_url(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), MANDI_RESOURCE_ID)
}

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                               AppleWebKit/537.36 (KHTML, like Gecko) \
                               Chrome/131.0.0.0 Safari/537.36";

// Upper bound for one live fetch, retries included
pub const LIVE_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

pub const CACHE_IO_TIMEOUT: Duration = Duration::from_secs(10);

// -----------------------------------------------
// RETRY CONFIG (429 / 5xx / connection errors)
// -----------------------------------------------
pub const RETRY_BASE_DELAY_MS: u64 = 200;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 3;
pub const RETRY_MAX_ATTEMPTS: usize = 3;

// -----------------------------------------------
// CACHE WINDOWS
// -----------------------------------------------
pub const DISK_CACHE_FRESHNESS: Duration = Duration::from_secs(12 * 3600);
pub const MEMO_TTL: Duration = Duration::from_secs(4 * 3600);

// -----------------------------------------------
// BACKGROUND REFRESH
// -----------------------------------------------
pub const REFRESH_STATE_DELAY: Duration = Duration::from_secs(5);
pub const REFRESH_PASS_INTERVAL: Duration = Duration::from_secs(6 * 3600);

// -----------------------------------------------
// DEFAULT PATHS
// -----------------------------------------------
pub const DEFAULT_DATASET_PATH: &str = "data/mandi_prices.csv";
pub const DEFAULT_DISTRICT_MAP_PATH: &str = "data/district_to_state.json";
pub const DEFAULT_CACHE_DIR: &str = "price_data_cache";

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// How a live record's district is compared against the queried district.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistrictMatch {
    /// Record district contains the query district. Can over-match
    /// ("nagar" hits "ahmednagar").
    #[default]
    Substring,
    Exact,
}

impl DistrictMatch {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "substring" => Some(Self::Substring),
            "exact" => Some(Self::Exact),
            _ => None,
        }
    }
}

/// Everything the price core needs from the environment.
#[derive(Debug, Clone)]
pub struct MandiConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub dataset_path: PathBuf,
    pub district_map_path: PathBuf,
    pub cache_dir: PathBuf,
    pub district_match: DistrictMatch,
    pub live_fetch_timeout: Duration,
    pub cache_io_timeout: Duration,
    pub disk_cache_freshness: Duration,
    pub memo_ttl: Duration,
    pub refresh_state_delay: Duration,
    pub refresh_pass_interval: Duration,
}

impl Default for MandiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DATA_GOV_BASE_URL.to_string(),
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            district_map_path: PathBuf::from(DEFAULT_DISTRICT_MAP_PATH),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            district_match: DistrictMatch::default(),
            live_fetch_timeout: LIVE_FETCH_TIMEOUT,
            cache_io_timeout: CACHE_IO_TIMEOUT,
            disk_cache_freshness: DISK_CACHE_FRESHNESS,
            memo_ttl: MEMO_TTL,
            refresh_state_delay: REFRESH_STATE_DELAY,
            refresh_pass_interval: REFRESH_PASS_INTERVAL,
        }
    }
}

impl MandiConfig {
    /// Create configuration from environment variables (call `dotenvy::dotenv()` first)
    pub fn from_env() -> Self {
        Self {
            api_key: get_api_key(),
            dataset_path: env_path("MANDI_PRICE_DATA_PATH", DEFAULT_DATASET_PATH),
            district_map_path: env_path("DISTRICT_STATE_MAP_PATH", DEFAULT_DISTRICT_MAP_PATH),
            cache_dir: env_path("PRICE_CACHE_DIR", DEFAULT_CACHE_DIR),
            district_match: get_district_match(),
            ..Self::default()
        }
    }
}

/// Credential for the live API; blank values count as absent
pub fn get_api_key() -> Option<String> {
    std::env::var("DATA_GOV_IN_API_KEY")
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

pub fn get_district_match() -> DistrictMatch {
    std::env::var("MANDI_DISTRICT_MATCH")
        .ok()
        .and_then(|value| DistrictMatch::parse(&value))
        .unwrap_or_default()
}

/// Get the execution mode from environment or default to resolve
pub fn get_execution_mode() -> String {
    std::env::var("MANDI_MODE").unwrap_or_else(|_| "resolve".to_string())
}

fn env_path(name: &str, default: &str) -> PathBuf {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}
