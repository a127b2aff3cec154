pub mod commodity;
pub mod config;
pub mod context;
pub mod disk_cache;
pub mod districts;
pub mod historical;
pub mod mandi_client;
pub mod memo;
pub mod models;
pub mod resolver;
pub mod scheduler;
pub mod summary;

// Re-exports (public API)
pub use commodity::{CommodityMatcher, CommodityNormalizer};
pub use config::{DistrictMatch, MandiConfig};
pub use context::PriceContext;
pub use disk_cache::{CacheLoad, DiskCacheSnapshot, DiskPriceCache};
pub use districts::DistrictRegistry;
pub use historical::{HistoricalAverageIndex, HistoricalHit, HistoricalLevel};
pub use mandi_client::{MandiClient, PriceSource};
pub use memo::MemoCache;
pub use models::{PriceKey, PriceResult, PriceTier, RawPriceRecord};
pub use resolver::PriceResolver;
pub use scheduler::{RefreshReport, RefreshScheduler};
pub use summary::{DashboardSummary, RevenueEstimate};
