use super::commodity::CommodityNormalizer;
use super::config::MandiConfig;
use super::districts::DistrictRegistry;
use super::historical::HistoricalAverageIndex;
use crate::error::Result;

/// Startup-built, read-only state shared by the resolver and the refresh scheduler.
/// Wrap in an `Arc` once constructed; nothing in here changes afterwards.
pub struct PriceContext {
    pub config: MandiConfig,
    pub normalizer: CommodityNormalizer,
    pub historical: HistoricalAverageIndex,
    pub districts: DistrictRegistry,
}

impl PriceContext {
    pub fn new(
        config: MandiConfig,
        normalizer: CommodityNormalizer,
        historical: HistoricalAverageIndex,
        districts: DistrictRegistry,
    ) -> Self {
        Self { config, normalizer, historical, districts }
    }

    /// Load the bulk dataset and district table named in `config`
    pub fn load(config: MandiConfig) -> Result<Self> {
        let normalizer = CommodityNormalizer::default();
        let historical = HistoricalAverageIndex::load_csv(&config.dataset_path, &normalizer)?;
        let districts = DistrictRegistry::load_json(&config.district_map_path)?;

        tracing::info!(
            historical_keys = historical.len(),
            districts = districts.len(),
            live_enabled = config.api_key.is_some(),
            "Price context ready"
        );

        Ok(Self::new(config, normalizer, historical, districts))
    }
}
