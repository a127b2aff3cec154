use std::sync::Arc;

use chrono::{Local, NaiveDate};

use super::config::DistrictMatch;
use super::context::PriceContext;
use super::disk_cache::DiskPriceCache;
use super::historical::HistoricalLevel;
use super::mandi_client::PriceSource;
use super::memo::MemoCache;
use super::models::{normalize_field, title_case, PriceKey, PriceResult, PriceTier, RawPriceRecord};
use crate::error::{PriceError, Result};
use crate::utility::timing::Timer;

const DEFAULT_STALE_DATE: &str = "a prior date";
const SLOW_RESOLVE_MS: u128 = 2000;

/// Tiered price lookup: memo -> fresh disk snapshot -> live fetch (today, then
/// yesterday) -> historical average -> not found.
///
/// Every tier absorbs its own failure, so `resolve_price` never errors; "no price" is
/// a `PriceResult` with `price: None`.
pub struct PriceResolver {
    context: Arc<PriceContext>,
    cache: DiskPriceCache,
    source: Arc<dyn PriceSource>,
    memo: MemoCache,
}

impl PriceResolver {
    pub fn new(context: Arc<PriceContext>, source: Arc<dyn PriceSource>) -> Self {
        let config = &context.config;
        let cache = DiskPriceCache::new(config.cache_dir.clone(), config.disk_cache_freshness, config.cache_io_timeout);
        let memo = MemoCache::new(config.memo_ttl);

        Self { context, cache, source, memo }
    }

    pub fn context(&self) -> &Arc<PriceContext> {
        &self.context
    }

    pub fn cache(&self) -> &DiskPriceCache {
        &self.cache
    }

    pub fn source(&self) -> &Arc<dyn PriceSource> {
        &self.source
    }

    pub fn memo(&self) -> &MemoCache {
        &self.memo
    }

    pub async fn resolve_price(&self, state: &str, district: &str, commodity: &str) -> PriceResult {
        self.resolve_price_as_of(state, district, commodity, Local::now().date_naive()).await
    }

    /// Resolve with `as_of` as "today" for the live tier
    pub async fn resolve_price_as_of(
        &self,
        state: &str,
        district: &str,
        commodity: &str,
        as_of: NaiveDate,
    ) -> PriceResult {
        let key = PriceKey::new(state, district, &self.context.normalizer.normalize(commodity));

        if let Some(result) = self.memo.get(&key).await {
            tracing::debug!(?key, "Serving price from memo");
            return result;
        }

        let _timer = Timer::start_with_threshold(
            format!("Price resolution for {}/{}/{}", key.state, key.district, key.commodity),
            SLOW_RESOLVE_MS,
        );

        tracing::info!("Fetching price for '{}' in '{}, {}'", key.commodity, key.district, key.state);
        let result = self.resolve_uncached(&key, district, as_of).await;

        self.memo.insert(key, result.clone()).await;
        result
    }

    /// State is inferred from the district table when not given
    pub async fn resolve_price_for_district(
        &self,
        district: &str,
        commodity: &str,
        state: Option<&str>,
    ) -> Result<PriceResult> {
        let state = self.state_for(district, state)?;
        Ok(self.resolve_price(&state, district, commodity).await)
    }

    /// Historical index only, no cache or network
    pub fn historical_price(&self, district: &str, commodity: &str, state: Option<&str>) -> Result<PriceResult> {
        let state = self.state_for(district, state)?;
        let key = PriceKey::new(&state, district, &self.context.normalizer.normalize(commodity));
        Ok(self
            .historical_tier(&key, district)
            .unwrap_or_else(|| not_found(&key)))
    }

    /// Normalized state: the given one, else the district table's entry
    pub fn state_for(&self, district: &str, state: Option<&str>) -> Result<String> {
        match state.map(normalize_field).filter(|s| !s.is_empty()) {
            Some(state) => Ok(state),
            None => self
                .context
                .districts
                .find_state(district)
                .map(str::to_string)
                .ok_or_else(|| PriceError::StateNotFound(district.to_string())),
        }
    }

    async fn resolve_uncached(&self, key: &PriceKey, district_label: &str, as_of: NaiveDate) -> PriceResult {
        let place = title_case(district_label);

        if let Some(snapshot) = self.cache.load(&key.state).await.into_fresh() {
            if let Some(price) = self.average_matching(&snapshot.records, key) {
                tracing::info!("Serving price from recent disk cache");
                return PriceResult::fresh(
                    price,
                    format!("Using recent cached market data for {}.", place),
                    PriceTier::DiskCache,
                );
            }
        }

        if let Some(records) = self.fetch_recent(&key.state, as_of).await {
            if let Err(e) = self.cache.store(&key.state, &records).await {
                tracing::error!("{}", e);
            }

            if let Some(price) = self.average_matching(&records, key) {
                tracing::info!("Serving price from live API fetch");
                return PriceResult::fresh(price, format!("Using live market data for {}.", place), PriceTier::Live);
            }
        }

        tracing::warn!("Live sources had no price for '{}', falling back to historical data", key.commodity);
        self.historical_tier(key, district_label)
            .unwrap_or_else(|| not_found(key))
    }

    /// Today's records, or yesterday's when today has none yet
    async fn fetch_recent(&self, state: &str, as_of: NaiveDate) -> Option<Vec<RawPriceRecord>> {
        let mut dates = vec![as_of];
        if let Some(yesterday) = as_of.pred_opt() {
            dates.push(yesterday);
        }

        for date in dates {
            match self.source.fetch_live(state, date).await {
                Ok(records) if !records.is_empty() => return Some(records),
                Ok(_) => tracing::info!("No live records for '{}' on {}", state, date),
                Err(PriceError::ConfigurationMissing) => return None,
                Err(e) => tracing::warn!("Live tier unavailable for '{}' on {}: {}", state, date, e),
            }
        }

        None
    }

    fn historical_tier(&self, key: &PriceKey, district_label: &str) -> Option<PriceResult> {
        let hit = self.context.historical.lookup(&key.state, &key.district, &key.commodity)?;
        let place = title_case(district_label);
        let stale_date = hit.date.unwrap_or_else(|| DEFAULT_STALE_DATE.to_string());

        Some(match hit.level {
            HistoricalLevel::District => PriceResult::stale(
                hit.price,
                format!("Using historical data for {}.", place),
                stale_date,
                PriceTier::Historical,
            ),
            HistoricalLevel::StateAverage => PriceResult::stale(
                hit.price,
                format!("Could not find data for {}, using state-level historical average.", place),
                stale_date,
                PriceTier::HistoricalStateAverage,
            ),
        })
    }

    /// Rounded mean modal price of records matching the key's district and commodity
    pub fn average_matching(&self, records: &[RawPriceRecord], key: &PriceKey) -> Option<i64> {
        let matcher = self.context.normalizer.matcher(&key.commodity);
        let district_match = self.context.config.district_match;

        let prices: Vec<f64> = records
            .iter()
            .filter(|r| district_matches(district_match, &r.district, &key.district))
            .filter(|r| matcher.is_match(&r.commodity))
            .filter_map(RawPriceRecord::modal_price_value)
            .collect();

        tracing::debug!(
            "Found {} priced records for district='{}' commodity='{}'",
            prices.len(),
            key.district,
            key.commodity
        );

        if prices.is_empty() {
            return None;
        }

        Some((prices.iter().sum::<f64>() / prices.len() as f64).round() as i64)
    }
}

fn district_matches(mode: DistrictMatch, reported: &str, query: &str) -> bool {
    let reported = normalize_field(reported);
    match mode {
        DistrictMatch::Exact => reported == query,
        DistrictMatch::Substring => !query.is_empty() && reported.contains(query),
    }
}

fn not_found(key: &PriceKey) -> PriceResult {
    PriceResult::not_found(format!(
        "No market data available for '{}' in {} from any source.",
        key.commodity,
        title_case(&key.state)
    ))
}
