#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use mandi_price::error::{PriceError, Result};
use mandi_price::mandi::{
    CommodityNormalizer, DistrictRegistry, HistoricalAverageIndex, MandiConfig, PriceContext, PriceSource,
    RawPriceRecord,
};

/// In-memory `PriceSource` keyed by (state, date), counting every call
#[derive(Default)]
pub struct FakeSource {
    records: Mutex<HashMap<(String, NaiveDate), Vec<RawPriceRecord>>>,
    failing_states: Mutex<Vec<String>>,
    no_credential: bool,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behaves like a client with no API key
    pub fn without_credential() -> Self {
        Self { no_credential: true, ..Self::default() }
    }

    pub fn with_records(self, state: &str, date: NaiveDate, records: Vec<RawPriceRecord>) -> Self {
        self.records.lock().unwrap().insert((state.to_lowercase(), date), records);
        self
    }

    pub fn failing_for(self, state: &str) -> Self {
        self.failing_states.lock().unwrap().push(state.to_lowercase());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for FakeSource {
    async fn fetch_live(&self, state: &str, date: NaiveDate) -> Result<Vec<RawPriceRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.no_credential {
            return Err(PriceError::ConfigurationMissing);
        }
        let state = state.to_lowercase();
        if self.failing_states.lock().unwrap().contains(&state) {
            return Err(PriceError::UpstreamUnavailable("HTTP 503".to_string()));
        }

        Ok(self.records.lock().unwrap().get(&(state, date)).cloned().unwrap_or_default())
    }
}

pub fn record(state: &str, district: &str, commodity: &str, price: f64) -> RawPriceRecord {
    RawPriceRecord::new(state, district, commodity, price, None)
}

pub fn dated(state: &str, district: &str, commodity: &str, price: f64, date: &str) -> RawPriceRecord {
    RawPriceRecord::new(state, district, commodity, price, Some(date.to_string()))
}

pub fn historical(records: Vec<RawPriceRecord>) -> HistoricalAverageIndex {
    HistoricalAverageIndex::from_records(records, &CommodityNormalizer::default())
}

pub fn districts() -> DistrictRegistry {
    DistrictRegistry::from_pairs([
        ("pune", "maharashtra"),
        ("nashik", "maharashtra"),
        ("satara", "maharashtra"),
        ("ludhiana", "punjab"),
    ])
}

pub fn context(cache_dir: &Path, historical: HistoricalAverageIndex, memo_ttl: Duration) -> Arc<PriceContext> {
    let config = MandiConfig {
        cache_dir: cache_dir.to_path_buf(),
        memo_ttl,
        cache_io_timeout: Duration::from_secs(5),
        ..MandiConfig::default()
    };

    Arc::new(PriceContext::new(config, CommodityNormalizer::default(), historical, districts()))
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}
