use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::models::{PriceKey, PriceResult};

/// Short-lived memo of resolver results. Absorbs bursts of identical requests;
/// dropping it never changes a result, only which tier gets re-run.
pub struct MemoCache {
    ttl: Duration,
    entries: RwLock<HashMap<PriceKey, (PriceResult, Instant)>>,
}

impl MemoCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn get(&self, key: &PriceKey) -> Option<PriceResult> {
        if !self.is_enabled() {
            return None;
        }

        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(_, cached_at)| cached_at.elapsed() < self.ttl)
            .map(|(result, _)| result.clone())
    }

    pub async fn insert(&self, key: PriceKey, result: PriceResult) {
        if !self.is_enabled() {
            return;
        }

        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, cached_at)| cached_at.elapsed() < self.ttl);
        entries.insert(key, (result, Instant::now()));
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
