mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use common::{date, record, FakeSource};
use mandi_price::mandi::{CacheLoad, DiskPriceCache, PriceSource, RefreshReport, RefreshScheduler};
use tokio::sync::watch;

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(dir: &std::path::Path, source: Arc<FakeSource>) -> RefreshScheduler {
        let source: Arc<dyn PriceSource> = source;
        let cache = DiskPriceCache::new(dir, Duration::from_secs(12 * 3600), Duration::from_secs(5));
        RefreshScheduler::with_states(vec!["maharashtra".to_string(), "punjab".to_string()], source, cache)
            .with_timing(Duration::from_millis(1), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_pass_stores_successes_and_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let day = date("2024-06-02");
        let source = Arc::new(
            FakeSource::new()
                .with_records("maharashtra", day, vec![record("Maharashtra", "Pune", "Rice", 2400.0)])
                .with_records("maharashtra", date("2024-06-01"), vec![record("Maharashtra", "Pune", "Rice", 1.0)])
                .failing_for("punjab"),
        );
        let scheduler = scheduler(dir.path(), source.clone());

        let report = scheduler.refresh_all(day).await;

        assert_eq!(
            report,
            RefreshReport {
                refreshed: vec!["maharashtra".to_string()],
                skipped: vec!["punjab".to_string()],
            }
        );
        // One fetch per state, never a fallback to yesterday
        assert_eq!(source.calls(), 2);

        let cache = DiskPriceCache::new(dir.path(), Duration::from_secs(3600), Duration::from_secs(5));
        let snapshot = cache.load("maharashtra").await.into_fresh().unwrap();
        assert_eq!(snapshot.records[0].modal_price_value(), Some(2400.0));
        assert!(matches!(cache.load("punjab").await, CacheLoad::Missing));
    }

    #[tokio::test]
    async fn test_empty_fetch_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let day = date("2024-06-02");
        let cache = DiskPriceCache::new(dir.path(), Duration::from_secs(3600), Duration::from_secs(5));
        cache.store("punjab", &[record("Punjab", "Ludhiana", "Wheat", 2100.0)]).await.unwrap();

        let scheduler = scheduler(dir.path(), Arc::new(FakeSource::new()));
        let report = scheduler.refresh_all(day).await;

        assert!(report.refreshed.is_empty());
        assert_eq!(report.skipped.len(), 2);
        let snapshot = cache.load("punjab").await.into_fresh().unwrap();
        assert_eq!(snapshot.records[0].modal_price_value(), Some(2100.0));
    }

    #[tokio::test]
    async fn test_bounded_passes_then_stops() {
        let dir = tempfile::tempdir().unwrap();
        let today = Local::now().date_naive();
        let source = Arc::new(
            FakeSource::new()
                .with_records("maharashtra", today, vec![record("Maharashtra", "Pune", "Rice", 2400.0)])
                .with_records("punjab", today, vec![record("Punjab", "Ludhiana", "Wheat", 2100.0)]),
        );
        let scheduler = Arc::new(scheduler(dir.path(), source.clone()).with_max_passes(2));
        let (_tx, rx) = watch::channel(false);

        assert!(scheduler.start(rx));
        scheduler.join().await;

        assert!(!scheduler.is_running());
        assert_eq!(source.calls(), 4);
        assert!(dir.path().join("maharashtra_cache.json").exists());
        assert!(dir.path().join("punjab_cache.json").exists());
    }

    #[tokio::test]
    async fn test_second_start_is_a_noop_and_shutdown_stops_loop() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Arc::new(
            scheduler(dir.path(), Arc::new(FakeSource::new()))
                .with_timing(Duration::from_millis(1), Duration::from_secs(3600)),
        );
        let (tx, rx) = watch::channel(false);

        assert!(scheduler.start(rx.clone()));
        assert!(!scheduler.start(rx));
        assert!(scheduler.is_running());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), scheduler.join())
            .await
            .expect("scheduler did not stop after shutdown");

        assert!(!scheduler.is_running());
    }
}
