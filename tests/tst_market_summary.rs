mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{context, dated, historical, record, FakeSource};
use mandi_price::mandi::summary::STALE_SUMMARY_NOTE;
use mandi_price::mandi::{PriceResolver, PriceSource};

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(dir: &std::path::Path) -> PriceResolver {
        let index = historical(vec![dated("Maharashtra", "Pune", "Maize", 1900.0, "2023-03-15")]);
        let source: Arc<dyn PriceSource> = Arc::new(FakeSource::without_credential());
        PriceResolver::new(context(dir, index, Duration::ZERO), source)
    }

    #[tokio::test]
    async fn test_revenue_uses_crop_yield() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        resolver
            .cache()
            .store("maharashtra", &[record("Maharashtra", "Pune", "Rice", 2500.0)])
            .await
            .unwrap();

        let estimate = resolver.estimate_revenue("maharashtra", "pune", "paddy", 2.0).await;

        assert_eq!(estimate.crop, "Rice");
        assert_eq!(estimate.location, "Pune, Maharashtra");
        assert_eq!(estimate.average_mandi_price, Some(2500));
        assert_eq!(estimate.estimated_yield_qpa, 22.0);
        assert_eq!(estimate.total_estimated_revenue, 110_000);
        assert!(!estimate.is_stale);
    }

    #[tokio::test]
    async fn test_revenue_is_zero_without_price() {
        let dir = tempfile::tempdir().unwrap();
        let estimate = resolver(dir.path()).estimate_revenue("maharashtra", "pune", "onion", 3.5).await;

        assert_eq!(estimate.average_mandi_price, None);
        assert_eq!(estimate.estimated_yield_qpa, 15.0);
        assert_eq!(estimate.total_estimated_revenue, 0);
    }

    #[tokio::test]
    async fn test_dashboard_marks_historical_prices() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        resolver
            .cache()
            .store(
                "maharashtra",
                &[
                    record("Maharashtra", "Pune", "Rice", 2500.0),
                    record("Maharashtra", "Pune", "Wheat", 2200.0),
                ],
            )
            .await
            .unwrap();

        let summary = resolver.dashboard_summary("maharashtra", "pune").await;

        assert_eq!(summary.labels, vec!["Rice", "Wheat", "Maize", "Cotton"]);
        assert_eq!(summary.prices, vec![2500, 2200, 1900, 0]);
        assert_eq!(summary.note, STALE_SUMMARY_NOTE);
    }

    #[tokio::test]
    async fn test_dashboard_without_stale_prices_has_empty_note() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(dir.path());
        resolver
            .cache()
            .store("punjab", &[record("Punjab", "Ludhiana", "Wheat", 2300.0)])
            .await
            .unwrap();

        let summary = resolver.dashboard_summary("punjab", "ludhiana").await;

        assert_eq!(summary.prices, vec![0, 2300, 0, 0]);
        assert!(summary.note.is_empty());
    }
}
