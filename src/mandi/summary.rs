use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::models::{normalize_field, title_case, PriceResult};
use super::resolver::PriceResolver;

/// Quintals per acre for crops with a known yield
pub const YIELD_TABLE: &[(&str, f64)] = &[
    ("rice", 22.0),
    ("wheat", 20.0),
    ("maize", 25.0),
    ("cotton", 8.0),
    ("chickpea", 10.0),
];
pub const DEFAULT_YIELD_QPA: f64 = 15.0;

pub const DASHBOARD_CROPS: &[&str] = &["Rice", "Wheat", "Maize", "Cotton"];
pub const STALE_SUMMARY_NOTE: &str = "Note: Some prices based on historical data.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueEstimate {
    pub crop: String,
    pub location: String,
    pub average_mandi_price: Option<i64>,
    pub estimated_yield_qpa: f64,
    pub area_acres: f64,
    pub total_estimated_revenue: i64,
    pub note: String,
    pub is_stale: bool,
    pub stale_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub labels: Vec<String>,
    pub prices: Vec<i64>,
    pub note: String,
}

pub fn yield_per_acre(crop: &str) -> f64 {
    let crop = normalize_field(crop);
    YIELD_TABLE
        .iter()
        .find(|(name, _)| *name == crop)
        .map(|(_, qpa)| *qpa)
        .unwrap_or(DEFAULT_YIELD_QPA)
}

impl PriceResolver {
    pub async fn estimate_revenue(&self, state: &str, district: &str, commodity: &str, area_acres: f64) -> RevenueEstimate {
        let result = self.resolve_price(state, district, commodity).await;
        let canonical = self.context().normalizer.normalize(commodity);
        let estimated_yield_qpa = yield_per_acre(&canonical);

        let total_estimated_revenue = match result.price {
            Some(price) => (estimated_yield_qpa * area_acres * price as f64).round() as i64,
            None => 0,
        };

        RevenueEstimate {
            crop: title_case(&canonical),
            location: format!("{}, {}", title_case(district), title_case(state)),
            average_mandi_price: result.price,
            estimated_yield_qpa,
            area_acres,
            total_estimated_revenue,
            note: result.note,
            is_stale: result.is_stale,
            stale_date: result.stale_date,
        }
    }

    /// Prices for the headline crops, resolved concurrently
    pub async fn dashboard_summary(&self, state: &str, district: &str) -> DashboardSummary {
        let results: Vec<PriceResult> = join_all(
            DASHBOARD_CROPS
                .iter()
                .map(|crop| self.resolve_price(state, district, crop)),
        )
        .await;

        let note = if results.iter().any(|r| r.is_stale) {
            STALE_SUMMARY_NOTE.to_string()
        } else {
            String::new()
        };

        DashboardSummary {
            labels: DASHBOARD_CROPS.iter().map(|c| c.to_string()).collect(),
            prices: results.iter().map(|r| r.price.unwrap_or(0)).collect(),
            note,
        }
    }
}
