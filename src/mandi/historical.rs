use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};

use super::commodity::CommodityNormalizer;
use super::models::{normalize_field, PriceKey, RawPriceRecord};
use crate::error::{PriceError, Result};

const ARRIVAL_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d-%b-%Y"];

/// Averaged price for one key plus the date shown as "stale as of"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalEntry {
    pub price: i64,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoricalLevel {
    District,
    StateAverage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalHit {
    pub price: i64,
    pub date: Option<String>,
    pub level: HistoricalLevel,
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: u32,
    date: Option<String>,
}

impl Accumulator {
    fn push(&mut self, price: f64, date: &Option<String>) {
        if self.count == 0 {
            self.date = date.clone();
        }
        self.sum += price;
        self.count += 1;
    }

    fn finish(self) -> HistoricalEntry {
        HistoricalEntry {
            price: (self.sum / f64::from(self.count)).round() as i64,
            date: self.date,
        }
    }
}

/// Precomputed averages over the static bulk dataset, keyed by
/// `(state, district, commodity)` and `(state, __state_avg__, commodity)`.
/// Built once at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct HistoricalAverageIndex {
    entries: HashMap<PriceKey, HistoricalEntry>,
}

impl HistoricalAverageIndex {
    /// Load the bulk CSV. A missing file gives an empty index so the resolver can
    /// still serve live and cached tiers.
    pub fn load_csv(path: &Path, normalizer: &CommodityNormalizer) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Mandi price dataset '{}' not found, historical fallback disabled", path.display());
            return Ok(Self::default());
        }

        let file = std::fs::File::open(path)
            .map_err(|e| PriceError::Dataset(format!("Failed to open '{}': {}", path.display(), e)))?;
        let index = Self::from_reader(file, normalizer)?;

        tracing::info!(
            "Pre-computed {} historical price averages from '{}'",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    pub fn from_reader<R: Read>(reader: R, normalizer: &CommodityNormalizer) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let columns = DatasetColumns::resolve(csv_reader.headers()?)?;

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for row in csv_reader.records() {
            let row = row?;
            match columns.to_record(&row) {
                Some(record) => records.push(record),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::debug!("Dropped {} dataset rows without a numeric modal price", dropped);
        }

        Ok(Self::from_records(records, normalizer))
    }

    pub fn from_records<I>(records: I, normalizer: &CommodityNormalizer) -> Self
    where
        I: IntoIterator<Item = RawPriceRecord>,
    {
        let mut district_groups: HashMap<PriceKey, Accumulator> = HashMap::new();
        let mut state_groups: HashMap<PriceKey, Accumulator> = HashMap::new();

        for record in records {
            let Some(price) = record.modal_price_value() else {
                continue;
            };
            let commodity = normalizer.normalize(&record.commodity);
            let date = record.arrival_date.as_deref().and_then(parse_arrival_date);

            district_groups
                .entry(PriceKey::new(&record.state, &record.district, &commodity))
                .or_default()
                .push(price, &date);
            state_groups
                .entry(PriceKey::state_average(&record.state, &commodity))
                .or_default()
                .push(price, &date);
        }

        let entries = district_groups
            .into_iter()
            .chain(state_groups)
            .map(|(key, acc)| (key, acc.finish()))
            .collect();

        Self { entries }
    }

    /// District-level entry first, then the state-wide aggregate.
    /// `commodity` must already be canonical.
    pub fn lookup(&self, state: &str, district: &str, commodity: &str) -> Option<HistoricalHit> {
        if let Some(entry) = self.entries.get(&PriceKey::new(state, district, commodity)) {
            return Some(HistoricalHit {
                price: entry.price,
                date: entry.date.clone(),
                level: HistoricalLevel::District,
            });
        }

        self.entries
            .get(&PriceKey::state_average(state, commodity))
            .map(|entry| HistoricalHit {
                price: entry.price,
                date: entry.date.clone(),
                level: HistoricalLevel::StateAverage,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Column positions in the bulk export. Headers come as "Modal_x0020_Price" in the
/// XML-derived exports and "modal_price" in the JSON-derived ones.
struct DatasetColumns {
    state: usize,
    district: usize,
    commodity: usize,
    modal_price: usize,
    arrival_date: Option<usize>,
}

impl DatasetColumns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let cleaned: Vec<String> = headers
            .iter()
            .map(|h| normalize_field(&h.replace("_x0020_", " ")))
            .collect();

        let find = |names: &[&str]| cleaned.iter().position(|h| names.contains(&h.as_str()));
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| PriceError::Dataset(format!("Missing column '{}'", names[0])))
        };

        Ok(Self {
            state: require(&["state"])?,
            district: require(&["district"])?,
            commodity: require(&["commodity"])?,
            modal_price: require(&["modal price", "modal_price"])?,
            arrival_date: find(&["arrival_date", "arrival date"]),
        })
    }

    fn to_record(&self, row: &StringRecord) -> Option<RawPriceRecord> {
        let field = |idx: usize| row.get(idx).unwrap_or_default();
        let price = field(self.modal_price).replace(',', "").parse::<f64>().ok()?;
        if !price.is_finite() {
            return None;
        }

        Some(RawPriceRecord::new(
            field(self.state),
            field(self.district),
            field(self.commodity),
            price,
            self.arrival_date.map(|idx| field(idx).to_string()).filter(|d| !d.is_empty()),
        ))
    }
}

/// Day-first dates from the dataset rendered as `%Y-%m-%d`
pub fn parse_arrival_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    ARRIVAL_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
}
