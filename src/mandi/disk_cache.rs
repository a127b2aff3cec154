use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::models::{normalize_field, RawPriceRecord};
use crate::error::{PriceError, Result};

/// Records last fetched live for one state, with the fetch time
#[derive(Debug, Clone, PartialEq)]
pub struct DiskCacheSnapshot {
    pub state: String,
    pub fetched_at: DateTime<Utc>,
    pub records: Vec<RawPriceRecord>,
}

/// Outcome of reading a state's snapshot. Only `Fresh` is usable; callers treat the
/// rest identically, the variants exist so logs and tests can tell them apart.
#[derive(Debug)]
pub enum CacheLoad {
    Fresh(DiskCacheSnapshot),
    Expired { fetched_at: DateTime<Utc> },
    Missing,
    Corrupt(PriceError),
}

impl CacheLoad {
    pub fn into_fresh(self) -> Option<DiskCacheSnapshot> {
        match self {
            CacheLoad::Fresh(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, CacheLoad::Fresh(_))
    }
}

#[derive(Serialize)]
struct SnapshotFileRef<'a> {
    timestamp: String,
    records: &'a [RawPriceRecord],
}

#[derive(Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    timestamp: Option<String>,
    records: Vec<RawPriceRecord>,
}

/// One JSON file per state under `dir`. Writes go to a temp file that is renamed
/// over the target, so readers see either the old snapshot or the new one.
#[derive(Debug, Clone)]
pub struct DiskPriceCache {
    dir: PathBuf,
    freshness: Duration,
    io_timeout: Duration,
}

impl DiskPriceCache {
    pub fn new(dir: impl Into<PathBuf>, freshness: Duration, io_timeout: Duration) -> Self {
        Self { dir: dir.into(), freshness, io_timeout }
    }

    pub fn path_for(&self, state: &str) -> PathBuf {
        let name = urlencoding::encode(&normalize_field(state)).into_owned();
        self.dir.join(format!("{}_cache.json", name))
    }

    pub async fn load(&self, state: &str) -> CacheLoad {
        self.load_at(state, Utc::now()).await
    }

    pub async fn load_at(&self, state: &str, now: DateTime<Utc>) -> CacheLoad {
        let path = self.path_for(state);

        let text = match tokio::time::timeout(self.io_timeout, tokio::fs::read_to_string(&path)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => return CacheLoad::Missing,
            Ok(Err(e)) => return self.corrupt(state, format!("read failed: {}", e)),
            Err(_) => {
                tracing::warn!("Timed out reading cache file '{}'", path.display());
                return CacheLoad::Missing;
            }
        };

        let file: SnapshotFile = match serde_json::from_str(&text) {
            Ok(file) => file,
            Err(e) => return self.corrupt(state, format!("invalid JSON: {}", e)),
        };

        let Some(raw_timestamp) = file.timestamp else {
            return self.corrupt(state, "old format without timestamp".to_string());
        };
        let Some(fetched_at) = parse_timestamp(&raw_timestamp) else {
            return self.corrupt(state, format!("unparsable timestamp '{}'", raw_timestamp));
        };

        let age = now.signed_duration_since(fetched_at);
        if age.to_std().map(|age| age > self.freshness).unwrap_or(false) {
            tracing::info!(
                "Cache file '{}' is {}h old, older than {}h. Ignoring it.",
                path.display(),
                age.num_hours(),
                self.freshness.as_secs() / 3600
            );
            return CacheLoad::Expired { fetched_at };
        }

        tracing::debug!("Loaded {} records from cache file '{}'", file.records.len(), path.display());
        CacheLoad::Fresh(DiskCacheSnapshot {
            state: normalize_field(state),
            fetched_at,
            records: file.records,
        })
    }

    pub async fn store(&self, state: &str, records: &[RawPriceRecord]) -> Result<()> {
        self.store_at(state, records, Utc::now()).await
    }

    /// Replace the state's snapshot in full
    pub async fn store_at(&self, state: &str, records: &[RawPriceRecord], fetched_at: DateTime<Utc>) -> Result<()> {
        let path = self.path_for(state);
        let write_error = |reason: String| PriceError::CacheWrite { state: normalize_field(state), reason };

        let body = serde_json::to_string(&SnapshotFileRef {
            timestamp: fetched_at.to_rfc3339(),
            records,
        })
        .map_err(|e| write_error(e.to_string()))?;

        // Unique per writer so concurrent stores never share a temp file
        let tmp = path.with_extension(format!("json.{}.tmp", rand::thread_rng().r#gen::<u64>()));

        let write = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&tmp, body.as_bytes()).await?;
            tokio::fs::rename(&tmp, &path).await
        };

        match tokio::time::timeout(self.io_timeout, write).await {
            Ok(Ok(())) => {
                tracing::info!("Saved {} records to cache file '{}'", records.len(), path.display());
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                Err(write_error(e.to_string()))
            }
            Err(_) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                Err(write_error("timed out".to_string()))
            }
        }
    }

    fn corrupt(&self, state: &str, reason: String) -> CacheLoad {
        let err = PriceError::CacheReadCorrupt { state: normalize_field(state), reason };
        tracing::warn!("{}. Ignoring it.", err);
        CacheLoad::Corrupt(err)
    }
}

/// RFC 3339, or the naive local ISO timestamps older writers produced
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2024-05-01T10:00:00+05:30").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00.123456").is_some());
        assert!(parse_timestamp("2024-05-01").is_none());
    }

    #[test]
    fn test_path_for_is_filesystem_safe() {
        let cache = DiskPriceCache::new("/tmp/cache", Duration::from_secs(60), Duration::from_secs(1));
        assert_eq!(cache.path_for("Uttar Pradesh"), PathBuf::from("/tmp/cache/uttar%20pradesh_cache.json"));
        assert_eq!(cache.path_for("../etc"), PathBuf::from("/tmp/cache/..%2Fetc_cache.json"));
    }
}
