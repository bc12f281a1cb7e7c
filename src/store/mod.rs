//! Persistent price cache, one partition per logical table.

use crate::core::series::DailyPoint;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use fjall::{Config, PartitionCreateOptions, PersistMode};
use std::path::{Path, PathBuf};
use tracing::debug;

const CRYPTO_PRICES: &str = "crypto_prices";
const FIAT_RATES: &str = "fiat_rates";

/// Keyspace-backed cache of daily prices and rates, keyed by
/// `(entity, date)`. Writes are insert-or-replace; the latest write for a
/// key wins. The keyspace is opened and closed on every call, so no
/// connection is held between operations.
pub struct PriceCache {
    path: PathBuf,
}

impl PriceCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Ensures the keyspace and both partitions exist. Safe to call at every
    /// start; does nothing when they are already present.
    pub fn init(&self) -> Result<()> {
        let keyspace = Config::new(&self.path)
            .open()
            .with_context(|| format!("Failed to open cache at {}", self.path.display()))?;
        keyspace.open_partition(CRYPTO_PRICES, PartitionCreateOptions::default())?;
        keyspace.open_partition(FIAT_RATES, PartitionCreateOptions::default())?;
        Ok(())
    }

    pub fn upsert_prices(&self, coin_id: &str, points: &[DailyPoint]) -> Result<()> {
        self.upsert(CRYPTO_PRICES, coin_id, points)
    }

    pub fn upsert_rates(&self, code: &str, points: &[DailyPoint]) -> Result<()> {
        self.upsert(FIAT_RATES, code, points)
    }

    pub fn load_prices(&self, coin_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyPoint>> {
        self.load(CRYPTO_PRICES, coin_id, start, end)
    }

    pub fn load_rates(&self, code: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyPoint>> {
        self.load(FIAT_RATES, code, start, end)
    }

    // Row keys are "{entity}:{YYYY-MM-DD}". ISO dates are fixed width, so
    // lexicographic key order within an entity prefix is chronological.
    fn row_key(entity: &str, date: NaiveDate) -> String {
        format!("{entity}:{date}")
    }

    fn upsert(&self, table: &str, entity: &str, points: &[DailyPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let keyspace = Config::new(&self.path)
            .open()
            .with_context(|| format!("Failed to open cache at {}", self.path.display()))?;
        let partition = keyspace.open_partition(table, PartitionCreateOptions::default())?;

        for point in points {
            let value = match serde_json::to_vec(&point.value) {
                Ok(value) => value,
                Err(e) => {
                    debug!("Skipping unserializable row for {entity} @ {}: {e}", point.date);
                    continue;
                }
            };
            if let Err(e) = partition.insert(Self::row_key(entity, point.date), value) {
                debug!("Skipping failed row write for {entity} @ {}: {e}", point.date);
            }
        }

        keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn load(
        &self,
        table: &str,
        entity: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPoint>> {
        let keyspace = Config::new(&self.path)
            .open()
            .with_context(|| format!("Failed to open cache at {}", self.path.display()))?;
        let partition = keyspace.open_partition(table, PartitionCreateOptions::default())?;

        let lo = Self::row_key(entity, start);
        let hi = Self::row_key(entity, end);
        let prefix_len = entity.len() + 1;

        let mut points = Vec::new();
        for kv in partition.range(lo..=hi) {
            let (key, value) = kv?;
            let Some(date) = std::str::from_utf8(&key)
                .ok()
                .and_then(|k| k.get(prefix_len..))
                .and_then(|d| d.parse::<NaiveDate>().ok())
            else {
                debug!("Skipping cache row with malformed key in {table}");
                continue;
            };
            let Ok(value) = serde_json::from_slice::<Option<f64>>(&value) else {
                debug!("Skipping cache row with malformed value for {entity} @ {date}");
                continue;
            };
            points.push(DailyPoint::new(date, value));
        }

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache.init().unwrap();
        cache.init().unwrap();
    }

    #[test]
    fn test_upsert_and_load_in_range_sorted() {
        let dir = tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache.init().unwrap();

        // Written out of order; loads must come back ascending by date.
        cache
            .upsert_prices(
                "bitcoin",
                &[
                    DailyPoint::new(date("2024-01-03"), Some(110.0)),
                    DailyPoint::new(date("2024-01-01"), Some(100.0)),
                    DailyPoint::new(date("2024-01-05"), Some(120.0)),
                ],
            )
            .unwrap();

        let points = cache
            .load_prices("bitcoin", date("2024-01-01"), date("2024-01-03"))
            .unwrap();
        assert_eq!(
            points,
            vec![
                DailyPoint::new(date("2024-01-01"), Some(100.0)),
                DailyPoint::new(date("2024-01-03"), Some(110.0)),
            ]
        );

        // Inclusive upper bound.
        let points = cache
            .load_prices("bitcoin", date("2024-01-03"), date("2024-01-05"))
            .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].date, date("2024-01-05"));
    }

    #[test]
    fn test_upsert_is_last_write_wins() {
        let dir = tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache.init().unwrap();

        let day = date("2024-01-01");
        cache
            .upsert_prices("bitcoin", &[DailyPoint::new(day, Some(100.0))])
            .unwrap();
        cache
            .upsert_prices("bitcoin", &[DailyPoint::new(day, Some(100.0))])
            .unwrap();
        cache
            .upsert_prices("bitcoin", &[DailyPoint::new(day, Some(150.0))])
            .unwrap();

        let points = cache.load_prices("bitcoin", day, day).unwrap();
        assert_eq!(points, vec![DailyPoint::new(day, Some(150.0))]);
    }

    #[test]
    fn test_load_empty_range_is_not_an_error() {
        let dir = tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache.init().unwrap();

        let points = cache
            .load_rates("EUR", date("2024-01-01"), date("2024-01-31"))
            .unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_upsert_empty_input_is_noop() {
        let dir = tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache.init().unwrap();
        cache.upsert_rates("EUR", &[]).unwrap();
    }

    #[test]
    fn test_missing_value_roundtrips_as_missing() {
        let dir = tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache.init().unwrap();

        cache
            .upsert_rates("JPY", &[DailyPoint::new(date("2024-02-01"), None)])
            .unwrap();
        let points = cache
            .load_rates("JPY", date("2024-02-01"), date("2024-02-01"))
            .unwrap();
        assert_eq!(points, vec![DailyPoint::new(date("2024-02-01"), None)]);
    }

    #[test]
    fn test_tables_are_separate() {
        let dir = tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache.init().unwrap();

        let day = date("2024-01-01");
        cache
            .upsert_prices("bitcoin", &[DailyPoint::new(day, Some(1.0))])
            .unwrap();
        assert!(cache.load_rates("bitcoin", day, day).unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let day = date("2024-01-01");
        {
            let cache = PriceCache::new(dir.path());
            cache.init().unwrap();
            cache
                .upsert_prices("bitcoin", &[DailyPoint::new(day, Some(42.0))])
                .unwrap();
        }

        let cache = PriceCache::new(dir.path());
        cache.init().unwrap();
        let points = cache.load_prices("bitcoin", day, day).unwrap();
        assert_eq!(points, vec![DailyPoint::new(day, Some(42.0))]);
    }
}
