//! Per-device reading histories with filter, sort, and statistics views.
//!
//! One ordered, deduplicated history is kept per device id. Insertion is
//! idempotent on reading id; histories stay sorted newest-first and are
//! capped at the most recent [`HISTORY_CAP`] entries. Filter/sort produce
//! views without mutating the underlying store.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, Months, Utc};
use serde::Serialize;

use crate::models::{extract_numeric, Reading};

/// Entries kept per device history.
pub const HISTORY_CAP: usize = 1000;

// ---

/// Time-period filter applied to a device history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPeriod {
    All,
    Today,
    Week,
    Month,
}

impl FilterPeriod {
    /// Inclusive lower bound for the period, or `None` for `All`.
    ///
    /// "Today" starts at local midnight; "week" is seven days back from now;
    /// "month" is one calendar month back, at local midnight of that day.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        // ---
        match self {
            FilterPeriod::All => None,
            FilterPeriod::Today => Some(local_midnight(now)),
            FilterPeriod::Week => Some(now - Duration::days(7)),
            FilterPeriod::Month => {
                let local = now.with_timezone(&Local);
                local
                    .date_naive()
                    .checked_sub_months(Months::new(1))
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .and_then(|naive| naive.and_local_timezone(Local).earliest())
                    .map(|dt| dt.with_timezone(&Utc))
                    // Fallback only matters at the calendar boundaries chrono
                    // cannot represent; approximate with 30 days.
                    .or(Some(now - Duration::days(30)))
            }
        }
    }
}

/// Sort order for a device history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Newest,
    Oldest,
}

/// Summary statistics trend over a device history.
///
/// Distinct from [`crate::trend::Trend`]: this one compares short-window
/// means, not consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatTrend {
    Increasing,
    Decreasing,
    Stable,
}

/// Derived statistics for one device history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingStats {
    // ---
    pub total: usize,
    pub today: usize,
    pub this_week: usize,
    pub average: f64,
    pub latest: Option<Reading>,
    pub trend: StatTrend,
}

impl ReadingStats {
    // ---
    /// Compute statistics over a newest-first reading slice.
    ///
    /// `average` is the mean of all extractable numeric values rounded to two
    /// decimals. `trend` compares the mean of the 3 most recent numerics to
    /// the mean of the 3 before them; a relative change beyond ±5% tips the
    /// label, and fewer than 6 numeric samples is always stable.
    pub fn compute(readings: &[Reading], now: DateTime<Utc>) -> ReadingStats {
        // ---
        if readings.is_empty() {
            return ReadingStats {
                total: 0,
                today: 0,
                this_week: 0,
                average: 0.0,
                latest: None,
                trend: StatTrend::Stable,
            };
        }

        let midnight = local_midnight(now);
        let week_ago = now - Duration::days(7);

        let today = readings.iter().filter(|r| r.timestamp >= midnight).count();
        let this_week = readings.iter().filter(|r| r.timestamp >= week_ago).count();

        let numeric: Vec<f64> = readings
            .iter()
            .filter_map(|r| extract_numeric(&r.value))
            .collect();

        let average = if numeric.is_empty() {
            0.0
        } else {
            let mean = numeric.iter().sum::<f64>() / numeric.len() as f64;
            (mean * 100.0).round() / 100.0
        };

        let mut trend = StatTrend::Stable;
        if numeric.len() >= 6 {
            let recent = numeric[..3].iter().sum::<f64>() / 3.0;
            let previous = numeric[3..6].iter().sum::<f64>() / 3.0;
            let change = ((recent - previous) / previous) * 100.0;
            if change > 5.0 {
                trend = StatTrend::Increasing;
            } else if change < -5.0 {
                trend = StatTrend::Decreasing;
            }
        }

        ReadingStats {
            total: readings.len(),
            today,
            this_week,
            average,
            latest: readings.first().cloned(),
            trend,
        }
    }
}

// ---

/// History for a single device, newest first, plus the fetch error flag for
/// bootstrap failures (one device failing never blocks the others).
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceHistory {
    readings: Vec<Reading>,
    pub fetch_error: Option<String>,
}

impl DeviceHistory {
    // ---
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Insert one reading; returns `false` (and changes nothing) when a
    /// reading with the same id is already present.
    fn insert(&mut self, reading: Reading) -> bool {
        // ---
        if self.readings.iter().any(|r| r.id == reading.id) {
            return false;
        }
        self.readings.push(reading);
        self.normalize();
        true
    }

    /// Restore the invariants: newest first, at most [`HISTORY_CAP`] entries.
    fn normalize(&mut self) {
        // ---
        self.readings
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.readings.truncate(HISTORY_CAP);
    }

    /// Filtered and re-sorted view; the store itself is not mutated.
    pub fn view(&self, period: FilterPeriod, order: SortOrder, now: DateTime<Utc>) -> Vec<Reading> {
        // ---
        let mut filtered: Vec<Reading> = match period.cutoff(now) {
            Some(cutoff) => self
                .readings
                .iter()
                .filter(|r| r.timestamp >= cutoff)
                .cloned()
                .collect(),
            None => self.readings.clone(),
        };

        filtered.sort_by(|a, b| match order {
            SortOrder::Newest => b.timestamp.cmp(&a.timestamp),
            SortOrder::Oldest => a.timestamp.cmp(&b.timestamp),
        });

        filtered
    }

    pub fn statistics(&self, now: DateTime<Utc>) -> ReadingStats {
        ReadingStats::compute(&self.readings, now)
    }
}

/// Keyed collection of device histories.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadingStore {
    histories: BTreeMap<i64, DeviceHistory>,
}

impl ReadingStore {
    // ---
    /// Fold one reading into its device history. Duplicate ids are ignored;
    /// returns whether the reading was actually stored.
    pub fn ingest(&mut self, reading: Reading) -> bool {
        // ---
        self.histories
            .entry(reading.device_id)
            .or_default()
            .insert(reading)
    }

    /// Replace a device's history wholesale from a bootstrap fetch.
    pub fn seed(&mut self, device_id: i64, readings: Vec<Reading>) {
        // ---
        let history = self.histories.entry(device_id).or_default();
        history.readings = readings;
        history.fetch_error = None;
        history.normalize();
    }

    /// Record a per-device fetch failure without touching existing readings.
    pub fn record_fetch_error(&mut self, device_id: i64, error: String) {
        // ---
        self.histories.entry(device_id).or_default().fetch_error = Some(error);
    }

    pub fn history(&self, device_id: i64) -> Option<&DeviceHistory> {
        self.histories.get(&device_id)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.histories.keys().copied()
    }

    pub fn total_readings(&self) -> usize {
        self.histories.values().map(|h| h.len()).sum()
    }
}

/// Local midnight of the current day, expressed in UTC.
pub(crate) fn local_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    // ---
    now.with_timezone(&Local)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        // DST can make local midnight nonexistent; a day back is the safe bound.
        .unwrap_or_else(|| now - Duration::days(1))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn reading(id: i64, device_id: i64, timestamp: DateTime<Utc>, value: serde_json::Value) -> Reading {
        // ---
        Reading {
            id,
            device_id,
            timestamp,
            value,
            created_at: timestamp,
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_ingest_is_idempotent_on_id() {
        // ---
        let mut store = ReadingStore::default();
        let now = base_time();

        assert!(store.ingest(reading(1, 7, now, json!(20.0))));
        assert!(!store.ingest(reading(1, 7, now + Duration::seconds(5), json!(21.0))));

        assert_eq!(store.history(7).map(|h| h.len()), Some(1));
    }

    #[test]
    fn test_history_sorted_descending_after_ingest() {
        // ---
        let mut store = ReadingStore::default();
        let now = base_time();

        // Out-of-order arrival
        for (id, offset) in [(1, 30), (2, 10), (3, 50), (4, 20)] {
            store.ingest(reading(id, 7, now + Duration::seconds(offset), json!(id)));
        }

        let stamps: Vec<_> = store
            .history(7)
            .expect("history exists")
            .readings()
            .iter()
            .map(|r| r.timestamp)
            .collect();
        let mut sorted = stamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn test_history_capped_at_limit() {
        // ---
        let mut store = ReadingStore::default();
        let now = base_time();

        for i in 0..(HISTORY_CAP as i64 + 25) {
            store.ingest(reading(i, 7, now + Duration::seconds(i), json!(i)));
        }

        let history = store.history(7).expect("history exists");
        assert_eq!(history.len(), HISTORY_CAP);
        // The newest entries survive the truncation
        assert_eq!(history.readings()[0].id, HISTORY_CAP as i64 + 24);
    }

    #[test]
    fn test_today_filter_excludes_before_local_midnight() {
        // ---
        let mut store = ReadingStore::default();
        let now = base_time();
        let midnight = local_midnight(now);

        store.ingest(reading(1, 7, midnight - Duration::minutes(1), json!(1)));
        store.ingest(reading(2, 7, midnight + Duration::minutes(1), json!(2)));
        store.ingest(reading(3, 7, now, json!(3)));

        let view = store
            .history(7)
            .expect("history exists")
            .view(FilterPeriod::Today, SortOrder::Newest, now);
        let ids: Vec<i64> = view.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&2) && ids.contains(&3));
        assert!(!ids.contains(&1));
    }

    #[test]
    fn test_week_and_month_filters() {
        // ---
        let mut store = ReadingStore::default();
        let now = base_time();

        store.ingest(reading(1, 7, now - Duration::days(10), json!(1)));
        store.ingest(reading(2, 7, now - Duration::days(3), json!(2)));
        store.ingest(reading(3, 7, now - Duration::days(40), json!(3)));

        let history = store.history(7).expect("history exists");

        let week: Vec<i64> = history
            .view(FilterPeriod::Week, SortOrder::Newest, now)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(week, vec![2]);

        let month: Vec<i64> = history
            .view(FilterPeriod::Month, SortOrder::Newest, now)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(month, vec![2, 1]);
    }

    #[test]
    fn test_sort_view_does_not_mutate_store() {
        // ---
        let mut store = ReadingStore::default();
        let now = base_time();

        store.ingest(reading(1, 7, now - Duration::seconds(20), json!(1)));
        store.ingest(reading(2, 7, now - Duration::seconds(10), json!(2)));

        let oldest_first = store
            .history(7)
            .expect("history exists")
            .view(FilterPeriod::All, SortOrder::Oldest, now);
        assert_eq!(oldest_first[0].id, 1);

        // Underlying order is still newest first
        assert_eq!(store.history(7).expect("history exists").readings()[0].id, 2);
    }

    #[test]
    fn test_statistics_empty() {
        // ---
        let stats = ReadingStats::compute(&[], base_time());

        assert_eq!(stats.total, 0);
        assert_eq!(stats.today, 0);
        assert_eq!(stats.this_week, 0);
        assert_eq!(stats.average, 0.0);
        assert!(stats.latest.is_none());
        assert_eq!(stats.trend, StatTrend::Stable);
    }

    #[test]
    fn test_statistics_average_skips_non_numeric() {
        // ---
        let now = base_time();
        let readings = vec![
            reading(1, 7, now, json!(10.0)),
            reading(2, 7, now - Duration::seconds(1), json!({"lux": 20.0})),
            reading(3, 7, now - Duration::seconds(2), json!("offline")),
            reading(4, 7, now - Duration::seconds(3), json!(33.0)),
        ];

        let stats = ReadingStats::compute(&readings, now);
        assert_eq!(stats.total, 4);
        // (10 + 20 + 33) / 3; the string reading is excluded
        assert_eq!(stats.average, 21.0);
        assert_eq!(stats.latest.as_ref().map(|r| r.id), Some(1));
    }

    #[test]
    fn test_statistics_average_rounds_to_two_decimals() {
        // ---
        let now = base_time();
        let readings = vec![
            reading(1, 7, now, json!(5.0)),
            reading(2, 7, now - Duration::seconds(1), json!(5.125)),
        ];

        let stats = ReadingStats::compute(&readings, now);
        assert_eq!(stats.average, 5.06);
    }

    #[test]
    fn test_statistics_trend_windows() {
        // ---
        let now = base_time();
        let series = |values: &[f64]| -> Vec<Reading> {
            values
                .iter()
                .enumerate()
                .map(|(i, v)| reading(i as i64, 7, now - Duration::seconds(i as i64), json!(v)))
                .collect()
        };

        // Newest-first: recent window [10,10,10] vs previous [5,5,5]
        let stats = ReadingStats::compute(&series(&[10.0, 10.0, 10.0, 5.0, 5.0, 5.0]), now);
        assert_eq!(stats.trend, StatTrend::Increasing);

        let stats = ReadingStats::compute(&series(&[5.0, 5.0, 5.0, 10.0, 10.0, 10.0]), now);
        assert_eq!(stats.trend, StatTrend::Decreasing);

        // Within the ±5% band
        let stats = ReadingStats::compute(&series(&[10.1, 10.0, 10.0, 10.0, 10.0, 10.0]), now);
        assert_eq!(stats.trend, StatTrend::Stable);

        // Fewer than six numeric samples is unconditionally stable
        let stats = ReadingStats::compute(&series(&[50.0, 1.0, 1.0, 1.0, 1.0]), now);
        assert_eq!(stats.trend, StatTrend::Stable);
    }

    #[test]
    fn test_fetch_error_flag_is_per_device() {
        // ---
        let mut store = ReadingStore::default();
        let now = base_time();

        store.seed(7, vec![reading(1, 7, now, json!(1))]);
        store.record_fetch_error(8, "Failed to load readings".to_string());

        assert!(store.history(7).expect("history").fetch_error.is_none());
        assert_eq!(
            store.history(8).expect("history").fetch_error.as_deref(),
            Some("Failed to load readings")
        );
        assert!(store.history(8).expect("history").is_empty());
    }

    #[test]
    fn test_seed_resorts_and_clears_error() {
        // ---
        let mut store = ReadingStore::default();
        let now = base_time();

        store.record_fetch_error(7, "boom".to_string());
        store.seed(
            7,
            vec![
                reading(1, 7, now - Duration::seconds(30), json!(1)),
                reading(2, 7, now, json!(2)),
            ],
        );

        let history = store.history(7).expect("history");
        assert!(history.fetch_error.is_none());
        assert_eq!(history.readings()[0].id, 2);
    }
}
