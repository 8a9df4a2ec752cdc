//! Temporal range types for time-based search.
//!
//! A [`DateRange`] is a half-open interval `[start, end)` over UTC
//! timestamps. Convenience constructors cover the query shapes the search
//! layer accepts: an explicit range, a calendar year, a year + month, or a
//! single day.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Half-open UTC time interval, start inclusive, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Explicit range. `end` must not precede `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidInput(format!(
                "date range end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Range from two calendar dates, both interpreted as whole days
    /// (start-of-day to end-of-day).
    pub fn between_dates(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let start_dt = start_of_day(start);
        let end_dt = start_of_day(end.succ_opt().ok_or_else(|| {
            Error::InvalidInput(format!("date {} has no successor", end))
        })?);
        Self::new(start_dt, end_dt)
    }

    /// The whole calendar year.
    pub fn year(year: i32) -> Result<Self> {
        let start = ymd(year, 1, 1)?;
        let end = ymd(year + 1, 1, 1)?;
        Ok(Self {
            start: start_of_day(start),
            end: start_of_day(end),
        })
    }

    /// One calendar month. `month` is 1-12.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = ymd(year, month, 1)?;
        let end = if month == 12 {
            ymd(year + 1, 1, 1)?
        } else {
            ymd(year, month + 1, 1)?
        };
        Ok(Self {
            start: start_of_day(start),
            end: start_of_day(end),
        })
    }

    /// A single calendar day.
    pub fn day(date: NaiveDate) -> Result<Self> {
        Self::between_dates(date, date)
    }

    /// Whether a timestamp falls inside the range.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        Error::InvalidInput(format!("invalid calendar date {}-{}-{}", year, month, day))
    })
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is always valid"))
}

/// Summary statistics over a set of item timestamps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineStats {
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub total_items: u64,
    /// Item counts keyed by calendar year.
    pub items_by_year: std::collections::BTreeMap<i32, u64>,
}

impl TimelineStats {
    /// Accumulate one timestamp into the stats.
    pub fn record(&mut self, ts: DateTime<Utc>) {
        self.total_items += 1;
        self.earliest = Some(self.earliest.map_or(ts, |e| e.min(ts)));
        self.latest = Some(self.latest.map_or(ts, |l| l.max(ts)));
        *self.items_by_year.entry(ts.year()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_year_range_boundaries() {
        let range = DateRange::year(2025).unwrap();
        assert!(range.contains(ts("2025-01-01T00:00:00Z")));
        assert!(range.contains(ts("2025-12-31T23:59:59Z")));
        assert!(!range.contains(ts("2024-12-31T23:59:59Z")));
        assert!(!range.contains(ts("2026-01-01T00:00:00Z")));
    }

    #[test]
    fn test_month_range_december_wraps_year() {
        let range = DateRange::month(2024, 12).unwrap();
        assert!(range.contains(ts("2024-12-25T12:00:00Z")));
        assert!(!range.contains(ts("2025-01-01T00:00:00Z")));
    }

    #[test]
    fn test_single_day() {
        let range = DateRange::day(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()).unwrap();
        assert!(range.contains(ts("2025-06-15T00:00:00Z")));
        assert!(range.contains(ts("2025-06-15T23:59:59Z")));
        assert!(!range.contains(ts("2025-06-16T00:00:00Z")));
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(DateRange::month(2025, 13).is_err());
    }

    #[test]
    fn test_reversed_range_rejected() {
        let a = ts("2025-06-15T00:00:00Z");
        let b = ts("2025-06-14T00:00:00Z");
        assert!(DateRange::new(a, b).is_err());
    }

    #[test]
    fn test_timeline_stats_record() {
        let mut stats = TimelineStats::default();
        stats.record(ts("2024-12-25T10:00:00Z"));
        stats.record(ts("2025-06-15T10:00:00Z"));
        stats.record(ts("2025-01-10T10:00:00Z"));

        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.earliest.unwrap(), ts("2024-12-25T10:00:00Z"));
        assert_eq!(stats.latest.unwrap(), ts("2025-06-15T10:00:00Z"));
        assert_eq!(stats.items_by_year[&2025], 2);
        assert_eq!(stats.items_by_year[&2024], 1);
    }
}
