//! Cache epochs: ISO calendar weeks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// One ISO week (Monday-anchored), rendered `YYYY-Www`.
///
/// Ordering follows time: `2024-W52 < 2025-W01 < 2025-W02`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheEpoch {
    year: i32,
    week: u32,
}

impl CacheEpoch {
    /// Build an epoch from an ISO year and week number.
    ///
    /// Returns `None` if the week does not exist in that ISO year.
    #[must_use]
    pub fn new(year: i32, week: u32) -> Option<Self> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).map(|_| Self { year, week })
    }

    /// The epoch containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        let w = date.iso_week();
        Self {
            year: w.year(),
            week: w.week(),
        }
    }

    /// The epoch containing `instant`, evaluated in that instant's time zone.
    #[must_use]
    pub fn at<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self::from_date(instant.date_naive())
    }

    /// The epoch for the local wall-clock date.
    #[must_use]
    pub fn current() -> Self {
        Self::at(&Local::now())
    }

    /// ISO year.
    #[must_use]
    pub fn year(self) -> i32 {
        self.year
    }

    /// ISO week number (1..=53).
    #[must_use]
    pub fn week(self) -> u32 {
        self.week
    }

    /// Monday that starts this epoch.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }

    /// The following epoch.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.first_day()
            .and_then(|d| d.checked_add_days(chrono::Days::new(7)))
            .map(Self::from_date)
    }
}

impl fmt::Display for CacheEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for CacheEpoch {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || CacheError::InvalidEpoch(s.to_owned());
        let (year, week) = s.split_once("-W").ok_or_else(bad)?;
        if week.len() != 2 {
            return Err(bad());
        }
        let year: i32 = year.parse().map_err(|_| bad())?;
        let week: u32 = week.parse().map_err(|_| bad())?;
        Self::new(year, week).ok_or_else(bad)
    }
}

impl TryFrom<String> for CacheEpoch {
    type Error = CacheError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CacheEpoch> for String {
    fn from(e: CacheEpoch) -> Self {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_date_uses_iso_week() {
        // 2025-03-10 is the Monday of ISO week 11.
        let d = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(CacheEpoch::from_date(d).to_string(), "2025-W11");
        // The Sunday before still belongs to week 10.
        let d = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(CacheEpoch::from_date(d).to_string(), "2025-W10");
    }

    #[test]
    fn test_year_boundary() {
        // 2024-12-30 belongs to ISO 2025-W01.
        let d = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(CacheEpoch::from_date(d).to_string(), "2025-W01");
    }

    #[test]
    fn test_parse_and_display_agree() {
        let e: CacheEpoch = "2025-W03".parse().unwrap();
        assert_eq!(e.year(), 2025);
        assert_eq!(e.week(), 3);
        assert_eq!(e.to_string(), "2025-W03");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("2025-11".parse::<CacheEpoch>().is_err());
        assert!("2025-W1".parse::<CacheEpoch>().is_err());
        assert!("2025-W54".parse::<CacheEpoch>().is_err());
        // 2025 has only 52 ISO weeks.
        assert!("2025-W53".parse::<CacheEpoch>().is_err());
        assert!("2020-W53".parse::<CacheEpoch>().is_ok());
    }

    #[test]
    fn test_ordering_is_chronological() {
        let a: CacheEpoch = "2024-W52".parse().unwrap();
        let b: CacheEpoch = "2025-W01".parse().unwrap();
        assert!(a < b);
        assert_eq!(a.next(), Some(b));
    }

    #[test]
    fn test_serde_as_string() {
        let e: CacheEpoch = "2025-W11".parse().unwrap();
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, "\"2025-W11\"");
        let back: CacheEpoch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
        assert!(serde_json::from_str::<CacheEpoch>("\"nope\"").is_err());
    }
}
