//! Date ranges
//!
//! Two range types with different boundary rules:
//! - `DateRange` is inclusive on both ends. Camps run "June 9 to June 13" and
//!   the 13th is a camp day.
//! - `ReportingPeriod` is half-open `[from, to)`. Consecutive months tile
//!   without double counting revenue on the boundary day.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CampError;

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CampError> {
        if end < start {
            return Err(CampError::invalid("end_date", "must not be before start_date"));
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days, counting both ends
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Overlap with a half-open reporting period
    pub fn overlaps_period(&self, period: &ReportingPeriod) -> bool {
        self.start < period.to && period.from <= self.end
    }

    /// 1-based day number of `date` inside the range
    pub fn day_number(&self, date: NaiveDate) -> Option<u32> {
        if self.contains(date) {
            u32::try_from((date - self.start).num_days() + 1).ok()
        } else {
            None
        }
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.days()).map(move |offset| start + Duration::days(offset))
    }
}

/// Half-open `[from, to)` period used for every revenue and dashboard filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportingPeriod {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, CampError> {
        if from >= to {
            return Err(CampError::invalid("to", "must be after from"));
        }
        Ok(Self { from, to })
    }

    /// Calendar month `year-month`
    pub fn month(year: i32, month: u32) -> Result<Self, CampError> {
        let from = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| CampError::invalid("month", "is not a valid month"))?;
        let to = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| CampError::invalid("month", "is out of range"))?;
        Ok(Self { from, to })
    }

    /// The month containing `date`
    pub fn month_of(date: NaiveDate) -> Result<Self, CampError> {
        Self::month(date.year(), date.month())
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.from <= date && date < self.to
    }

    /// Instants are bucketed by their UTC calendar date
    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.contains_date(instant.date_naive())
    }

    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days()
    }

    /// UTC midnight at the start of `from`, for timestamp comparisons in SQL
    pub fn from_instant(&self) -> DateTime<Utc> {
        self.from.and_time(NaiveTime::MIN).and_utc()
    }

    /// UTC midnight at the start of `to` (exclusive bound)
    pub fn to_instant(&self) -> DateTime<Utc> {
        self.to.and_time(NaiveTime::MIN).and_utc()
    }
}

/// Parse `YYYY-MM-DD`, naming the field on failure
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, CampError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| CampError::invalid(field, "must be a date in YYYY-MM-DD format"))
}

/// Whole years between `birth_date` and `on`
pub fn age_on(birth_date: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - birth_date.year();
    if (on.month(), on.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let camp = DateRange::new(d(2026, 6, 8), d(2026, 6, 12)).unwrap();
        assert_eq!(camp.days(), 5);
        assert!(camp.contains(d(2026, 6, 8)));
        assert!(camp.contains(d(2026, 6, 12)));
        assert!(!camp.contains(d(2026, 6, 13)));
        assert_eq!(camp.day_number(d(2026, 6, 8)), Some(1));
        assert_eq!(camp.day_number(d(2026, 6, 12)), Some(5));
        assert_eq!(camp.day_number(d(2026, 6, 7)), None);
        assert_eq!(camp.iter_days().count(), 5);
    }

    #[test]
    fn test_single_day_range_and_rejects_inverted() {
        let one = DateRange::new(d(2026, 7, 1), d(2026, 7, 1)).unwrap();
        assert_eq!(one.days(), 1);
        assert!(DateRange::new(d(2026, 7, 2), d(2026, 7, 1)).is_err());
    }

    #[test]
    fn test_reporting_period_is_half_open() {
        let june = ReportingPeriod::month(2026, 6).unwrap();
        assert_eq!(june.from, d(2026, 6, 1));
        assert_eq!(june.to, d(2026, 7, 1));
        assert_eq!(june.days(), 30);
        assert!(june.contains_date(d(2026, 6, 30)));
        assert!(!june.contains_date(d(2026, 7, 1)));

        let december = ReportingPeriod::month(2026, 12).unwrap();
        assert_eq!(december.to, d(2027, 1, 1));

        assert!(ReportingPeriod::new(d(2026, 1, 1), d(2026, 1, 1)).is_err());
    }

    #[test]
    fn test_overlaps_period() {
        let june = ReportingPeriod::month(2026, 6).unwrap();
        let straddles = DateRange::new(d(2026, 5, 29), d(2026, 6, 2)).unwrap();
        let starts_on_boundary = DateRange::new(d(2026, 7, 1), d(2026, 7, 3)).unwrap();
        assert!(straddles.overlaps_period(&june));
        assert!(!starts_on_boundary.overlaps_period(&june));
    }

    #[test]
    fn test_age_on() {
        assert_eq!(age_on(d(2016, 6, 10), d(2026, 6, 9)), 9);
        assert_eq!(age_on(d(2016, 6, 10), d(2026, 6, 10)), 10);
        assert_eq!(age_on(d(2016, 2, 29), d(2026, 2, 28)), 9);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("from", "2026-06-01").unwrap(), d(2026, 6, 1));
        assert!(parse_date("from", "06/01/2026").is_err());
    }
}
