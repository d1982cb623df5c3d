//! Calendar windows used by weekly reports.
//!
//! Boundaries are timezone-naive: a week runs from Monday 00:00:00 to the
//! following Sunday 23:59:59, and timestamps are compared by their UTC
//! wall-clock value.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use crate::Time;

const LAST_SECOND_OF_DAY: i64 = 24 * 60 * 60 - 1;

fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn end_of(date: NaiveDate) -> NaiveDateTime {
    start_of(date) + Duration::seconds(LAST_SECOND_OF_DAY)
}

/// `date` moved by `days`, saturating at the calendar limits.
fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// An inclusive timestamp range at second granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First instant in range
    pub start: NaiveDateTime,
    /// Last second in range
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Whole days from `first` to `last`, both inclusive.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: start_of(first),
            end: end_of(last),
        }
    }

    /// Whether `ts` falls inside the range.
    pub fn contains(&self, ts: Time) -> bool {
        let ts = ts.naive_utc();
        self.start <= ts && ts - self.end < Duration::seconds(1)
    }

    /// Whether a calendar date falls inside the range.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start.date() <= date && date <= self.end.date()
    }
}

/// A Monday-to-Sunday week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    /// Monday 00:00:00
    pub start: NaiveDateTime,
    /// Sunday 23:59:59
    pub end: NaiveDateTime,
}

/// The week containing `date`.
///
/// Weeks that cross the representable calendar are cut at its first or
/// last day.
pub fn week_window(date: NaiveDate) -> WeekWindow {
    let monday = shift(date, -(date.weekday().num_days_from_monday() as i64));
    let sunday = shift(date, 6 - date.weekday().num_days_from_monday() as i64);
    WeekWindow {
        start: start_of(monday),
        end: end_of(sunday),
    }
}

impl WeekWindow {
    /// The week containing today's local date.
    pub fn current() -> Self {
        week_window(chrono::Local::now().date_naive())
    }

    /// Monday of the week.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Sunday of the week.
    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    /// The week as a timestamp range.
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }

    /// Whether `ts` falls inside the week.
    pub fn contains(&self, ts: Time) -> bool {
        self.range().contains(ts)
    }

    /// Whether a calendar date falls inside the week.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.range().contains_date(date)
    }
}

/// Reporting period for completed-work listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// The week containing the reference date
    Week,
    /// The calendar month containing the reference date
    Month,
    /// No date restriction
    All,
}

impl Period {
    /// Resolve to a range around `reference`. `All` is unbounded.
    pub fn resolve(&self, reference: NaiveDate) -> Option<DateRange> {
        match self {
            Period::Week => Some(week_window(reference).range()),
            Period::Month => {
                let first = shift(reference, -(reference.day0() as i64));
                let last = first
                    .checked_add_months(Months::new(1))
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(NaiveDate::MAX);
                Some(DateRange::days(first, last))
            }
            Period::All => None,
        }
    }

    /// String form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::All => "all",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "all" => Ok(Period::All),
            other => Err(format!("unknown period '{}' (expected week, month or all)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_window_midweek() {
        // Wednesday
        let week = week_window(date(2024, 3, 6));
        assert_eq!(week.start_date(), date(2024, 3, 4));
        assert_eq!(week.end_date(), date(2024, 3, 10));
        assert_eq!(week.start.time(), NaiveTime::MIN);
        assert_eq!(week.end.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn test_week_window_sunday_rolls_back() {
        let week = week_window(date(2024, 3, 10));
        assert_eq!(week.start_date(), date(2024, 3, 4));
        assert_eq!(week.end_date(), date(2024, 3, 10));
    }

    #[test]
    fn test_week_window_monday_is_start() {
        let week = week_window(date(2024, 3, 4));
        assert_eq!(week.start_date(), date(2024, 3, 4));
    }

    #[test]
    fn test_week_window_bounds_hold_for_every_day() {
        let mut day = date(2023, 12, 1);
        while day < date(2025, 2, 1) {
            let week = week_window(day);
            assert!(week.start_date() <= day && day <= week.end_date());
            assert_eq!(week.start_date().weekday(), Weekday::Mon);
            assert_eq!(week.end_date().weekday(), Weekday::Sun);
            assert_eq!(week.end_date() - week.start_date(), Duration::days(6));
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_week_contains_edges() {
        let week = week_window(date(2024, 3, 6));
        let first = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 3, 3, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();

        assert!(week.contains(first));
        assert!(week.contains(last));
        assert!(!week.contains(before));
        assert!(!week.contains(after));
        assert!(week.contains_date(date(2024, 3, 10)));
        assert!(!week.contains_date(date(2024, 3, 11)));
    }

    #[test]
    fn test_period_month() {
        let range = Period::Month.resolve(date(2024, 2, 14)).unwrap();
        assert_eq!(range.start.date(), date(2024, 2, 1));
        assert_eq!(range.end.date(), date(2024, 2, 29));

        let range = Period::Month.resolve(date(2023, 12, 31)).unwrap();
        assert_eq!(range.start.date(), date(2023, 12, 1));
        assert_eq!(range.end.date(), date(2023, 12, 31));
    }

    #[test]
    fn test_calendar_limits_saturate() {
        let last = week_window(NaiveDate::MAX);
        assert_eq!(last.end_date(), NaiveDate::MAX);
        assert!(last.start_date() <= NaiveDate::MAX);
        assert_eq!(last.start_date().weekday(), Weekday::Mon);
        assert!(last.contains_date(NaiveDate::MAX));

        let first = week_window(NaiveDate::MIN);
        assert_eq!(first.start_date(), NaiveDate::MIN);
        assert!(first.contains_date(NaiveDate::MIN));

        let month = Period::Month.resolve(NaiveDate::MAX).unwrap();
        assert_eq!(month.end.date(), NaiveDate::MAX);
        assert_eq!(month.start.date().day(), 1);

        let ts = Utc.from_utc_datetime(&NaiveDate::MAX.and_hms_opt(23, 59, 59).unwrap());
        assert!(last.contains(ts));
    }

    #[test]
    fn test_period_all_is_unbounded() {
        assert!(Period::All.resolve(date(2024, 2, 14)).is_none());
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("Week".parse::<Period>().unwrap(), Period::Week);
        assert_eq!("all".parse::<Period>().unwrap(), Period::All);
        assert!("year".parse::<Period>().is_err());
    }
}
