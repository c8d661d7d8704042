//! Calendar period boundaries for quota rollover
//!
//! This module provides [`period_boundaries`], which maps an instant to the
//! day, ISO week and month it belongs to, and the [`Clock`] abstraction used
//! to inject the current time.
//!
//! All boundaries are computed on the UTC calendar. Periods are compared by
//! their start date rather than by week number, so a week that straddles a
//! year boundary is still a single period.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

#[cfg(test)]
mod tests;

/// The calendar periods an instant falls into
///
/// # Example
///
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use quotagate::period_boundaries;
///
/// // Thursday, 2024-02-15
/// let now = Utc.with_ymd_and_hms(2024, 2, 15, 13, 30, 0).unwrap();
/// let b = period_boundaries(now);
///
/// assert_eq!(b.day, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
/// assert_eq!(b.week_start, NaiveDate::from_ymd_opt(2024, 2, 12).unwrap());
/// assert_eq!(b.month_start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodBoundaries {
    /// Calendar date of the instant
    pub day: NaiveDate,
    /// The Monday on or before `day`
    pub week_start: NaiveDate,
    /// First day of `day`'s month
    pub month_start: NaiveDate,
}

/// Compute the day, week start and month start for `now`
///
/// An instant exactly on a boundary (midnight, Monday 00:00, the first of
/// the month) already belongs to the new period.
pub fn period_boundaries(now: DateTime<Utc>) -> PeriodBoundaries {
    let day = now.date_naive();
    let days_from_monday = u64::from(day.weekday().num_days_from_monday());

    // Both subtractions stay within the same month/week of a valid date,
    // so they cannot leave chrono's supported range.
    let week_start = day - Days::new(days_from_monday);
    let month_start = day - Days::new(u64::from(day.day0()));

    PeriodBoundaries {
        day,
        week_start,
        month_start,
    }
}

/// Source of the current instant
///
/// Production code uses [`SystemClock`]; tests pin time with [`FixedClock`].
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
