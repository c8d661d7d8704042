use super::*;
use chrono::TimeZone;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_midweek_instant() {
    // Wednesday
    let now = Utc.with_ymd_and_hms(2024, 5, 22, 18, 45, 12).unwrap();
    let b = period_boundaries(now);

    assert_eq!(b.day, date(2024, 5, 22));
    assert_eq!(b.week_start, date(2024, 5, 20));
    assert_eq!(b.month_start, date(2024, 5, 1));
}

#[test]
fn test_monday_midnight_starts_new_week() {
    let now = Utc.with_ymd_and_hms(2024, 5, 27, 0, 0, 0).unwrap();
    let b = period_boundaries(now);

    assert_eq!(b.day, date(2024, 5, 27));
    assert_eq!(b.week_start, date(2024, 5, 27));

    // One second earlier is still the previous week (Sunday)
    let before = now - chrono::Duration::seconds(1);
    let b = period_boundaries(before);
    assert_eq!(b.day, date(2024, 5, 26));
    assert_eq!(b.week_start, date(2024, 5, 20));
}

#[test]
fn test_first_of_month_starts_new_month() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let b = period_boundaries(now);
    assert_eq!(b.month_start, date(2024, 6, 1));

    let before = now - chrono::Duration::seconds(1);
    assert_eq!(period_boundaries(before).month_start, date(2024, 5, 1));
}

#[test]
fn test_week_spanning_year_boundary() {
    // Wednesday 2025-01-01 belongs to the week starting Monday 2024-12-30
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
    let b = period_boundaries(now);

    assert_eq!(b.week_start, date(2024, 12, 30));
    assert_eq!(b.month_start, date(2025, 1, 1));

    // Same week seen from the previous year
    let earlier = Utc.with_ymd_and_hms(2024, 12, 31, 9, 0, 0).unwrap();
    assert_eq!(period_boundaries(earlier).week_start, b.week_start);
}

#[test]
fn test_leap_day() {
    let now = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
    let b = period_boundaries(now);

    assert_eq!(b.day, date(2024, 2, 29));
    assert_eq!(b.week_start, date(2024, 2, 26));
    assert_eq!(b.month_start, date(2024, 2, 1));
}

#[test]
fn test_deterministic() {
    let now = Utc.with_ymd_and_hms(2023, 11, 9, 7, 0, 0).unwrap();
    assert_eq!(period_boundaries(now), period_boundaries(now));
}

#[test]
fn test_fixed_clock() {
    let now = Utc.with_ymd_and_hms(2023, 11, 9, 7, 0, 0).unwrap();
    let clock = FixedClock(now);
    assert_eq!(clock.now(), now);
    assert_eq!(clock.now(), now);
}
