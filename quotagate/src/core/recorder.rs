//! Usage recording
//!
//! These are pure transformations. They do not check limits: call them only
//! after an allowing evaluation, and persist the result through a
//! [`CounterStore`](super::CounterStore).

use super::CounterSnapshot;
use chrono::{DateTime, Utc};

/// Count one successful generation
///
/// Increments the daily, weekly, monthly and lifetime counters and stamps
/// `last_generation_at`. Counters saturate instead of wrapping.
///
/// ```
/// use chrono::Utc;
/// use quotagate::{CounterSnapshot, record};
///
/// let now = Utc::now();
/// let after = record(&CounterSnapshot::default(), now);
/// assert_eq!(after.generations_lifetime, 1);
/// assert_eq!(after.last_generation_at, Some(now));
/// ```
pub fn record(snapshot: &CounterSnapshot, now: DateTime<Utc>) -> CounterSnapshot {
    CounterSnapshot {
        generations_today: snapshot.generations_today.saturating_add(1),
        generations_this_week: snapshot.generations_this_week.saturating_add(1),
        generations_this_month: snapshot.generations_this_month.saturating_add(1),
        generations_lifetime: snapshot.generations_lifetime.saturating_add(1),
        last_generation_at: Some(now),
        ..snapshot.clone()
    }
}

/// Count one opened catalog item
pub fn record_catalog_view(snapshot: &CounterSnapshot) -> CounterSnapshot {
    CounterSnapshot {
        catalog_views_this_week: snapshot.catalog_views_this_week.saturating_add(1),
        catalog_views_total: snapshot.catalog_views_total.saturating_add(1),
        ..snapshot.clone()
    }
}
