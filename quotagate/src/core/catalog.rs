//! Catalog-view quota
//!
//! Plans may cap how many catalog items an identity can open per week and in
//! total. These limits are independent of the generation limits: running out
//! of generations does not hide the catalog, and vice versa.

use super::evaluator::{DenyReason, Evaluation, check_limits, roll_over};
use super::period::period_boundaries;
use super::{CounterSnapshot, Plan};
use chrono::{DateTime, Utc};

/// Decide whether one more catalog item may be opened at `now`
///
/// Checked in order: total quota, then weekly quota.
pub fn evaluate_catalog_view(
    snapshot: &CounterSnapshot,
    plan: &Plan,
    now: DateTime<Utc>,
) -> Evaluation {
    let rolled = roll_over(snapshot, &period_boundaries(now));

    let checks = [
        (
            plan.total_catalog_quota,
            rolled.catalog_views_total,
            DenyReason::TotalCatalogQuotaExceeded,
        ),
        (
            plan.weekly_catalog_quota,
            rolled.catalog_views_this_week,
            DenyReason::WeeklyCatalogQuotaExceeded,
        ),
    ];

    let (decision, remaining) = check_limits(&checks);
    Evaluation {
        decision,
        snapshot: rolled,
        remaining,
    }
}
