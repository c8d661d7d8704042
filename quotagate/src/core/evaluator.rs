//! Entitlement evaluation: period rollover followed by limit checks
//!
//! [`evaluate`] is a pure function of a snapshot, a plan and an instant. It
//! never fails: being over quota is a [`Decision::Deny`] value, not an error.
//!
//! # Check order
//!
//! Generation limits are checked from the coarsest period to the finest:
//! **lifetime, monthly, weekly, daily**. The first exceeded limit is the
//! reported reason, so a user over both their weekly and daily limits is told
//! about the weekly one (the one that will take longest to clear).

use super::period::{PeriodBoundaries, period_boundaries};
use super::{CounterSnapshot, Plan};
use chrono::{DateTime, Utc};
use std::fmt;

/// Outcome of an entitlement check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(*reason),
        }
    }
}

/// Why an action was refused
///
/// Each reason maps to one stable [`message_key`](DenyReason::message_key)
/// that the presentation layer can localize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    DailyQuotaExceeded,
    WeeklyQuotaExceeded,
    MonthlyQuotaExceeded,
    LifetimeQuotaExceeded,
    WeeklyCatalogQuotaExceeded,
    TotalCatalogQuotaExceeded,
    /// The submission cooldown has not elapsed
    RateLimited,
    /// The tier has no configured plan
    UnknownTier,
}

impl DenyReason {
    /// Stable localization key for this reason
    pub fn message_key(&self) -> &'static str {
        match self {
            DenyReason::DailyQuotaExceeded => "quota.daily_exceeded",
            DenyReason::WeeklyQuotaExceeded => "quota.weekly_exceeded",
            DenyReason::MonthlyQuotaExceeded => "quota.monthly_exceeded",
            DenyReason::LifetimeQuotaExceeded => "quota.lifetime_exceeded",
            DenyReason::WeeklyCatalogQuotaExceeded => "catalog.weekly_exceeded",
            DenyReason::TotalCatalogQuotaExceeded => "catalog.total_exceeded",
            DenyReason::RateLimited => "rate.cooldown",
            DenyReason::UnknownTier => "plan.unknown_tier",
        }
    }

    /// Whether this is a quota denial, as opposed to a cooldown or policy one
    pub fn is_quota(&self) -> bool {
        !matches!(self, DenyReason::RateLimited | DenyReason::UnknownTier)
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenyReason::DailyQuotaExceeded => "daily quota exceeded",
            DenyReason::WeeklyQuotaExceeded => "weekly quota exceeded",
            DenyReason::MonthlyQuotaExceeded => "monthly quota exceeded",
            DenyReason::LifetimeQuotaExceeded => "lifetime quota exceeded",
            DenyReason::WeeklyCatalogQuotaExceeded => "weekly catalog quota exceeded",
            DenyReason::TotalCatalogQuotaExceeded => "total catalog quota exceeded",
            DenyReason::RateLimited => "submitting too quickly",
            DenyReason::UnknownTier => "no plan configured for tier",
        };
        f.write_str(text)
    }
}

/// Result of evaluating a snapshot against a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: Decision,
    /// The snapshot after rollover (and after recording, when the evaluation
    /// came from a commit). Must be persisted whatever the decision.
    pub snapshot: CounterSnapshot,
    /// Uses left before the tightest configured limit is hit; `None` when
    /// unlimited
    pub remaining: Option<u64>,
}

impl Evaluation {
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }

    pub fn reason(&self) -> Option<DenyReason> {
        self.decision.reason()
    }
}

/// Reset every counter whose stored anchor differs from `boundaries`
///
/// Each period rolls independently: a new day clears only the daily
/// counter. Anchors are compared for equality, not ordering, so an anchor
/// dated in the future (clock skew) is treated as stale and reset instead of
/// blocking resets forever. Lifetime and total counters are never touched.
///
/// Applying the same boundaries twice is a no-op.
pub fn roll_over(snapshot: &CounterSnapshot, boundaries: &PeriodBoundaries) -> CounterSnapshot {
    let mut rolled = snapshot.clone();

    if rolled.period_anchor_day != Some(boundaries.day) {
        rolled.generations_today = 0;
        rolled.period_anchor_day = Some(boundaries.day);
    }

    if rolled.period_anchor_week_start != Some(boundaries.week_start) {
        rolled.generations_this_week = 0;
        rolled.period_anchor_week_start = Some(boundaries.week_start);
    }

    if rolled.period_anchor_month_start != Some(boundaries.month_start) {
        rolled.generations_this_month = 0;
        rolled.period_anchor_month_start = Some(boundaries.month_start);
    }

    if rolled.catalog_anchor_week_start != Some(boundaries.week_start) {
        rolled.catalog_views_this_week = 0;
        rolled.catalog_anchor_week_start = Some(boundaries.week_start);
    }

    rolled
}

/// Decide whether one more generation is allowed at `now`
///
/// Rollover is applied first, then the configured limits are checked in the
/// order documented at module level. A limit is exceeded once the counter
/// has reached it.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use quotagate::{CounterSnapshot, Plan, evaluate};
///
/// let plan = Plan { daily_generation_limit: Some(3), ..Plan::unlimited("guest") };
/// let eval = evaluate(&CounterSnapshot::default(), &plan, Utc::now());
///
/// assert!(eval.is_allowed());
/// assert_eq!(eval.remaining, Some(3));
/// ```
pub fn evaluate(snapshot: &CounterSnapshot, plan: &Plan, now: DateTime<Utc>) -> Evaluation {
    let rolled = roll_over(snapshot, &period_boundaries(now));

    let checks = [
        (
            plan.lifetime_generation_limit,
            rolled.generations_lifetime,
            DenyReason::LifetimeQuotaExceeded,
        ),
        (
            plan.monthly_generation_limit,
            rolled.generations_this_month,
            DenyReason::MonthlyQuotaExceeded,
        ),
        (
            plan.weekly_generation_limit,
            rolled.generations_this_week,
            DenyReason::WeeklyQuotaExceeded,
        ),
        (
            plan.daily_generation_limit,
            rolled.generations_today,
            DenyReason::DailyQuotaExceeded,
        ),
    ];

    let (decision, remaining) = check_limits(&checks);
    Evaluation {
        decision,
        snapshot: rolled,
        remaining,
    }
}

/// Walk `(limit, used, reason)` triples in order
///
/// Returns the first exceeded limit's reason (or `Allow`) and the smallest
/// headroom across all configured limits.
pub(crate) fn check_limits(checks: &[(Option<u64>, u64, DenyReason)]) -> (Decision, Option<u64>) {
    let mut decision = Decision::Allow;
    let mut remaining: Option<u64> = None;

    for &(limit, used, reason) in checks {
        let Some(limit) = limit else {
            continue;
        };

        if used >= limit && decision.is_allowed() {
            decision = Decision::Deny(reason);
        }

        let headroom = limit.saturating_sub(used);
        remaining = Some(remaining.map_or(headroom, |r| r.min(headroom)));
    }

    (decision, remaining)
}
