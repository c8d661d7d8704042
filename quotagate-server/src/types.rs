//! Common types used across the server
//!
//! Requests are what the transport hands to the actor after parsing; the
//! response types are serialized back to clients as JSON.

use chrono::{DateTime, Utc};
use quotagate::{CounterSnapshot, DenyReason, Evaluation, Identity, Plan};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Internal entitlement request
///
/// The tier is already resolved by the time a request reaches the actor.
#[derive(Debug, Clone)]
pub struct EntitlementRequest {
    pub identity: Identity,
    pub tier: String,
    /// Instant the request is evaluated at
    pub timestamp: DateTime<Utc>,
}

/// Counters shown to the user alongside a decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageView {
    pub generations_today: u64,
    pub generations_this_week: u64,
    pub generations_this_month: u64,
    pub generations_lifetime: u64,
    pub catalog_views_this_week: u64,
    pub catalog_views_total: u64,
    pub last_generation_at: Option<DateTime<Utc>>,
}

impl From<&CounterSnapshot> for UsageView {
    fn from(snapshot: &CounterSnapshot) -> Self {
        UsageView {
            generations_today: snapshot.generations_today,
            generations_this_week: snapshot.generations_this_week,
            generations_this_month: snapshot.generations_this_month,
            generations_lifetime: snapshot.generations_lifetime,
            catalog_views_this_week: snapshot.catalog_views_this_week,
            catalog_views_total: snapshot.catalog_views_total,
            last_generation_at: snapshot.last_generation_at,
        }
    }
}

/// Entitlement decision as returned to clients
///
/// # Example
///
/// ```json
/// {
///   "allowed": false,
///   "reason": "daily quota exceeded",
///   "message_key": "quota.daily_exceeded",
///   "remaining": 0,
///   "retry_after": 0,
///   "usage": { "generations_today": 1, "...": 0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementResponse {
    pub allowed: bool,
    /// Human-readable denial reason
    pub reason: Option<String>,
    /// Localization key for the denial
    pub message_key: Option<String>,
    /// Uses left under the tightest limit; `null` when unlimited
    pub remaining: Option<u64>,
    /// Seconds until the cooldown lifts (0 unless rate limited)
    pub retry_after: u64,
    pub usage: UsageView,
    #[serde(skip)]
    pub deny_reason: Option<DenyReason>,
}

impl EntitlementResponse {
    /// Denial produced by the submission cooldown
    ///
    /// `usage` is the current quota evaluation; its remaining headroom and
    /// counters are reported unchanged.
    pub fn rate_limited(retry_after: Duration, usage: &Evaluation) -> Self {
        let reason = DenyReason::RateLimited;
        EntitlementResponse {
            allowed: false,
            reason: Some(reason.to_string()),
            message_key: Some(reason.message_key().to_string()),
            remaining: usage.remaining,
            retry_after: ceil_secs(retry_after),
            usage: UsageView::from(&usage.snapshot),
            deny_reason: Some(reason),
        }
    }
}

impl From<&Evaluation> for EntitlementResponse {
    fn from(evaluation: &Evaluation) -> Self {
        let reason = evaluation.reason();
        EntitlementResponse {
            allowed: evaluation.is_allowed(),
            reason: reason.map(|r| r.to_string()),
            message_key: reason.map(|r| r.message_key().to_string()),
            remaining: evaluation.remaining,
            retry_after: 0,
            usage: UsageView::from(&evaluation.snapshot),
            deny_reason: reason,
        }
    }
}

/// Outcome of a full generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(flatten)]
    pub entitlement: EntitlementResponse,
    /// Generated text, present only when the generation was allowed and
    /// succeeded
    pub output: Option<String>,
}

/// Plan as shown on the billing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlansResponse {
    pub plans: Vec<Plan>,
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotagate::Decision;

    #[test]
    fn test_denied_evaluation_carries_message_key() {
        let snapshot = CounterSnapshot {
            generations_today: 1,
            ..CounterSnapshot::default()
        };
        let evaluation = Evaluation {
            decision: Decision::Deny(DenyReason::DailyQuotaExceeded),
            snapshot,
            remaining: Some(0),
        };

        let response = EntitlementResponse::from(&evaluation);
        assert!(!response.allowed);
        assert_eq!(response.message_key.as_deref(), Some("quota.daily_exceeded"));
        assert_eq!(response.remaining, Some(0));
        assert_eq!(response.usage.generations_today, 1);
    }

    #[test]
    fn test_allowed_evaluation_has_no_reason() {
        let evaluation = Evaluation {
            decision: Decision::Allow,
            snapshot: CounterSnapshot::default(),
            remaining: None,
        };

        let response = EntitlementResponse::from(&evaluation);
        assert!(response.allowed);
        assert_eq!(response.reason, None);
        assert_eq!(response.message_key, None);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["remaining"].is_null());
    }

    fn allowed_usage(remaining: Option<u64>) -> Evaluation {
        Evaluation {
            decision: Decision::Allow,
            snapshot: CounterSnapshot::default(),
            remaining,
        }
    }

    #[test]
    fn test_rate_limited_rounds_retry_after_up() {
        let response =
            EntitlementResponse::rate_limited(Duration::from_millis(12_300), &allowed_usage(None));
        assert!(!response.allowed);
        assert_eq!(response.retry_after, 13);
        assert_eq!(response.message_key.as_deref(), Some("rate.cooldown"));
    }

    #[test]
    fn test_rate_limited_keeps_quota_headroom() {
        let response =
            EntitlementResponse::rate_limited(Duration::from_secs(5), &allowed_usage(Some(2)));
        assert_eq!(response.remaining, Some(2));
        assert_eq!(response.deny_reason, Some(DenyReason::RateLimited));
    }

    #[test]
    fn test_generation_response_flattens_decision() {
        let response = GenerationResponse {
            entitlement: EntitlementResponse::rate_limited(
                Duration::from_secs(5),
                &allowed_usage(None),
            ),
            output: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["allowed"], false);
        assert_eq!(json["retry_after"], 5);
        assert!(json["output"].is_null());
    }
}
