use super::Identity;
use super::period::Clock;
use chrono::{DateTime, Utc};

/// Everything an entitlement check needs to know about the caller
///
/// Built by the transport layer from the identity provider's output and
/// passed explicitly to every engine entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub identity: Identity,
    /// Tier name the identity currently qualifies for
    pub tier: String,
    /// The instant the request is evaluated at
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(identity: Identity, tier: impl Into<String>, now: DateTime<Utc>) -> Self {
        RequestContext {
            identity,
            tier: tier.into(),
            now,
        }
    }

    /// Build a context stamped with `clock`'s current time
    pub fn from_clock(identity: Identity, tier: impl Into<String>, clock: &impl Clock) -> Self {
        Self::new(identity, tier, clock.now())
    }
}
