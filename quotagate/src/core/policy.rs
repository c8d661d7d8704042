//! Plan tiers and their limits
//!
//! A [`Plan`] describes how much an identity may use per period. Plans are
//! looked up by tier name through the [`QuotaPolicy`] trait; [`PlanTable`]
//! is the in-memory implementation.

use super::{Identity, QuotaError};

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tier for identities without an account
pub const GUEST_TIER: &str = "guest";
/// Tier for registered accounts without a subscription
pub const FREE_TIER: &str = "free";
/// Tier for paying accounts
pub const PRO_TIER: &str = "pro";

/// Limits for one tier
///
/// `None` means unlimited for that dimension. A limit of `Some(0)` blocks
/// every use.
///
/// # Example
///
/// ```
/// use quotagate::Plan;
///
/// let plan = Plan {
///     daily_generation_limit: Some(3),
///     weekly_generation_limit: Some(6),
///     ..Plan::unlimited("guest")
/// };
/// assert!(plan.limits_generations());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plan {
    /// Tier label
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub daily_generation_limit: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub weekly_generation_limit: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub monthly_generation_limit: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lifetime_generation_limit: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub weekly_catalog_quota: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub total_catalog_quota: Option<u64>,
    /// Display price, e.g. "9 EUR / month"
    #[cfg_attr(feature = "serde", serde(default))]
    pub price: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub recommended: bool,
}

impl Plan {
    /// A plan with no limits at all
    pub fn unlimited(name: impl Into<String>) -> Self {
        Plan {
            name: name.into(),
            daily_generation_limit: None,
            weekly_generation_limit: None,
            monthly_generation_limit: None,
            lifetime_generation_limit: None,
            weekly_catalog_quota: None,
            total_catalog_quota: None,
            price: None,
            recommended: false,
        }
    }

    /// A plan that denies everything
    ///
    /// Used when a tier cannot be resolved, so that a lookup failure never
    /// grants access.
    pub fn most_restrictive(name: impl Into<String>) -> Self {
        Plan {
            name: name.into(),
            daily_generation_limit: Some(0),
            weekly_generation_limit: Some(0),
            monthly_generation_limit: Some(0),
            lifetime_generation_limit: Some(0),
            weekly_catalog_quota: Some(0),
            total_catalog_quota: Some(0),
            price: None,
            recommended: false,
        }
    }

    /// Whether any generation limit is configured
    pub fn limits_generations(&self) -> bool {
        self.daily_generation_limit.is_some()
            || self.weekly_generation_limit.is_some()
            || self.monthly_generation_limit.is_some()
            || self.lifetime_generation_limit.is_some()
    }

    /// Whether any catalog limit is configured
    pub fn limits_catalog(&self) -> bool {
        self.weekly_catalog_quota.is_some() || self.total_catalog_quota.is_some()
    }
}

/// Lookup of plan limits by tier name
pub trait QuotaPolicy {
    /// Return the plan for `tier`
    ///
    /// # Errors
    ///
    /// [`QuotaError::UnknownTier`] if no plan is configured for `tier`.
    /// Callers must deny rather than fall back to an unlimited plan.
    fn limits_for(&self, tier: &str) -> Result<Plan, QuotaError>;
}

/// Derive the tier name from registration and subscription state
///
/// ```
/// use quotagate::{Identity, tier_for};
///
/// assert_eq!(tier_for(&Identity::Guest("x".into()), false), "guest");
/// assert_eq!(tier_for(&Identity::Account("1".into()), false), "free");
/// assert_eq!(tier_for(&Identity::Account("1".into()), true), "pro");
/// ```
pub fn tier_for(identity: &Identity, paid: bool) -> &'static str {
    match identity {
        Identity::Guest(_) => GUEST_TIER,
        Identity::Account(_) if paid => PRO_TIER,
        Identity::Account(_) => FREE_TIER,
    }
}

/// In-memory plan table keyed by tier name
#[derive(Debug, Clone)]
pub struct PlanTable {
    plans: HashMap<String, Plan>,
}

impl PlanTable {
    /// Create an empty table; every lookup fails until plans are inserted
    pub fn empty() -> Self {
        PlanTable {
            plans: HashMap::new(),
        }
    }

    /// Build a table from a list of plans, keyed by their names
    ///
    /// Later plans replace earlier ones with the same name.
    pub fn from_plans(plans: impl IntoIterator<Item = Plan>) -> Self {
        let mut table = Self::empty();
        for plan in plans {
            table.insert(plan);
        }
        table
    }

    pub fn insert(&mut self, plan: Plan) -> Option<Plan> {
        self.plans.insert(plan.name.clone(), plan)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Plans sorted by name, for display
    pub fn plans(&self) -> Vec<&Plan> {
        let mut plans: Vec<&Plan> = self.plans.values().collect();
        plans.sort_by(|a, b| a.name.cmp(&b.name));
        plans
    }
}

impl Default for PlanTable {
    /// The built-in tiers
    ///
    /// | Tier  | Daily | Weekly | Monthly | Lifetime | Catalog/week | Catalog total |
    /// |-------|-------|--------|---------|----------|--------------|---------------|
    /// | guest | 1     | 2      | 3       | -        | 5            | 10            |
    /// | free  | 1     | -      | -       | 7        | 15           | -             |
    /// | pro   | -     | -      | -       | -        | -            | -             |
    fn default() -> Self {
        PlanTable::from_plans([
            Plan {
                daily_generation_limit: Some(1),
                weekly_generation_limit: Some(2),
                monthly_generation_limit: Some(3),
                weekly_catalog_quota: Some(5),
                total_catalog_quota: Some(10),
                price: Some("0".to_string()),
                ..Plan::unlimited(GUEST_TIER)
            },
            Plan {
                daily_generation_limit: Some(1),
                lifetime_generation_limit: Some(7),
                weekly_catalog_quota: Some(15),
                price: Some("0".to_string()),
                ..Plan::unlimited(FREE_TIER)
            },
            Plan {
                price: Some("9 EUR / month".to_string()),
                recommended: true,
                ..Plan::unlimited(PRO_TIER)
            },
        ])
    }
}

impl QuotaPolicy for PlanTable {
    fn limits_for(&self, tier: &str) -> Result<Plan, QuotaError> {
        self.plans
            .get(tier)
            .cloned()
            .ok_or_else(|| QuotaError::UnknownTier(tier.to_string()))
    }
}
