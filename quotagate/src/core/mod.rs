//! Core components of the quotagate entitlement library
//!
//! This module contains the fundamental building blocks:
//! - [`period`]: Day, week and month boundaries of an instant
//! - [`snapshot`]: Identities and their usage counters
//! - [`policy`]: Plan tiers and their limits
//! - [`evaluator`]: Period rollover and limit checks
//! - [`catalog`]: Catalog-view limit checks
//! - [`recorder`]: Usage increments
//! - [`cooldown`]: Short-window submission gate
//! - [`store`]: Storage backends for usage counters
//! - [`entitlements`]: The engine tying store, policy and evaluator together

pub mod catalog;
pub mod context;
pub mod cooldown;
pub mod entitlements;
pub mod evaluator;
pub mod period;
pub mod policy;
pub mod recorder;
pub mod snapshot;
pub mod store;

pub use catalog::evaluate_catalog_view;
pub use context::RequestContext;
pub use cooldown::{Cooldown, CooldownBuilder};
pub use entitlements::{Action, Entitlements};
pub use evaluator::{Decision, DenyReason, Evaluation, evaluate, roll_over};
pub use period::{Clock, FixedClock, PeriodBoundaries, SystemClock, period_boundaries};
pub use policy::{FREE_TIER, GUEST_TIER, PRO_TIER, Plan, PlanTable, QuotaPolicy, tier_for};
pub use recorder::{record, record_catalog_view};
pub use snapshot::{CounterSnapshot, Identity};
pub use store::{CounterStore, MemoryStore, MemoryStoreBuilder};

use std::error::Error;
use std::fmt;

/// Errors that can occur during entitlement operations
///
/// Being over quota is not an error; it is reported as a
/// [`Decision::Deny`]. These variants cover infrastructure failures only.
///
/// # Variants
///
/// - [`UnknownTier`](QuotaError::UnknownTier): No plan is configured for the tier
/// - [`Persistence`](QuotaError::Persistence): The counter store failed to read or write
/// - [`Internal`](QuotaError::Internal): An internal error occurred (e.g. contention)
///
/// # Example
///
/// ```
/// use quotagate::{PlanTable, QuotaError, QuotaPolicy};
///
/// let table = PlanTable::default();
/// match table.limits_for("platinum") {
///     Err(QuotaError::UnknownTier(tier)) => println!("no plan for {tier}"),
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaError {
    /// No plan is configured for the tier
    UnknownTier(String),
    /// The counter store failed; the action must not be treated as committed
    Persistence(String),
    /// An internal error occurred
    Internal(String),
}

impl fmt::Display for QuotaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaError::UnknownTier(tier) => write!(f, "unknown tier: {tier}"),
            QuotaError::Persistence(msg) => write!(f, "persistence error: {msg}"),
            QuotaError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl Error for QuotaError {}
