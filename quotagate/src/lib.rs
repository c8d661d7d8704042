//! # quotagate
//!
//! Period-based usage quotas for per-user entitlements.
//!
//! ## Overview
//!
//! quotagate decides, for a registered user or an anonymous guest, whether
//! one more AI generation (or one more catalog view) is allowed under
//! daily, weekly, monthly and lifetime limits:
//!
//! - **Rollover before checking**: counters reset when the calendar day, ISO
//!   week or month changes, each period independently
//! - **Denials are data**: being over quota is a [`Decision`], never an error
//! - **Fail closed**: an unknown tier is denied, not treated as unlimited
//! - **Race-free commits**: check-and-increment is a single compare-and-swap
//!
//! ## Quick Start
//!
//! ```
//! use chrono::Utc;
//! use quotagate::{Entitlements, Identity, MemoryStore, PlanTable, RequestContext};
//!
//! let mut engine = Entitlements::new(MemoryStore::new(), PlanTable::default());
//! let ctx = RequestContext::new(Identity::Account("42".into()), "free", Utc::now());
//!
//! let check = engine.check_generation(&ctx)?;
//! if check.is_allowed() {
//!     // ... call the generation service, then:
//!     let committed = engine.commit_generation(&ctx)?;
//!     println!("remaining today: {:?}", committed.remaining);
//! } else if let Some(reason) = check.reason() {
//!     println!("denied: {}", reason.message_key());
//! }
//! # Ok::<(), quotagate::QuotaError>(())
//! ```
//!
//! ## Pure building blocks
//!
//! The engine is a thin loop over pure functions that can be used directly:
//!
//! ```
//! use chrono::Utc;
//! use quotagate::{CounterSnapshot, Plan, evaluate, record};
//!
//! let plan = Plan { daily_generation_limit: Some(1), ..Plan::unlimited("guest") };
//! let now = Utc::now();
//!
//! let first = evaluate(&CounterSnapshot::default(), &plan, now);
//! assert!(first.is_allowed());
//!
//! let used = record(&first.snapshot, now);
//! let second = evaluate(&used, &plan, now);
//! assert!(!second.is_allowed());
//! ```
//!
//! ## Submission cooldown
//!
//! [`Cooldown`] is a separate, process-local gate that stops rapid repeated
//! submissions. A request must pass both the cooldown and the quota check.
//!
//! ## Thread Safety
//!
//! The engine is not thread-safe. For concurrent access, wrap it in a mutex
//! or own it from a single task:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use quotagate::{Entitlements, MemoryStore, PlanTable};
//!
//! let engine = Arc::new(Mutex::new(Entitlements::new(MemoryStore::new(), PlanTable::default())));
//! ```
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for faster hashing
//! - `serde`: Serialize and deserialize plans, identities and snapshots

pub mod core;

pub use core::{
    Action, Clock, Cooldown, CooldownBuilder, CounterSnapshot, CounterStore, Decision,
    DenyReason, Entitlements, Evaluation, FREE_TIER, FixedClock, GUEST_TIER, Identity,
    MemoryStore, MemoryStoreBuilder, PRO_TIER, PeriodBoundaries, Plan, PlanTable, QuotaError,
    QuotaPolicy, RequestContext, SystemClock, evaluate, evaluate_catalog_view, period_boundaries,
    record, record_catalog_view, roll_over, tier_for,
};

pub use crate::core::store;
