//! # quotagate-server
//!
//! An HTTP service that decides whether a user or guest may run another AI
//! generation or open another catalog item.
//!
//! The [`quotagate`] engine and the submission cooldown live inside a single
//! actor task; HTTP handlers talk to it through a cloneable
//! [`EntitlementHandle`](actor::EntitlementHandle). Every operation on the
//! counters is serialized by the actor, and commits additionally go through
//! the store's compare-and-swap.
//!
//! ## Generation flow
//!
//! 1. Cooldown: at most one generation per identity every `--cooldown-seconds`
//! 2. Quota: the identity's plan limits, after period rollover
//! 3. Generation, bounded by `--generator-timeout-ms`
//! 4. Commit: counters move only once the content exists
//!
//! ## Running
//!
//! ```bash
//! quotagate --http-port 8080 --store file --store-path counters.json
//! quotagate --plans-file plans.toml --cooldown-seconds 10
//! quotagate --list-env-vars
//! ```
//!
//! A plans file lists the tiers:
//!
//! ```toml
//! [[plans]]
//! name = "free"
//! daily_generation_limit = 1
//! lifetime_generation_limit = 7
//! weekly_catalog_quota = 15
//!
//! [[plans]]
//! name = "pro"
//! price = "9 EUR / month"
//! recommended = true
//! ```

pub mod actor;
pub mod config;
pub mod file_store;
pub mod generator;
pub mod metrics;
pub mod plans;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(test)]
mod actor_tests;
