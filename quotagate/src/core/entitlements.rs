//! The entitlement engine
//!
//! This module provides [`Entitlements`], which ties a [`CounterStore`] and a
//! [`QuotaPolicy`] together and runs the load, evaluate, record and save
//! sequence for one identity.

use super::catalog::evaluate_catalog_view;
use super::evaluator::{Decision, DenyReason, Evaluation, evaluate};
use super::recorder::{record, record_catalog_view};
use super::{CounterSnapshot, CounterStore, Plan, QuotaError, QuotaPolicy, RequestContext};

// Compare-and-swap attempts before giving up on a contended identity
const MAX_RETRIES: u32 = 10;

/// What a request wants to consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// An AI generation
    Generation,
    /// Opening one catalog item
    CatalogView,
}

impl Action {
    fn evaluate(self, snapshot: &CounterSnapshot, plan: &Plan, ctx: &RequestContext) -> Evaluation {
        match self {
            Action::Generation => evaluate(snapshot, plan, ctx.now),
            Action::CatalogView => evaluate_catalog_view(snapshot, plan, ctx.now),
        }
    }

    fn apply(self, snapshot: &CounterSnapshot, ctx: &RequestContext) -> CounterSnapshot {
        match self {
            Action::Generation => record(snapshot, ctx.now),
            Action::CatalogView => record_catalog_view(snapshot),
        }
    }
}

/// Quota enforcement over a store and a policy
///
/// Every write goes through [`CounterStore::compare_and_swap`], so two
/// sessions racing on the same identity cannot both spend the last unit of
/// quota: the loser re-reads the winner's snapshot and is evaluated again.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use quotagate::{Entitlements, Identity, MemoryStore, PlanTable, RequestContext};
///
/// let mut engine = Entitlements::new(MemoryStore::new(), PlanTable::default());
/// let ctx = RequestContext::new(Identity::Guest("tab-1".into()), "guest", Utc::now());
///
/// // Guests get one generation per day
/// assert!(engine.commit_generation(&ctx).unwrap().is_allowed());
/// assert!(!engine.commit_generation(&ctx).unwrap().is_allowed());
/// ```
pub struct Entitlements<S: CounterStore, P: QuotaPolicy> {
    store: S,
    policy: P,
}

impl<S: CounterStore, P: QuotaPolicy> Entitlements<S, P> {
    pub fn new(store: S, policy: P) -> Self {
        Entitlements { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Check whether a generation would be allowed, without consuming quota
    ///
    /// Period rollover is persisted even when the answer is a denial.
    pub fn check_generation(&mut self, ctx: &RequestContext) -> Result<Evaluation, QuotaError> {
        self.check(ctx, Action::Generation)
    }

    /// Atomically check and consume one generation
    ///
    /// On denial only the rollover is persisted. The returned snapshot is
    /// the one now stored.
    pub fn commit_generation(&mut self, ctx: &RequestContext) -> Result<Evaluation, QuotaError> {
        self.commit(ctx, Action::Generation)
    }

    pub fn check_catalog_view(&mut self, ctx: &RequestContext) -> Result<Evaluation, QuotaError> {
        self.check(ctx, Action::CatalogView)
    }

    pub fn commit_catalog_view(&mut self, ctx: &RequestContext) -> Result<Evaluation, QuotaError> {
        self.commit(ctx, Action::CatalogView)
    }

    /// Current usage as of `ctx.now`, for display
    ///
    /// The rolled snapshot is returned but not written back. Counters are
    /// never written beyond the store lazily creating a zero record for an
    /// identity it has not seen.
    pub fn usage(&mut self, ctx: &RequestContext) -> Result<Evaluation, QuotaError> {
        let current = self.store.load(&ctx.identity).map_err(QuotaError::Persistence)?;
        let plan = self.resolve_plan(ctx)?;
        Ok(Self::decide(Action::Generation, &current, plan.as_ref(), ctx))
    }

    /// Evaluate `action` and persist the rollover
    pub fn check(&mut self, ctx: &RequestContext, action: Action) -> Result<Evaluation, QuotaError> {
        let plan = self.resolve_plan(ctx)?;
        self.transact(ctx, |current| {
            Self::decide(action, current, plan.as_ref(), ctx)
        })
    }

    /// Evaluate `action` and, if allowed, record it in the same write
    pub fn commit(&mut self, ctx: &RequestContext, action: Action) -> Result<Evaluation, QuotaError> {
        let plan = self.resolve_plan(ctx)?;
        self.transact(ctx, |current| {
            let evaluation = Self::decide(action, current, plan.as_ref(), ctx);
            if !evaluation.is_allowed() {
                return evaluation;
            }

            Evaluation {
                decision: Decision::Allow,
                snapshot: action.apply(&evaluation.snapshot, ctx),
                remaining: evaluation.remaining.map(|r| r.saturating_sub(1)),
            }
        })
    }

    // Unknown tiers resolve to `None` and are denied by `decide`
    fn resolve_plan(&self, ctx: &RequestContext) -> Result<Option<Plan>, QuotaError> {
        match self.policy.limits_for(&ctx.tier) {
            Ok(plan) => Ok(Some(plan)),
            Err(QuotaError::UnknownTier(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn decide(
        action: Action,
        current: &CounterSnapshot,
        plan: Option<&Plan>,
        ctx: &RequestContext,
    ) -> Evaluation {
        match plan {
            Some(plan) => action.evaluate(current, plan, ctx),
            None => {
                // Fail closed: still roll periods over, but deny
                let restrictive = Plan::most_restrictive(ctx.tier.as_str());
                let evaluation = action.evaluate(current, &restrictive, ctx);
                Evaluation {
                    decision: Decision::Deny(DenyReason::UnknownTier),
                    remaining: Some(0),
                    ..evaluation
                }
            }
        }
    }

    /// Load, compute the next snapshot, and write it back if it changed
    ///
    /// Retries when a concurrent writer replaced the snapshot between the
    /// load and the write.
    fn transact<F>(&mut self, ctx: &RequestContext, step: F) -> Result<Evaluation, QuotaError>
    where
        F: Fn(&CounterSnapshot) -> Evaluation,
    {
        let mut retries = 0;

        loop {
            let current = self.store.load(&ctx.identity).map_err(QuotaError::Persistence)?;
            let evaluation = step(&current);

            if evaluation.snapshot == current {
                return Ok(evaluation);
            }

            let swapped = self
                .store
                .compare_and_swap(&ctx.identity, &current, evaluation.snapshot.clone())
                .map_err(QuotaError::Persistence)?;

            if swapped {
                return Ok(evaluation);
            }

            retries += 1;
            if retries >= MAX_RETRIES {
                return Err(QuotaError::Internal("Max retries exceeded".into()));
            }
        }
    }
}
