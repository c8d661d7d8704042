use crate::types::{EntitlementRequest, EntitlementResponse};
use anyhow::Result;
use quotagate::{
    Action, Cooldown, CounterStore, DenyReason, Entitlements, Evaluation, Plan, PlanTable,
    QuotaError, RequestContext,
};
use tokio::sync::{mpsc, oneshot};

/// Engine type owned by the actor
pub type Engine = Entitlements<Box<dyn CounterStore + Send>, PlanTable>;

/// Message types for the entitlement actor
pub enum EntitlementMessage {
    /// Cooldown plus quota check ahead of a generation
    Admit {
        request: EntitlementRequest,
        response_tx: oneshot::Sender<Result<EntitlementResponse>>,
    },
    Check {
        request: EntitlementRequest,
        action: Action,
        response_tx: oneshot::Sender<Result<EntitlementResponse>>,
    },
    Commit {
        request: EntitlementRequest,
        action: Action,
        response_tx: oneshot::Sender<Result<EntitlementResponse>>,
    },
    Usage {
        request: EntitlementRequest,
        response_tx: oneshot::Sender<Result<EntitlementResponse>>,
    },
    Plans {
        response_tx: oneshot::Sender<Vec<Plan>>,
    },
}

/// Handle to communicate with the entitlement actor
#[derive(Clone)]
pub struct EntitlementHandle {
    tx: mpsc::Sender<EntitlementMessage>,
}

impl EntitlementHandle {
    /// Gate a generation: cooldown first, then quota
    ///
    /// An allowed admission starts the identity's cooldown window but
    /// consumes no quota; call [`commit`](Self::commit) once the content
    /// exists.
    pub async fn admit_generation(&self, request: EntitlementRequest) -> Result<EntitlementResponse> {
        self.call(|response_tx| EntitlementMessage::Admit {
            request,
            response_tx,
        })
        .await?
    }

    /// Check an action without consuming quota
    pub async fn check(
        &self,
        request: EntitlementRequest,
        action: Action,
    ) -> Result<EntitlementResponse> {
        self.call(|response_tx| EntitlementMessage::Check {
            request,
            action,
            response_tx,
        })
        .await?
    }

    /// Atomically check and consume one unit of `action`
    pub async fn commit(
        &self,
        request: EntitlementRequest,
        action: Action,
    ) -> Result<EntitlementResponse> {
        self.call(|response_tx| EntitlementMessage::Commit {
            request,
            action,
            response_tx,
        })
        .await?
    }

    /// Current usage, without writing anything
    pub async fn usage(&self, request: EntitlementRequest) -> Result<EntitlementResponse> {
        self.call(|response_tx| EntitlementMessage::Usage {
            request,
            response_tx,
        })
        .await?
    }

    /// Configured plans, ordered by name
    pub async fn plans(&self) -> Result<Vec<Plan>> {
        self.call(|response_tx| EntitlementMessage::Plans { response_tx })
            .await
    }

    async fn call<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> EntitlementMessage,
    ) -> Result<T> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send(message(response_tx))
            .await
            .map_err(|_| anyhow::anyhow!("Entitlement actor has shut down"))?;

        response_rx
            .await
            .map_err(|_| anyhow::anyhow!("Entitlement actor dropped response channel"))
    }
}

/// The entitlement actor
///
/// Owns the engine and the cooldown limiter. Messages are handled one at a
/// time, so no two operations on the same identity ever interleave.
pub struct EntitlementActor;

impl EntitlementActor {
    /// Spawn a new actor around `engine`
    pub fn spawn(
        buffer_size: usize,
        engine: Engine,
        cooldown: Cooldown,
        cooldown_seconds: u64,
    ) -> EntitlementHandle {
        let (tx, rx) = mpsc::channel(buffer_size);

        tokio::spawn(async move {
            let state = ActorState {
                engine,
                cooldown,
                cooldown_seconds,
            };
            run_actor(rx, state).await;
        });

        EntitlementHandle { tx }
    }
}

struct ActorState {
    engine: Engine,
    cooldown: Cooldown,
    cooldown_seconds: u64,
}

async fn run_actor(mut rx: mpsc::Receiver<EntitlementMessage>, mut state: ActorState) {
    while let Some(msg) = rx.recv().await {
        // Ignore send errors - receiver may have timed out
        match msg {
            EntitlementMessage::Admit {
                request,
                response_tx,
            } => {
                let _ = response_tx.send(state.admit(request));
            }
            EntitlementMessage::Check {
                request,
                action,
                response_tx,
            } => {
                let ctx = context(request);
                let response = state.engine.check(&ctx, action);
                let _ = response_tx.send(respond(&ctx, action, response));
            }
            EntitlementMessage::Commit {
                request,
                action,
                response_tx,
            } => {
                let ctx = context(request);
                let response = state.engine.commit(&ctx, action);
                let _ = response_tx.send(respond(&ctx, action, response));
            }
            EntitlementMessage::Usage {
                request,
                response_tx,
            } => {
                let ctx = context(request);
                let response = state
                    .engine
                    .usage(&ctx)
                    .map(|evaluation| EntitlementResponse::from(&evaluation))
                    .map_err(|e| anyhow::anyhow!("Usage lookup failed: {}", e));
                let _ = response_tx.send(response);
            }
            EntitlementMessage::Plans { response_tx } => {
                let plans = state.engine.policy().plans().into_iter().cloned().collect();
                let _ = response_tx.send(plans);
            }
        }
    }

    tracing::info!("Entitlement actor shutting down");
}

impl ActorState {
    fn admit(&mut self, request: EntitlementRequest) -> Result<EntitlementResponse> {
        let ctx = context(request);
        let key = ctx.identity.storage_key();

        if let Some(wait) = self.cooldown.retry_after(&key, self.cooldown_seconds, ctx.now) {
            let usage = self
                .engine
                .usage(&ctx)
                .map_err(|e| anyhow::anyhow!("Usage lookup failed: {}", e))?;
            tracing::debug!("{} rate limited for {}s", ctx.identity, wait.as_secs());
            return Ok(EntitlementResponse::rate_limited(wait, &usage));
        }

        let evaluation = self.engine.check_generation(&ctx);
        let response = respond(&ctx, Action::Generation, evaluation)?;
        if response.allowed {
            self.cooldown.allow(&key, self.cooldown_seconds, ctx.now);
        }

        Ok(response)
    }
}

fn context(request: EntitlementRequest) -> RequestContext {
    RequestContext::new(request.identity, request.tier, request.timestamp)
}

fn respond(
    ctx: &RequestContext,
    action: Action,
    evaluation: Result<Evaluation, QuotaError>,
) -> Result<EntitlementResponse> {
    let evaluation = evaluation.map_err(|e| {
        tracing::error!("Entitlement evaluation failed for {}: {}", ctx.identity, e);
        anyhow::anyhow!("Entitlement evaluation failed: {}", e)
    })?;

    match evaluation.reason() {
        None => tracing::debug!("{} allowed {:?}", ctx.identity, action),
        Some(DenyReason::UnknownTier) => {
            tracing::warn!("{} denied: no plan for tier {:?}", ctx.identity, ctx.tier)
        }
        Some(reason) => tracing::debug!("{} denied {:?}: {}", ctx.identity, action, reason),
    }

    Ok(EntitlementResponse::from(&evaluation))
}
