//! HTTP/JSON transport
//!
//! # API Endpoints
//!
//! Identities are sent as `{"kind": "account" | "guest", "id": "..."}`.
//! Requests are evaluated at the server clock against the tier derived from
//! the identity: guests get `guest`, accounts get `free`.
//!
//! With `--trust-client-context`, for deployments where every caller is a
//! trusted backend, requests may also carry `tier`, `paid` (account has an
//! active subscription, giving `pro`) and `timestamp` (nanoseconds since the
//! Unix epoch). Otherwise those fields are ignored.
//!
//! ## POST /generate
//!
//! Cooldown check, quota check, generation, then commit.
//!
//! ```json
//! {
//!   "identity": { "kind": "account", "id": "42" },
//!   "prompt": "Fractions for year 5"
//! }
//! ```
//!
//! A denial is returned as data with `allowed: false`. A generation that
//! fails answers 502, one that times out answers 504; neither consumes quota.
//!
//! ## POST /entitlements/generation
//!
//! Whether a generation would be allowed right now. Consumes nothing.
//!
//! ## POST /catalog/view
//!
//! Consume one catalog view.
//!
//! ## GET /usage?kind=account&id=42
//!
//! Current counters for an identity.
//!
//! ## GET /plans, POST /guest, GET /health, GET /metrics
//!
//! Plan table, a fresh guest identity, liveness and Prometheus metrics.

use super::Transport;
use crate::actor::EntitlementHandle;
use crate::generator::{GenerationFailure, Generator, generate_with_timeout};
use crate::metrics::{Endpoint, Metrics};
use crate::types::{EntitlementRequest, EntitlementResponse, GenerationResponse, PlansResponse};
use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use chrono::DateTime;
use quotagate::{Action, Clock, Identity, SystemClock, tier_for};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Who is asking, as sent by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpEntitlementRequest {
    pub identity: Identity,
    /// Tier name (trusted callers only)
    pub tier: Option<String>,
    /// Whether the account has an active subscription (trusted callers only)
    pub paid: Option<bool>,
    /// Unix timestamp in nanoseconds (trusted callers only)
    pub timestamp: Option<i64>,
}

/// Body of `POST /generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpGenerateRequest {
    #[serde(flatten)]
    pub entitlement: HttpEntitlementRequest,
    pub prompt: String,
}

/// Query of `GET /usage`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageQuery {
    /// `account` or `guest`
    pub kind: String,
    pub id: String,
    pub tier: Option<String>,
    pub paid: Option<bool>,
    pub timestamp: Option<i64>,
}

/// Body of `POST /guest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestResponse {
    pub identity: Identity,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    pub error: String,
}

type HttpError = (StatusCode, Json<HttpErrorResponse>);

/// HTTP transport implementation
pub struct HttpTransport {
    host: String,
    port: u16,
    generator: Arc<dyn Generator>,
    generator_timeout: Duration,
    metrics: Arc<Metrics>,
    clock: Arc<dyn Clock + Send + Sync>,
    trust_client_context: bool,
}

impl HttpTransport {
    pub fn new(
        host: &str,
        port: u16,
        generator: Arc<dyn Generator>,
        generator_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            host: host.to_string(),
            port,
            generator,
            generator_timeout,
            metrics,
            clock: Arc::new(SystemClock),
            trust_client_context: false,
        }
    }

    /// Evaluate requests at `clock` instead of the system clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    /// Honor `tier`, `paid` and `timestamp` sent by callers
    pub fn trust_client_context(mut self, trust: bool) -> Self {
        self.trust_client_context = trust;
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(self, entitlements: EntitlementHandle) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.host, self.port).parse()?;
        let app = router(AppState {
            entitlements,
            generator: self.generator,
            generator_timeout: self.generator_timeout,
            metrics: self.metrics,
            clock: self.clock,
            trust_client_context: self.trust_client_context,
        });

        if self.trust_client_context {
            tracing::warn!("Trusting caller-supplied tier and timestamp");
        }
        tracing::info!("HTTP server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Shared state of every handler
pub struct AppState {
    pub entitlements: EntitlementHandle,
    pub generator: Arc<dyn Generator>,
    pub generator_timeout: Duration,
    pub metrics: Arc<Metrics>,
    pub clock: Arc<dyn Clock + Send + Sync>,
    pub trust_client_context: bool,
}

impl AppState {
    // Tier and instant come from the server unless callers are trusted
    fn resolve(&self, req: HttpEntitlementRequest) -> EntitlementRequest {
        if !self.trust_client_context {
            if req.tier.is_some() || req.paid.is_some() || req.timestamp.is_some() {
                tracing::debug!("Ignoring caller-supplied context for {}", req.identity);
            }
            return EntitlementRequest {
                tier: tier_for(&req.identity, false).to_string(),
                identity: req.identity,
                timestamp: self.clock.now(),
            };
        }

        let tier = req
            .tier
            .unwrap_or_else(|| tier_for(&req.identity, req.paid.unwrap_or(false)).to_string());
        let timestamp = match req.timestamp {
            Some(nanos) => DateTime::from_timestamp_nanos(nanos),
            None => self.clock.now(),
        };

        EntitlementRequest {
            identity: req.identity,
            tier,
            timestamp,
        }
    }
}

/// Build the axum router over `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(handle_generate))
        .route("/entitlements/generation", post(handle_check_generation))
        .route("/catalog/view", post(handle_catalog_view))
        .route("/usage", get(handle_usage))
        .route("/plans", get(handle_plans))
        .route("/guest", post(handle_guest))
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(handle_metrics))
        .with_state(Arc::new(state))
}

async fn handle_generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HttpGenerateRequest>,
) -> Result<Json<GenerationResponse>, HttpError> {
    let start = Instant::now();
    let entitlements = &state.entitlements;
    let request = state.resolve(req.entitlement);

    let admitted = match entitlements.admit_generation(request.clone()).await {
        Ok(admitted) => admitted,
        Err(e) => {
            state.metrics.record_error(Endpoint::Generate, elapsed_us(start));
            return Err(internal_error(e));
        }
    };
    if !admitted.allowed {
        state
            .metrics
            .record_request(Endpoint::Generate, elapsed_us(start), admitted.deny_reason);
        return Ok(Json(GenerationResponse {
            entitlement: admitted,
            output: None,
        }));
    }

    let output =
        match generate_with_timeout(state.generator.as_ref(), &req.prompt, state.generator_timeout)
            .await
        {
            Ok(output) => output,
            Err(failure) => {
                tracing::error!("{} for {}", failure, request.identity);
                let timed_out = matches!(failure, GenerationFailure::TimedOut(_));
                state.metrics.record_generation_failure(
                    Endpoint::Generate,
                    elapsed_us(start),
                    timed_out,
                );
                let status = if timed_out {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                };
                return Err((
                    status,
                    Json(HttpErrorResponse {
                        error: failure.to_string(),
                    }),
                ));
            }
        };

    let identity = request.identity.clone();
    let committed = observe(
        &state.metrics,
        Endpoint::Generate,
        start,
        entitlements.commit(request, Action::Generation).await,
    )?;

    if !committed.allowed {
        tracing::warn!(
            "{} lost the commit race: {}",
            identity,
            committed.reason.as_deref().unwrap_or("denied")
        );
        return Ok(Json(GenerationResponse {
            entitlement: committed,
            output: None,
        }));
    }

    Ok(Json(GenerationResponse {
        entitlement: committed,
        output: Some(output),
    }))
}

async fn handle_check_generation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HttpEntitlementRequest>,
) -> Result<Json<EntitlementResponse>, HttpError> {
    let start = Instant::now();
    let result = state
        .entitlements
        .check(state.resolve(req), Action::Generation)
        .await;
    observe(&state.metrics, Endpoint::Check, start, result).map(Json)
}

async fn handle_catalog_view(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HttpEntitlementRequest>,
) -> Result<Json<EntitlementResponse>, HttpError> {
    let start = Instant::now();
    let result = state
        .entitlements
        .commit(state.resolve(req), Action::CatalogView)
        .await;
    observe(&state.metrics, Endpoint::Catalog, start, result).map(Json)
}

async fn handle_usage(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<EntitlementResponse>, HttpError> {
    let start = Instant::now();
    let identity = match query.kind.as_str() {
        "account" => Identity::Account(query.id),
        "guest" => Identity::Guest(query.id),
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(HttpErrorResponse {
                    error: format!("Invalid identity kind: {other}. Valid options are: account, guest"),
                }),
            ));
        }
    };

    let request = state.resolve(HttpEntitlementRequest {
        identity,
        tier: query.tier,
        paid: query.paid,
        timestamp: query.timestamp,
    });
    let result = state.entitlements.usage(request).await;
    observe(&state.metrics, Endpoint::Usage, start, result).map(Json)
}

async fn handle_plans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PlansResponse>, HttpError> {
    let plans = state
        .entitlements
        .plans()
        .await
        .map_err(internal_error)?;
    Ok(Json(PlansResponse { plans }))
}

async fn handle_guest() -> Json<GuestResponse> {
    let identity = Identity::Guest(uuid::Uuid::new_v4().to_string());
    tracing::debug!("Issued {}", identity);
    Json(GuestResponse { identity })
}

async fn handle_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.export_prometheus(),
    )
}

fn observe(
    metrics: &Metrics,
    endpoint: Endpoint,
    start: Instant,
    result: Result<EntitlementResponse>,
) -> Result<EntitlementResponse, HttpError> {
    let latency_us = elapsed_us(start);
    match result {
        Ok(response) => {
            metrics.record_request(endpoint, latency_us, response.deny_reason);
            Ok(response)
        }
        Err(e) => {
            metrics.record_error(endpoint, latency_us);
            Err(internal_error(e))
        }
    }
}

fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

fn internal_error(e: anyhow::Error) -> HttpError {
    tracing::error!("Entitlement error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(HttpErrorResponse {
            error: format!("Internal server error: {e}"),
        }),
    )
}
