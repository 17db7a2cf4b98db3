//! Axum-based HTTP gateway.
//!
//! Routes:
//! - `POST /api/register`, `POST /api/login`: account handlers
//! - `GET|POST /api/messages`: chat messages
//! - `GET /metrics`: Prometheus exposition (not instrumented)
//! - `GET /health`: liveness (not instrumented)
//!
//! Every `/api` route sits behind a 64KB body limit and a request timeout,
//! both wrapped by the instrumentation middleware. The whole router sits
//! behind CORS.

mod auth;
mod messages;

use crate::auth::{PasswordHasher, SystemClock, TokenIssuer};
use crate::config::Config;
use crate::error::ApiError;
use crate::observability::metrics::PROMETHEUS_CONTENT_TYPE;
use crate::observability::{
    instrument, run_memory_sampler, MetricsSink, PrometheusSink, MEMORY_SAMPLE_INTERVAL,
};
use crate::store::{self, CredentialStore, MessageStore, Stores};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<dyn CredentialStore>,
    pub messages: Arc<dyn MessageStore>,
    pub hasher: Arc<PasswordHasher>,
    pub tokens: Arc<TokenIssuer>,
    pub metrics: Arc<PrometheusSink>,
}

impl AppState {
    pub fn new(
        stores: Stores,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
        metrics: PrometheusSink,
    ) -> Self {
        Self {
            credentials: stores.credentials,
            messages: stores.messages,
            hasher: Arc::new(hasher),
            tokens: Arc::new(tokens),
            metrics: Arc::new(metrics),
        }
    }

    /// Build production state: configured store, wall clock, fresh registry.
    pub fn from_config(config: &Config) -> Result<Self> {
        let stores = store::create_stores(&config.store)?;
        let hasher = PasswordHasher::new(config.auth.hash_rounds);
        let tokens = TokenIssuer::new(
            config.auth.jwt_secret.as_deref(),
            Duration::from_secs(config.auth.token_ttl_secs),
            Arc::new(SystemClock),
        );
        if !tokens.has_key() {
            tracing::warn!(
                "No JWT signing secret configured (set {} or [auth] jwt_secret); logins will fail",
                crate::config::ENV_JWT_SECRET
            );
        }
        let metrics = PrometheusSink::new().context("Failed to register request metrics")?;

        Ok(Self::new(stores, hasher, tokens, metrics))
    }
}

/// Assemble the full router.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let sink: Arc<dyn MetricsSink> = state.metrics.clone();

    let api = Router::new()
        .route("/api/register", post(auth::handle_register))
        .route("/api/login", post(auth::handle_login))
        .route(
            "/api/messages",
            get(messages::handle_list_messages).post(messages::handle_post_message),
        );
    let api = instrumented(api, sink, request_timeout);

    let public = Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .route_layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    // CORS: any origin, no cookies; tokens travel in the Authorization header
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    public.merge(api).with_state(state).layer(cors)
}

/// Wrap API routes in body limit, timeout and instrumentation.
///
/// `instrument` is the outermost route layer, so the 413 and 408 produced by
/// the inner layers are the statuses it records.
fn instrumented<S>(
    routes: Router<S>,
    sink: Arc<dyn MetricsSink>,
    timeout: Duration,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes
        .route_layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .route_layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .route_layer(axum::middleware::from_fn_with_state(sink, instrument))
}

/// Run blocking store or KDF work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!(error = %e, "Blocking task failed");
        ApiError::internal("Internal server error.")
    })
}

/// Run the HTTP gateway until Ctrl-C.
pub async fn run_gateway(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let sampler = tokio::spawn(run_memory_sampler(
        state.metrics.clone(),
        MEMORY_SAMPLE_INTERVAL,
    ));

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.gateway.host, config.gateway.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "Chat gateway listening");

    let app = build_router(
        state,
        Duration::from_secs(config.gateway.request_timeout_secs),
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sampler.abort();
    tracing::info!("Chat gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

/// GET /health: always public
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /metrics: Prometheus text exposition
async fn handle_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
