//! Request instrumentation middleware.
//!
//! Wraps a handler so that its final status code and wall-clock duration are
//! recorded exactly once, whatever path the handler took to produce its
//! response. The response itself passes through untouched.
//!
//! ```ignore
//! let sink: Arc<dyn MetricsSink> = metrics.clone();
//! Router::new()
//!     .route("/api/login", post(handle_login))
//!     .route_layer(axum::middleware::from_fn_with_state(sink, instrument));
//! ```

use super::metrics::{MetricsSink, RequestOutcome};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;

/// Time the inner service and record `(method, status, duration)`.
///
/// An axum response always carries a status; handlers that never set one
/// produce `200 OK`, which is what gets recorded. All per-request state lives
/// on this future's stack, so concurrent requests never share it.
pub async fn instrument(
    State(sink): State<Arc<dyn MetricsSink>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    let outcome = RequestOutcome {
        method,
        status: response.status().as_u16(),
        duration: start.elapsed(),
    };
    tracing::debug!(
        method = %outcome.method,
        status = outcome.status,
        duration_ms = outcome.duration.as_millis() as u64,
        "request completed"
    );
    outcome.record(sink.as_ref());

    response
}
