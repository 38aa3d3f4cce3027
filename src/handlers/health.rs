//! Edge liveness endpoint.
//!
//! `GET /health` is served outside the middleware pipeline: it is never
//! rate limited and never rejected by origin or content checks.
//!
//! # Response Body
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "mode": "development",
//!   "version": "0.1.0",
//!   "timestamp": "2024-01-15T10:30:00Z",
//!   "uptime_seconds": 42,
//!   "rate_limit_records": 3
//! }
//! ```

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        mode: state.config.mode.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.uptime_seconds(),
        rate_limit_records: state.limiter.len(),
    })
}
