//! Edge routing configuration with middleware stack.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← echoes or generates X-Request-Id
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response spans
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  guard (route)   │ ← security headers, origin, validation,
//! │                  │   rate limit, logger, performance
//! └────────┬─────────┘   403 / 405 / 413 / 415 / 429 short-circuit
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Route Groups
//!
//! - `/health` - liveness (no guard)
//! - `/api/auth/{login,register,logout}` - Session Relay
//! - `/api/products` - product list proxy

use std::sync::Arc;

use axum::Router;
use axum::handler::Handler;
use axum::http::Method;
use axum::middleware::from_fn_with_state;
use axum::routing::{MethodRouter, any, get};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::{
    GuardedRoute, MiddlewareChain, MiddlewareOptions, RequestIdLayer, ValidationOptions, guard,
};
use crate::state::AppState;

/// Wrap `handler` in the pipeline for every method.
///
/// The method allow-list is enforced by the validator stage, so a wrong
/// method gets the JSON 405 envelope rather than axum's bare 405.
fn guarded<H, T>(
    handler: H,
    chain: &Arc<MiddlewareChain>,
    options: MiddlewareOptions,
) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    any(handler).layer(from_fn_with_state(
        GuardedRoute::new(chain.clone(), options),
        guard,
    ))
}

/// Build the edge router with all routes and middleware configured.
pub fn build_router(state: AppState) -> Router {
    let chain = state.chain.clone();
    let defaults = MiddlewareOptions::from_config(&state.config);

    info!(
        mode = %state.config.mode,
        origin_validation = defaults.origin_validation,
        logging = defaults.logging,
        performance = defaults.performance,
        backend = %state.backend.base_url(),
        "Middleware pipeline configured"
    );

    let json_post = defaults
        .clone()
        .with_validation(ValidationOptions::methods(&[Method::POST]));
    let bodyless_post = defaults
        .clone()
        .with_validation(ValidationOptions::methods(&[Method::POST]).without_content_type_check());
    let read_only = defaults.with_validation(ValidationOptions::methods(&[Method::GET]));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/auth/login",
            guarded(handlers::login, &chain, json_post.clone()),
        )
        .route(
            "/api/auth/register",
            guarded(handlers::register, &chain, json_post),
        )
        .route(
            "/api/auth/logout",
            guarded(handlers::logout, &chain, bodyless_post),
        )
        .route(
            "/api/products",
            guarded(handlers::list_products, &chain, read_only),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(RequestIdLayer::new())
        .with_state(state)
}
