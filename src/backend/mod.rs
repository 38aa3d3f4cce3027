//! In-memory backend service.
//!
//! Owns user accounts, the product catalog and session token issuance. The
//! edge reaches it only over HTTP.
//!
//! # Routes
//!
//! ```text
//! POST /api/v1/auth/register     public
//! POST /api/v1/auth/login        public
//! POST /api/v1/auth/logout       public
//! GET  /api/v1/auth/me           token verifier
//! GET  /api/v1/products          token verifier
//! GET  /api/v1/products/{id}     token verifier
//! GET  /api/v1/health            public
//! ```

pub mod catalog;
pub mod handlers;
pub mod password;
pub mod token;
pub mod users;
pub mod verifier;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::RequestIdLayer;
use crate::session_cookie::SessionCookiePolicy;

pub use catalog::Catalog;
pub use token::{Claims, TokenService};
pub use users::{User, UserStore};
pub use verifier::{CurrentUser, require_session};

/// Shared backend state; cheap to clone.
#[derive(Clone)]
pub struct BackendState {
    pub users: UserStore,
    pub tokens: Arc<TokenService>,
    pub catalog: Arc<Catalog>,
    pub cookies: SessionCookiePolicy,
}

impl BackendState {
    pub fn new(config: &Config) -> Self {
        Self {
            users: UserStore::new(),
            tokens: Arc::new(TokenService::new(&config.jwt_secret)),
            catalog: Arc::new(Catalog::default()),
            cookies: SessionCookiePolicy::new(config.mode),
        }
    }
}

/// Build the backend router.
///
/// # Errors
///
/// Returns `AppError::ConfigError` if `frontend_url` is not a valid header value.
pub fn build_backend_router(state: BackendState, frontend_url: &str) -> AppResult<Router> {
    let cors = build_cors_layer(frontend_url)?;

    let protected = Router::new()
        .route("/api/v1/auth/me", get(handlers::me))
        .route("/api/v1/products", get(handlers::list_products))
        .route("/api/v1/products/{id}", get(handlers::get_product))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let router = Router::new()
        .route("/api/v1/auth/register", post(handlers::register))
        .route("/api/v1/auth/login", post(handlers::login))
        .route("/api/v1/auth/logout", post(handlers::logout))
        .route("/api/v1/health", get(handlers::health))
        .merge(protected)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(RequestIdLayer::new())
        .with_state(state);

    info!(frontend_url, "Backend router configured");
    Ok(router)
}

/// Single-origin CORS with credentials.
///
/// Credentials rule out wildcards, so methods and headers are listed.
fn build_cors_layer(frontend_url: &str) -> AppResult<CorsLayer> {
    let origin = HeaderValue::from_str(frontend_url)
        .map_err(|e| AppError::ConfigError(format!("Invalid FRONTEND_URL '{frontend_url}': {e}")))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}
