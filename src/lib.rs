//! # Edge Gatekeeper
//!
//! An edge-facing request gatekeeper for an internal API service, featuring:
//!
//! - **Protection**: security headers, origin allow-list, request validation
//! - **Rate limiting**: fixed-window counters per client and route
//! - **Session relay**: login/register/logout forwarded to the backend, with
//!   its `token` cookie mirrored onto the edge response
//! - **Observability**: request IDs, structured logging, response timing,
//!   Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Edge (Axum HTTP Server)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Request ID → Trace → guard (per-route middleware chain)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (auth relay, products proxy, health)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BackendClient (reqwest, bounded timeouts)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Backend service (users, catalog, token verifier)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edge_gatekeeper::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(config)?;
//!     let app = build_router(state.clone());
//!
//!     // Serve `app`, then:
//!     state.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Running Both Services
//!
//! ```bash
//! cargo run --bin backend
//! BACKEND_URL=http://localhost:3001 cargo run
//! ```

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod relay;
pub mod routes;
pub mod session_cookie;
pub mod state;
pub mod utils;

// Re-exports for convenience
pub use backend::{BackendState, build_backend_router};
pub use config::{Config, RuntimeMode};
pub use error::{AppError, AppResult};
pub use relay::BackendClient;
pub use routes::build_router;
pub use state::AppState;
