//! HTTP middleware for the edge gatekeeper.
//!
//! - **Request ID**: echo or generate `X-Request-Id` (tower layer, every route)
//! - **Composer** ([`chain`]): the per-route protective pipeline
//!   - security headers, origin validation, request validation
//!   - fixed-window rate limiting
//!   - request logging and response timing finalizers
//!
//! # Architecture
//!
//! ```text
//! Request → Request ID → guard(route options) → Handler → Response
//!                            ↓
//!             403 / 405 / 413 / 415 / 429 short-circuit
//! ```

pub mod chain;
pub mod ip;
pub mod logger;
pub mod origin;
pub mod performance;
pub mod rate_limit;
pub mod request_id;
pub mod security;
pub mod validator;

pub use chain::{
    GuardedRoute, MiddlewareChain, MiddlewareContext, MiddlewareOptions, PIPELINE, Rejection,
    RequestMeta, Stage, guard,
};
pub use ip::{UNKNOWN_IP, resolve_client_ip};
pub use rate_limit::{RateLimitDecision, RateLimitOutcome, RateLimitRule, RateLimiter, RuleTable};
pub use request_id::{REQUEST_ID_HEADER, ReceivedAt, RequestId, RequestIdExt, RequestIdLayer};
pub use validator::{MAX_BODY_SIZE, ValidationOptions};
