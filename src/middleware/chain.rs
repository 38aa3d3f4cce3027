//! Middleware composer.
//!
//! # Pipeline
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────────┐
//! │  Security Headers    │ ← never fails
//! ├──────────────────────┤
//! │  Origin Validation   │ ← 403 (strict mode only)
//! ├──────────────────────┤
//! │  Request Validation  │ ← 405 / 415 / 413
//! ├──────────────────────┤
//! │  Rate Limiting       │ ← 429 + Retry-After
//! ├──────────────────────┤
//! │  Logging (begin)     │
//! ├──────────────────────┤
//! │  Performance (begin) │
//! └──────────┬───────────┘
//!            ▼
//!         Handler
//!            │
//!            ▼
//!   MiddlewareContext::complete ← performance + log finalizers
//! ```
//!
//! The order is fixed. A failing stage short-circuits every later stage, so
//! faults raised before logging/performance are not seen by their
//! finalizers; the composer logs those itself.
//!
//! [`MiddlewareContext`] is built once on entry and finalized exactly once:
//! by [`MiddlewareContext::complete`] on the normal path, or by its `Drop`
//! impl when the request future is dropped before completion (client abort).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use super::ip::resolve_client_ip;
use super::logger::{LogHandle, RequestLogger};
use super::origin::OriginPolicy;
use super::performance::{PerformanceMonitor, Timing};
use super::rate_limit::RateLimiter;
use super::request_id::RequestId;
use super::security::SecurityHeaders;
use super::validator::{self, ValidationOptions};
use crate::config::{Config, RuntimeMode};
use crate::error::{AppError, ErrorBody, FaultRecord};
use crate::metrics;

/// Status recorded for requests whose client went away mid-flight.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SecurityHeaders,
    OriginValidation,
    RequestValidation,
    RateLimit,
    Logging,
    Performance,
}

pub const PIPELINE: [Stage; 6] = [
    Stage::SecurityHeaders,
    Stage::OriginValidation,
    Stage::RequestValidation,
    Stage::RateLimit,
    Stage::Logging,
    Stage::Performance,
];

/// What the composer needs to know about an inbound request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub request_id: String,
    pub method: Method,
    /// Path without query string; used as the rate-limit route key.
    pub path: String,
    /// Path and query, for logs.
    pub uri: String,
    pub headers: HeaderMap,
    pub client_ip: String,
}

impl RequestMeta {
    pub fn from_request(req: &Request) -> Self {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let uri = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());

        Self {
            request_id,
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            uri,
            client_ip: resolve_client_ip(req.headers(), peer).into_owned(),
            headers: req.headers().clone(),
        }
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
    }
}

/// Stage switches plus per-route validation options.
#[derive(Debug, Clone)]
pub struct MiddlewareOptions {
    pub security_headers: bool,
    pub origin_validation: bool,
    pub validation: bool,
    pub rate_limit: bool,
    pub logging: bool,
    pub performance: bool,
    pub validation_options: ValidationOptions,
}

impl MiddlewareOptions {
    /// Process-wide defaults.
    pub fn from_config(config: &Config) -> Self {
        Self {
            security_headers: true,
            origin_validation: config.mode.is_production(),
            validation: true,
            rate_limit: true,
            logging: config.logging_enabled(),
            performance: config.performance_monitor_enabled(),
            validation_options: ValidationOptions::default(),
        }
    }

    pub fn with_validation(mut self, options: ValidationOptions) -> Self {
        self.validation_options = options;
        self
    }

    pub fn enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::SecurityHeaders => self.security_headers,
            Stage::OriginValidation => self.origin_validation,
            Stage::RequestValidation => self.validation,
            Stage::RateLimit => self.rate_limit,
            Stage::Logging => self.logging,
            Stage::Performance => self.performance,
        }
    }
}

/// A stage failure plus the headers accumulated before it.
#[derive(Debug)]
pub struct Rejection {
    pub stage: Stage,
    pub headers: HeaderMap,
    pub error: AppError,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response = self.error.into_response();
        response.headers_mut().extend(self.headers);
        response
    }
}

pub struct MiddlewareChain {
    mode: RuntimeMode,
    security: SecurityHeaders,
    origin: OriginPolicy,
    limiter: Arc<RateLimiter>,
    logger: RequestLogger,
    performance: PerformanceMonitor,
}

impl MiddlewareChain {
    pub fn new(config: &Config, limiter: Arc<RateLimiter>) -> Self {
        Self {
            mode: config.mode,
            security: SecurityHeaders::new(config.mode),
            origin: OriginPolicy::new(config.allowed_origins.clone(), config.mode),
            limiter,
            logger: RequestLogger::new(config.mode),
            performance: PerformanceMonitor::new(config.slow_request_threshold),
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Run the enabled stages in pipeline order.
    pub fn apply(
        &self,
        meta: &RequestMeta,
        options: &MiddlewareOptions,
    ) -> Result<MiddlewareContext, Rejection> {
        let mut headers = HeaderMap::new();
        let mut log = None;
        let mut timing = None;

        for stage in PIPELINE {
            if !options.enabled(stage) {
                continue;
            }

            let result = match stage {
                Stage::SecurityHeaders => {
                    self.security.apply(&mut headers);
                    Ok(())
                }
                Stage::OriginValidation => self.origin.validate(&meta.headers),
                Stage::RequestValidation => {
                    validator::validate(&meta.method, &meta.headers, &options.validation_options)
                }
                Stage::RateLimit => {
                    let decision = self.limiter.check(&meta.client_ip, &meta.path);
                    decision.apply_headers(&mut headers);
                    decision.into_result().map(|_| ())
                }
                Stage::Logging => {
                    log = Some(self.logger.begin(meta));
                    Ok(())
                }
                Stage::Performance => {
                    timing = Some(self.performance.begin(meta.method.as_str(), &meta.path));
                    Ok(())
                }
            };

            if let Err(error) = result {
                return Err(Rejection {
                    stage,
                    headers,
                    error,
                });
            }
        }

        Ok(MiddlewareContext {
            headers,
            log,
            timing,
            #[cfg(test)]
            finalized: Arc::default(),
        })
    }

    /// Log a fault the request logger did not see, and attach `details`
    /// to the body outside production.
    pub fn report_fault(
        &self,
        meta: &RequestMeta,
        started: Instant,
        already_logged: bool,
        response: &mut Response,
    ) {
        let Some(fault) = response.extensions().get::<FaultRecord>().cloned() else {
            return;
        };

        if !already_logged {
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            if fault.status.is_server_error() {
                error!(
                    request_id = %meta.request_id,
                    method = %meta.method,
                    path = %meta.path,
                    duration_ms,
                    status = fault.status.as_u16(),
                    kind = fault.kind,
                    error = %fault.details,
                    "Request fault"
                );
            } else {
                warn!(
                    request_id = %meta.request_id,
                    method = %meta.method,
                    path = %meta.path,
                    duration_ms,
                    status = fault.status.as_u16(),
                    kind = fault.kind,
                    error = %fault.details,
                    "Request fault"
                );
            }
        }

        if !self.mode.is_production() {
            let body = ErrorBody::new(fault.message).with_details(fault.details);
            if let Ok(bytes) = serde_json::to_vec(&body) {
                response.headers_mut().remove(header::CONTENT_LENGTH);
                *response.body_mut() = Body::from(bytes);
            }
        }
    }
}

/// Request-scoped state built by [`MiddlewareChain::apply`].
#[derive(Debug)]
#[must_use = "a middleware context must be completed"]
pub struct MiddlewareContext {
    headers: HeaderMap,
    log: Option<LogHandle>,
    timing: Option<Timing>,
    #[cfg(test)]
    finalized: Arc<std::sync::atomic::AtomicUsize>,
}

impl MiddlewareContext {
    pub fn logs_requests(&self) -> bool {
        self.log.is_some()
    }

    /// Merge accumulated headers and run the finalizers.
    pub fn complete(mut self, response: &mut Response) {
        response.headers_mut().extend(std::mem::take(&mut self.headers));

        let status = response.status();
        let fault = response
            .extensions()
            .get::<FaultRecord>()
            .map(|f| f.details.clone());
        self.finalize(status, Some(response.headers_mut()), fault.as_deref());
    }

    /// Finish whichever handles are still pending and return how many ran.
    /// Each handle is taken, so a second call runs none.
    fn finalize(
        &mut self,
        status: StatusCode,
        headers: Option<&mut HeaderMap>,
        error: Option<&str>,
    ) -> usize {
        let mut ran = 0;
        if let Some(timing) = self.timing.take() {
            timing.finish(status, headers);
            ran += 1;
        }
        if let Some(log) = self.log.take() {
            log.finish(status, error);
            ran += 1;
        }

        #[cfg(test)]
        self.finalized
            .fetch_add(ran, std::sync::atomic::Ordering::SeqCst);
        ran
    }
}

impl Drop for MiddlewareContext {
    fn drop(&mut self) {
        if self.log.is_none() && self.timing.is_none() {
            return;
        }

        let status = StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.finalize(status, None, Some("request aborted"));
    }
}

/// Per-route state for [`guard`].
#[derive(Clone)]
pub struct GuardedRoute {
    pub chain: Arc<MiddlewareChain>,
    pub options: Arc<MiddlewareOptions>,
}

impl GuardedRoute {
    pub fn new(chain: Arc<MiddlewareChain>, options: MiddlewareOptions) -> Self {
        Self {
            chain,
            options: Arc::new(options),
        }
    }
}

/// Axum middleware wrapping one route in the pipeline.
///
/// ```rust,ignore
/// let login = GuardedRoute::new(chain.clone(), options);
/// Router::new().route(
///     "/api/auth/login",
///     any(handlers::login).layer(axum::middleware::from_fn_with_state(login, guard)),
/// );
/// ```
pub async fn guard(State(route): State<GuardedRoute>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let meta = RequestMeta::from_request(&req);

    let (mut response, logged) = match route.chain.apply(&meta, &route.options) {
        Ok(ctx) => {
            let logged = ctx.logs_requests();
            let mut response = next.run(req).await;
            ctx.complete(&mut response);
            (response, logged)
        }
        Err(rejection) => (rejection.into_response(), false),
    };

    route
        .chain
        .report_fault(&meta, started, logged, &mut response);
    metrics::record_request(meta.method.as_str(), &meta.path, response.status().as_u16());

    response
}
