//! Request logging with an explicit begin/finish handle.

use std::time::Instant;

use axum::http::StatusCode;
use tracing::{error, info, warn};

use super::chain::RequestMeta;
use crate::config::RuntimeMode;

const USER_AGENT_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct RequestLogger {
    mode: RuntimeMode,
}

impl RequestLogger {
    pub fn new(mode: RuntimeMode) -> Self {
        Self { mode }
    }

    /// Log the request start (outside production) and return the handle
    /// that must be finished when the response is known.
    pub fn begin(&self, meta: &RequestMeta) -> LogHandle {
        let user_agent: String = meta
            .user_agent()
            .unwrap_or("unknown")
            .chars()
            .take(USER_AGENT_MAX_CHARS)
            .collect();

        if !self.mode.is_production() {
            info!(
                request_id = %meta.request_id,
                method = %meta.method,
                uri = %meta.uri,
                client_ip = %meta.client_ip,
                "Incoming request"
            );
        }

        LogHandle {
            mode: self.mode,
            request_id: meta.request_id.clone(),
            method: meta.method.to_string(),
            uri: meta.uri.clone(),
            client_ip: meta.client_ip.clone(),
            user_agent,
            started: Instant::now(),
        }
    }
}

/// Pending log line for one request.
#[derive(Debug)]
#[must_use = "a log handle must be finished"]
pub struct LogHandle {
    mode: RuntimeMode,
    request_id: String,
    method: String,
    uri: String,
    client_ip: String,
    user_agent: String,
    started: Instant,
}

impl LogHandle {
    pub fn finish(self, status: StatusCode, error: Option<&str>) {
        let LogHandle {
            mode,
            request_id,
            method,
            uri,
            client_ip,
            user_agent,
            started,
        } = self;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = status.as_u16();
        let error = error.unwrap_or_default();

        macro_rules! emit {
            ($level:ident, $msg:literal) => {
                $level!(
                    request_id = %request_id,
                    method = %method,
                    uri = %uri,
                    status,
                    duration_ms,
                    client_ip = %client_ip,
                    user_agent = %user_agent,
                    error,
                    $msg
                )
            };
        }

        if status >= 500 {
            emit!(error, "Request failed");
        } else if status >= 400 {
            emit!(warn, "Request rejected");
        } else if !mode.is_production() {
            emit!(info, "Request completed");
        }
    }
}
