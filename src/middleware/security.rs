//! Static protective response headers.
//!
//! `Strict-Transport-Security` is only emitted in production; outside
//! production its value is empty and the header is omitted entirely.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::RuntimeMode;

const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

const STATIC_HEADERS: [(&str, &str); 7] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("content-security-policy", "default-src 'self'"),
    ("x-download-options", "noopen"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
];

/// Precomputed header set for one runtime mode.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    pub fn new(mode: RuntimeMode) -> Self {
        let hsts = if mode.is_production() { HSTS_VALUE } else { "" };

        let headers = STATIC_HEADERS
            .iter()
            .copied()
            .chain(std::iter::once(("strict-transport-security", hsts)))
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| {
                (
                    HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                )
            })
            .collect();

        Self { headers }
    }

    /// Attach every header. Never fails.
    pub fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            target.insert(name.clone(), value.clone());
        }
    }
}
