//! Origin allow-list enforcement.
//!
//! Requests carrying neither `Origin` nor `Referer` pass untouched; they come
//! from same-origin navigations or non-browser clients. Otherwise the
//! effective origin is `Origin`, or the scheme/host/port of `Referer`.
//!
//! Only a strict policy (production) rejects. A lenient policy logs the
//! mismatch and lets the request through.

use axum::http::{HeaderMap, header};
use tracing::{debug, warn};
use url::Url;

use crate::config::RuntimeMode;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    strict: bool,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>, mode: RuntimeMode) -> Self {
        let allowed = allowed
            .into_iter()
            .map(|o| o.trim_end_matches('/').to_string())
            .collect();
        Self {
            allowed,
            strict: mode.is_production(),
        }
    }

    pub fn validate(&self, headers: &HeaderMap) -> AppResult<()> {
        let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
        let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());

        let effective = match (origin, referer) {
            (None, None) => return Ok(()),
            (Some(origin), _) => origin.trim_end_matches('/').to_string(),
            (None, Some(referer)) => match referer_origin(referer) {
                Some(origin) => origin,
                None if self.strict => {
                    return Err(AppError::ForbiddenOrigin(referer.to_string()));
                }
                None => {
                    debug!(referer, "Unparsable Referer ignored");
                    return Ok(());
                }
            },
        };

        if self.allowed.iter().any(|allowed| *allowed == effective) {
            return Ok(());
        }

        if self.strict {
            warn!(origin = %effective, "Rejected request from disallowed origin");
            return Err(AppError::ForbiddenOrigin(effective));
        }

        debug!(origin = %effective, "Origin not in allow-list (not enforced)");
        Ok(())
    }
}

fn referer_origin(referer: &str) -> Option<String> {
    let url = Url::parse(referer).ok()?;
    let origin = url.origin();
    origin
        .is_tuple()
        .then(|| origin.ascii_serialization())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn policy(mode: RuntimeMode) -> OriginPolicy {
        OriginPolicy::new(vec!["https://shop.example".to_string()], mode)
    }

    fn with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(name, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn test_no_origin_or_referer_passes_in_strict_mode() {
        assert!(policy(RuntimeMode::Production).validate(&HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_lenient_accepts_any_origin() {
        let h = with(header::ORIGIN, "https://evil.example");
        assert!(policy(RuntimeMode::Development).validate(&h).is_ok());
    }

    #[test]
    fn test_strict_rejects_unknown_origin() {
        let h = with(header::ORIGIN, "https://evil.example");
        let err = policy(RuntimeMode::Production).validate(&h).unwrap_err();
        assert!(matches!(err, AppError::ForbiddenOrigin(o) if o == "https://evil.example"));
    }

    #[test]
    fn test_strict_accepts_allowed_origin() {
        let h = with(header::ORIGIN, "https://shop.example");
        assert!(policy(RuntimeMode::Production).validate(&h).is_ok());
    }

    #[test]
    fn test_referer_reduced_to_origin() {
        let h = with(header::REFERER, "https://shop.example/cart?item=1");
        assert!(policy(RuntimeMode::Production).validate(&h).is_ok());

        let h = with(header::REFERER, "https://evil.example/phish");
        assert!(policy(RuntimeMode::Production).validate(&h).is_err());
    }

    #[test]
    fn test_origin_takes_precedence_over_referer() {
        let mut h = with(header::ORIGIN, "https://shop.example");
        h.insert(
            header::REFERER,
            HeaderValue::from_static("https://evil.example/"),
        );
        assert!(policy(RuntimeMode::Production).validate(&h).is_ok());
    }

    #[test]
    fn test_malformed_referer() {
        let h = with(header::REFERER, "not a url");
        assert!(policy(RuntimeMode::Development).validate(&h).is_ok());
        assert!(policy(RuntimeMode::Production).validate(&h).is_err());
    }

    #[test]
    fn test_referer_keeps_non_default_port() {
        assert_eq!(
            referer_origin("http://localhost:3000/login").as_deref(),
            Some("http://localhost:3000")
        );
    }
}
