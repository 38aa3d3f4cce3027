//! Method, content-type and body-size checks.
//!
//! Checks run in order and the first violation wins. `GET` and `HEAD`
//! skip the content-type and body-size checks entirely.

use axum::http::{HeaderMap, Method, header};

use crate::error::{AppError, AppResult};

/// Largest accepted declared body (10 MiB).
pub const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

/// Per-route validation options.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// `None` accepts any method.
    pub allowed_methods: Option<Vec<Method>>,
    /// Matched as substrings of the `Content-Type` header.
    pub allowed_content_types: Vec<String>,
    pub check_content_type: bool,
    pub check_body_size: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            allowed_methods: None,
            allowed_content_types: vec!["application/json".to_string()],
            check_content_type: true,
            check_body_size: true,
        }
    }
}

impl ValidationOptions {
    pub fn methods(methods: &[Method]) -> Self {
        Self {
            allowed_methods: Some(methods.to_vec()),
            ..Self::default()
        }
    }

    pub fn without_content_type_check(mut self) -> Self {
        self.check_content_type = false;
        self
    }
}

pub fn validate(method: &Method, headers: &HeaderMap, options: &ValidationOptions) -> AppResult<()> {
    if let Some(allowed) = &options.allowed_methods
        && !allowed.contains(method)
    {
        return Err(AppError::MethodNotAllowed(method.to_string()));
    }

    if *method == Method::GET || *method == Method::HEAD {
        return Ok(());
    }

    if options.check_content_type {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let accepted = options
            .allowed_content_types
            .iter()
            .any(|allowed| content_type.contains(allowed.as_str()));

        if !accepted {
            let shown = if content_type.is_empty() { "none" } else { content_type };
            return Err(AppError::UnsupportedMediaType(shown.to_string()));
        }
    }

    if options.check_body_size
        && let Some(size) = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
        && size > MAX_BODY_SIZE
    {
        return Err(AppError::PayloadTooLarge {
            size,
            limit: MAX_BODY_SIZE,
        });
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: Option<&str>, length: Option<&str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(ct) = content_type {
            h.insert(header::CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        if let Some(len) = length {
            h.insert(header::CONTENT_LENGTH, HeaderValue::from_str(len).unwrap());
        }
        h
    }

    #[test]
    fn test_method_not_allowed() {
        let opts = ValidationOptions::methods(&[Method::POST]);
        let err = validate(&Method::PUT, &headers(Some("application/json"), None), &opts)
            .unwrap_err();
        assert!(matches!(err, AppError::MethodNotAllowed(m) if m == "PUT"));
    }

    #[test]
    fn test_get_skips_size_and_type() {
        let opts = ValidationOptions::default();
        let oversized = (MAX_BODY_SIZE * 4).to_string();
        assert!(validate(&Method::GET, &headers(None, Some(&oversized)), &opts).is_ok());
        assert!(validate(&Method::HEAD, &headers(Some("text/plain"), None), &opts).is_ok());
    }

    #[test]
    fn test_post_content_type_substring_match() {
        let opts = ValidationOptions::methods(&[Method::POST]);
        let h = headers(Some("application/json; charset=utf-8"), Some("20"));
        assert!(validate(&Method::POST, &h, &opts).is_ok());

        let h = headers(Some("text/plain"), Some("20"));
        assert!(matches!(
            validate(&Method::POST, &h, &opts),
            Err(AppError::UnsupportedMediaType(_))
        ));

        assert!(matches!(
            validate(&Method::POST, &headers(None, None), &opts),
            Err(AppError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_content_type_check_can_be_disabled() {
        let opts = ValidationOptions::methods(&[Method::POST]).without_content_type_check();
        assert!(validate(&Method::POST, &headers(None, None), &opts).is_ok());
    }

    #[test]
    fn test_body_size_limit_is_exclusive() {
        let opts = ValidationOptions::default();
        let at_limit = MAX_BODY_SIZE.to_string();
        let over = (MAX_BODY_SIZE + 1).to_string();

        let h = headers(Some("application/json"), Some(&at_limit));
        assert!(validate(&Method::POST, &h, &opts).is_ok());

        let h = headers(Some("application/json"), Some(&over));
        assert!(matches!(
            validate(&Method::POST, &h, &opts),
            Err(AppError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_unparsable_length_is_ignored() {
        let opts = ValidationOptions::default();
        let h = headers(Some("application/json"), Some("lots"));
        assert!(validate(&Method::POST, &h, &opts).is_ok());
    }

    #[test]
    fn test_first_violation_wins() {
        let opts = ValidationOptions::methods(&[Method::POST]);
        let oversized = (MAX_BODY_SIZE + 1).to_string();
        let h = headers(Some("text/plain"), Some(&oversized));
        assert!(matches!(
            validate(&Method::POST, &h, &opts),
            Err(AppError::UnsupportedMediaType(_))
        ));
    }
}
