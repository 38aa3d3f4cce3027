use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error types with appropriate HTTP status codes.
///
/// # Fault Families
///
/// - Validation: `MethodNotAllowed`, `UnsupportedMediaType`, `PayloadTooLarge`, `BadRequest`
/// - Authentication: `Unauthenticated`, `InvalidToken`, `TokenExpired`,
///   `InvalidCredentials`, `ForbiddenOrigin`
/// - Rate limiting: `RateLimited` (carries the retry delay)
/// - Upstream: `UpstreamUnavailable` for network-layer failures, `Upstream` for
///   faults the backend reported itself (status and message passed through)
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedMediaType(String),

    #[error("Request body of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("not authenticated")]
    Unauthenticated,

    #[error("invalid token")]
    InvalidToken,

    #[error("expired, please re-authenticate")]
    TokenExpired,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("Origin not allowed: {0}")]
    ForbiddenOrigin(String),

    #[error("Too many requests, please retry in {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    /// HTTP status this fault maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::BadRequest(_) | AppError::SerializationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::ForbiddenOrigin(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream { status, .. } => *status,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable fault kind used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::MethodNotAllowed(_) => "method_not_allowed",
            AppError::UnsupportedMediaType(_) => "unsupported_media_type",
            AppError::PayloadTooLarge { .. } => "payload_too_large",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthenticated => "unauthenticated",
            AppError::InvalidToken => "invalid_token",
            AppError::TokenExpired => "token_expired",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::ForbiddenOrigin(_) => "forbidden_origin",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::Upstream { .. } => "upstream",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal_error",
            AppError::ConfigError(_) => "config_error",
            AppError::SerializationError(_) => "serialization_error",
        }
    }

    /// Message that is safe to show to clients in every runtime mode.
    pub fn public_message(&self) -> String {
        match self {
            // Internal errors - never expose internal details to clients
            AppError::Internal(_) => {
                "An internal error occurred. Please contact support if the issue persists."
                    .to_string()
            }
            AppError::ConfigError(_) => {
                "Service configuration error. Please contact support.".to_string()
            }
            // Serde errors can leak internal type names
            AppError::SerializationError(e) => sanitize_serde_error(e),
            AppError::NotFound(msg) | AppError::Conflict(msg) | AppError::BadRequest(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Fault summary attached to error responses.
///
/// `IntoResponse` stores one in the response extensions so the middleware
/// chain can log the fault and, outside production, attach `details`.
#[derive(Debug, Clone)]
pub struct FaultRecord {
    pub kind: &'static str,
    pub status: StatusCode,
    pub message: String,
    pub details: String,
}

impl From<&AppError> for FaultRecord {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind(),
            status: err.status_code(),
            message: err.public_message(),
            details: err.to_string(),
        }
    }
}

/// Failure envelope returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let record = FaultRecord::from(&self);

        let mut response =
            (record.status, axum::Json(ErrorBody::new(record.message.clone()))).into_response();

        if let AppError::RateLimited { retry_after } = &self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after));
        }

        response.extensions_mut().insert(record);
        response
    }
}

/// Sanitize serde error messages to avoid leaking internal type information.
///
/// Serde errors can contain internal struct/field names which shouldn't be
/// exposed to external clients. This function extracts the useful parts.
pub fn sanitize_serde_error(e: &serde_json::Error) -> String {
    let msg = e.to_string();

    if msg.contains("missing field")
        && let Some(start) = msg.find('`')
        && let Some(end) = msg[start + 1..].find('`')
    {
        let field = &msg[start + 1..start + 1 + end];
        return format!("Missing required field: {field}");
    }

    if msg.contains("invalid type") {
        return "Invalid data type in request body".to_string();
    }

    if msg.contains("EOF while parsing") || msg.contains("expected") {
        return "Malformed JSON in request body".to_string();
    }

    "Invalid request format".to_string()
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::MethodNotAllowed("PUT".into()).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            AppError::PayloadTooLarge { size: 11, limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(AppError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::ForbiddenOrigin("https://evil.example".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::UpstreamUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Upstream {
                status: StatusCode::CONFLICT,
                message: "taken".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_into_response_envelope() {
        let response = AppError::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.extensions().get::<FaultRecord>().is_some());

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "invalid token");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_internal_message_is_generic() {
        let response = AppError::Internal("db pool exhausted".into()).into_response();
        let record = response.extensions().get::<FaultRecord>().cloned().unwrap();
        assert!(record.details.contains("db pool exhausted"));

        let body = body_json(response).await;
        assert!(!body["message"].as_str().unwrap().contains("db pool"));
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited { retry_after: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_rate_limited_message() {
        let err = AppError::RateLimited { retry_after: 7 };
        assert_eq!(
            err.public_message(),
            "Too many requests, please retry in 7 seconds"
        );
    }

    #[test]
    fn test_sanitize_missing_field() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Creds {
            email: String,
        }
        let err = serde_json::from_str::<Creds>("{}").unwrap_err();
        assert_eq!(sanitize_serde_error(&err), "Missing required field: email");
    }

    #[test]
    fn test_sanitize_malformed() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(sanitize_serde_error(&err), "Malformed JSON in request body");
    }
}
