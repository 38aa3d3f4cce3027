//! Session relay to the backend service.
//!
//! The edge never authenticates anyone itself. Login, register and logout are
//! forwarded to the backend together with the inbound `Cookie` header; on
//! success the backend's `token` cookie is captured from `Set-Cookie` and the
//! caller re-issues it under the edge's own attributes.
//!
//! # Failure Taxonomy
//!
//! | Situation | Result |
//! |---|---|
//! | connection refused, DNS failure, timeout | [`AppError::UpstreamUnavailable`] (503) |
//! | backend answered with a non-2xx status | [`AppError::Upstream`] with that status and message |
//! | backend answered 2xx with an unreadable body | [`AppError::Internal`] |
//!
//! Every call is bounded by the client timeout and is cancelled when the
//! inbound request is dropped.

pub mod set_cookie;

use std::time::Duration;

use axum::http::{HeaderValue, StatusCode, header};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::session_cookie::SESSION_COOKIE;

pub use set_cookie::{find_cookie, split_set_cookie};

/// Message returned when the backend cannot be reached.
pub const BACKEND_UNAVAILABLE: &str =
    "Backend service unavailable, please make sure it is running and try again";

/// Logout variant of [`BACKEND_UNAVAILABLE`]; the local session is already gone.
pub const BACKEND_UNAVAILABLE_LOGGED_OUT: &str =
    "Backend service unavailable, local session cleared";

/// Auth handshake endpoints relayed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Register,
    Logout,
}

impl AuthAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthAction::Login => "login",
            AuthAction::Register => "register",
            AuthAction::Logout => "logout",
        }
    }

    fn backend_path(self) -> &'static str {
        match self {
            AuthAction::Login => "/api/v1/auth/login",
            AuthAction::Register => "/api/v1/auth/register",
            AuthAction::Logout => "/api/v1/auth/logout",
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            AuthAction::Login => "Login failed",
            AuthAction::Register => "Registration failed",
            AuthAction::Logout => "Logout failed",
        }
    }
}

/// A successful backend answer.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub body: Value,
    /// `token` value from the backend's `Set-Cookie`, if any.
    pub session_token: Option<String>,
}

impl RelayResponse {
    /// Whether the envelope reports `success: true`.
    pub fn succeeded(&self) -> bool {
        self.body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// HTTP client for the backend service.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward an auth handshake.
    ///
    /// `cookie` is the raw inbound `Cookie` header, passed through unchanged.
    pub async fn relay_auth(
        &self,
        action: AuthAction,
        body: Option<&Value>,
        cookie: Option<&str>,
    ) -> AppResult<RelayResponse> {
        let url = format!("{}{}", self.base_url, action.backend_path());
        let mut request = self.http.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(cookie) = cookie
            && let Ok(value) = HeaderValue::from_str(cookie)
        {
            request = request.header(header::COOKIE, value);
        }

        self.execute(request, action.as_str(), action.fallback_message())
            .await
    }

    /// Fetch the product list on behalf of the session `token`.
    pub async fn products(&self, query: Option<&str>, token: &str) -> AppResult<RelayResponse> {
        let mut url = format!("{}/api/v1/products", self.base_url);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        let cookie = HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}"))
            .map_err(|_| AppError::InvalidToken)?;
        let request = self.http.get(&url).header(header::COOKIE, cookie);

        self.execute(request, "products", "Failed to fetch products")
            .await
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
        fallback_message: &str,
    ) -> AppResult<RelayResponse> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(endpoint, &e))?;

        let status = response.status();
        let session_token = find_cookie(
            response
                .headers()
                .get_all(header::SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
            SESSION_COOKIE,
        )
        .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(endpoint, &e))?;
        let parsed = serde_json::from_slice::<Value>(&bytes);

        if !status.is_success() {
            let message = parsed
                .ok()
                .as_ref()
                .and_then(|body| body.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| fallback_message.to_string());
            debug!(endpoint, status = status.as_u16(), %message, "Backend reported a fault");
            return Err(AppError::Upstream { status, message });
        }

        let body = parsed.map_err(|e| {
            error!(endpoint, error = %e, "Backend returned malformed JSON");
            AppError::Internal(format!("Malformed response from backend {endpoint}: {e}"))
        })?;

        Ok(RelayResponse {
            status,
            body,
            session_token,
        })
    }

    fn transport_error(&self, endpoint: &str, e: &reqwest::Error) -> AppError {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            warn!(
                endpoint,
                backend = %self.base_url,
                error = %e,
                "Backend unreachable"
            );
            metrics::record_upstream_unavailable(endpoint);
            AppError::UpstreamUnavailable(BACKEND_UNAVAILABLE.to_string())
        } else {
            error!(endpoint, error = %e, "Backend call failed");
            AppError::Internal(format!("Backend call to {endpoint} failed: {e}"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use tokio::net::TcpListener;

    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[test]
    fn test_auth_action_paths() {
        assert_eq!(AuthAction::Login.backend_path(), "/api/v1/auth/login");
        assert_eq!(AuthAction::Register.backend_path(), "/api/v1/auth/register");
        assert_eq!(AuthAction::Logout.as_str(), "logout");
    }

    #[tokio::test]
    async fn test_connection_refused_is_upstream_unavailable() {
        let client = BackendClient::new(closed_port().await, Duration::from_secs(2)).unwrap();
        let err = client
            .relay_auth(AuthAction::Login, Some(&serde_json::json!({})), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_captures_token_and_forwards_cookie() {
        let router = Router::new().route(
            "/api/v1/auth/login",
            post(|headers: axum::http::HeaderMap| async move {
                let cookie = headers
                    .get(header::COOKIE)
                    .map(|v| v.to_str().unwrap().to_string())
                    .unwrap_or_default();
                (
                    [(header::SET_COOKIE, "token=abc123; HttpOnly; Path=/")],
                    axum::Json(serde_json::json!({"success": true, "cookie": cookie})),
                )
            }),
        );
        let client = BackendClient::new(spawn(router).await, Duration::from_secs(2)).unwrap();

        let response = client
            .relay_auth(
                AuthAction::Login,
                Some(&serde_json::json!({"email": "a@b.com"})),
                Some("theme=dark"),
            )
            .await
            .unwrap();

        assert!(response.succeeded());
        assert_eq!(response.session_token.as_deref(), Some("abc123"));
        assert_eq!(response.body["cookie"], "theme=dark");
    }

    #[tokio::test]
    async fn test_backend_fault_passes_through() {
        let router = Router::new().route(
            "/api/v1/auth/login",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    axum::Json(serde_json::json!({"success": false, "message": "invalid email or password"})),
                )
                    .into_response()
            }),
        );
        let client = BackendClient::new(spawn(router).await, Duration::from_secs(2)).unwrap();

        let err = client
            .relay_auth(AuthAction::Login, Some(&serde_json::json!({})), None)
            .await
            .unwrap_err();
        match err {
            AppError::Upstream { status, message } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "invalid email or password");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_backend_fault_without_body_uses_fallback() {
        let router = Router::new().route(
            "/api/v1/auth/register",
            post(|| async { StatusCode::BAD_GATEWAY }),
        );
        let client = BackendClient::new(spawn(router).await, Duration::from_secs(2)).unwrap();

        let err = client
            .relay_auth(AuthAction::Register, Some(&serde_json::json!({})), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Upstream { status, ref message }
                if status == StatusCode::BAD_GATEWAY && message == "Registration failed"
        ));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let router = Router::new().route(
            "/api/v1/auth/logout",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        );
        let client = BackendClient::new(spawn(router).await, Duration::from_millis(200)).unwrap();

        let err = client
            .relay_auth(AuthAction::Logout, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }
}
