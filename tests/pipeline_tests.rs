//! In-process tests of the edge middleware pipeline via `tower::ServiceExt::oneshot`.
//!
//! None of these requests reach the backend: each is rejected by a pipeline
//! stage or by the products handler's cookie check.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use tower::ServiceExt;

use edge_gatekeeper::{AppState, Config, RuntimeMode, build_router};

fn config(mode: RuntimeMode) -> Config {
    Config {
        mode,
        allowed_origins: vec!["https://shop.example".to_string()],
        backend_url: "http://127.0.0.1:9".to_string(),
        ..Config::default()
    }
}

fn app(mode: RuntimeMode) -> (Router, AppState) {
    let state = AppState::new(config(mode)).unwrap();
    (build_router(state.clone()), state)
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn products(origin: Option<&str>) -> Request<Body> {
    let mut builder = Request::get("/api/products").header("x-forwarded-for", "203.0.113.7");
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::empty()).unwrap()
}

// =============================================================================
// Origin Validation
// =============================================================================

#[tokio::test]
async fn test_production_rejects_foreign_origin() {
    let (app, _) = app(RuntimeMode::Production);

    let response = app
        .oneshot(products(Some("https://evil.example")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Headers set before the failing stage survive the short-circuit
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(
        headers["strict-transport-security"],
        "max-age=31536000; includeSubDomains"
    );
    assert!(headers.contains_key("x-request-id"));
    assert!(!headers.contains_key("x-ratelimit-limit"));

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_production_accepts_allowed_or_absent_origin() {
    let (app, _) = app(RuntimeMode::Production);

    let response = app
        .clone()
        .oneshot(products(Some("https://shop.example")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(products(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_production_checks_referer_origin() {
    let (app, _) = app(RuntimeMode::Production);

    let request = Request::get("/api/products")
        .header(header::REFERER, "https://evil.example/some/page?q=1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::get("/api/products")
        .header(header::REFERER, "https://shop.example/cart")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_development_accepts_any_origin_and_adds_details() {
    let (app, _) = app(RuntimeMode::Development);

    let response = app
        .oneshot(products(Some("https://evil.example")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(
        response
            .headers()
            .get("strict-transport-security")
            .is_none()
    );

    let body = json_body(response).await;
    assert_eq!(body["message"], "not authenticated");
    assert!(body["details"].is_string());
}

// =============================================================================
// Request Validation
// =============================================================================

#[tokio::test]
async fn test_oversized_post_is_413() {
    let (app, _) = app(RuntimeMode::Development);

    let request = Request::post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, (20 * 1024 * 1024).to_string())
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_get_bypasses_size_check() {
    let (app, _) = app(RuntimeMode::Development);

    let request = Request::get("/api/products")
        .header(header::CONTENT_LENGTH, (20 * 1024 * 1024).to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_json_with_charset_is_accepted_by_validator() {
    let (app, _) = app(RuntimeMode::Development);

    // Passes validation, then fails at the handler's JSON parse
    let request = Request::post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Rate Limiting
// =============================================================================

#[tokio::test]
async fn test_rate_limit_keys_are_per_client() {
    let (app, state) = app(RuntimeMode::Development);

    for _ in 0..60 {
        let response = app.clone().oneshot(products(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app.clone().oneshot(products(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    let other = Request::get("/api/products")
        .header("x-forwarded-for", "198.51.100.1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(other).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "59");

    assert_eq!(state.limiter.len(), 2);
}

#[tokio::test]
async fn test_health_is_not_guarded() {
    let (app, state) = app(RuntimeMode::Production);

    let request = Request::get("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-ratelimit-limit"));
    assert!(state.limiter.is_empty());

    let body = json_body(response).await;
    assert_eq!(body["mode"], "production");
}
