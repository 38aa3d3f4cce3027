//! Fallback for unknown routes, shared by the edge and the backend.

use axum::Json;
use axum::extract::Request;
use axum::http::StatusCode;
use tracing::warn;

use crate::middleware::{RequestId, RequestIdExt};
use crate::models::RouteNotFound;

pub async fn not_found(request: Request) -> (StatusCode, Json<RouteNotFound>) {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    warn!(
        request_id = %request.request_id().map(RequestId::as_str).unwrap_or("unknown"),
        method = %method,
        path = %path,
        status = StatusCode::NOT_FOUND.as_u16(),
        duration_ms = request.received_at().map(|at| at.elapsed_ms()).unwrap_or_default(),
        "Route not found"
    );

    (
        StatusCode::NOT_FOUND,
        Json(RouteNotFound {
            success: false,
            message: "route not found".to_string(),
            path,
            method,
        }),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::middleware::{REQUEST_ID_HEADER, RequestIdLayer};
    use axum::Router;
    use axum::body::Body;
    use axum::http;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_not_found_keeps_request_id() {
        let app = Router::new().fallback(not_found).layer(RequestIdLayer::new());

        let request = http::Request::get("/nope")
            .header(REQUEST_ID_HEADER, "trace-404")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-404");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["path"], "/nope");
        assert_eq!(body["method"], "GET");
    }

    #[tokio::test]
    async fn test_not_found_without_request_id_layer() {
        let request = http::Request::post("/missing").body(Body::empty()).unwrap();
        let (status, Json(body)) = not_found(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.method, "POST");
    }
}
