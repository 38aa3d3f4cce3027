//! Product list proxy.

use axum::Json;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// `GET /api/products[?category=&page=&limit=]`
///
/// Requires the edge session cookie; the query string is forwarded unchanged.
#[instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    jar: CookieJar,
    RawQuery(query): RawQuery,
) -> AppResult<(StatusCode, Json<Value>)> {
    let token = state
        .cookies
        .token(&jar)
        .ok_or(AppError::Unauthenticated)?;

    let relayed = state.backend.products(query.as_deref(), token).await?;
    Ok((relayed.status, Json(relayed.body)))
}
