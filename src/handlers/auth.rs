//! Session relay handlers.
//!
//! # Endpoints
//!
//! - `POST /api/auth/login` - relay credentials, mirror the backend's session cookie
//! - `POST /api/auth/register` - same flow for new accounts
//! - `POST /api/auth/logout` - clear the edge cookie, then tell the backend
//!
//! The backend's `token` value is copied byte for byte; only the cookie
//! attributes are the edge's own.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::models::MessageResponse;
use crate::relay::{AuthAction, BACKEND_UNAVAILABLE_LOGGED_OUT};
use crate::state::AppState;

fn inbound_cookie(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::COOKIE).and_then(|v| v.to_str().ok())
}

async fn relay_handshake(
    state: &AppState,
    action: AuthAction,
    headers: &HeaderMap,
    jar: CookieJar,
    body: &Bytes,
) -> AppResult<Response> {
    let payload: Value = serde_json::from_slice(body)?;

    let relayed = state
        .backend
        .relay_auth(action, Some(&payload), inbound_cookie(headers))
        .await?;

    let jar = match relayed.session_token.as_deref() {
        Some(token) if relayed.succeeded() => {
            debug!(action = action.as_str(), "Mirroring backend session cookie");
            jar.add(state.cookies.issue(token))
        }
        Some(_) => {
            warn!(
                action = action.as_str(),
                "Backend set a session cookie on an unsuccessful response, ignoring it"
            );
            jar
        }
        None => jar,
    };

    Ok((relayed.status, jar, Json(relayed.body)).into_response())
}

/// `POST /api/auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<Response> {
    relay_handshake(&state, AuthAction::Login, &headers, jar, &body).await
}

/// `POST /api/auth/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<Response> {
    relay_handshake(&state, AuthAction::Register, &headers, jar, &body).await
}

/// `POST /api/auth/logout`
///
/// The edge cookie is cleared before the backend is called and stays cleared
/// whatever the backend says. An unreachable backend still yields 503, with a
/// message saying the local session is gone; other backend faults are
/// returned as they are.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, Response) {
    let jar = state.cookies.clear(jar);

    let response = match state
        .backend
        .relay_auth(AuthAction::Logout, None, inbound_cookie(&headers))
        .await
    {
        Ok(_) => {
            info!("Session cleared");
            Json(MessageResponse::ok("logout successful")).into_response()
        }
        Err(AppError::UpstreamUnavailable(_)) => {
            warn!("Backend unavailable during logout, local session cleared");
            AppError::UpstreamUnavailable(BACKEND_UNAVAILABLE_LOGGED_OUT.to_string())
                .into_response()
        }
        Err(e) => e.into_response(),
    };

    (jar, response)
}
