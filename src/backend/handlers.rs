//! Backend route handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, info};

use super::BackendState;
use super::password;
use super::verifier::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthResponse, BackendHealthResponse, LoginRequest, MeResponse, MessageResponse,
    ProductListQuery, ProductListResponse, ProductResponse, RegisterRequest,
};

const MIN_PASSWORD_LEN: usize = 6;

/// `POST /api/v1/auth/register`
pub async fn register(
    State(state): State<BackendState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let req: RegisterRequest = serde_json::from_slice(&body)?;

    if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "username, email and password are required".to_string(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let hash = password::hash_blocking(req.password).await?;
    let user = state.users.create(&req.username, &req.email, hash).await?;
    let token = state.tokens.issue(&user.id, &user.username, &user.email)?;

    info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        jar.add(state.cookies.issue(token)),
        Json(AuthResponse {
            success: true,
            message: "registration successful".to_string(),
            user: user.summary(),
        }),
    ))
}

/// `POST /api/v1/auth/login`
pub async fn login(
    State(state): State<BackendState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let req: LoginRequest = serde_json::from_slice(&body)?;

    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "email and password are required".to_string(),
        ));
    }

    let Some(user) = state.users.find_by_email(&req.email).await else {
        debug!("Login for unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !password::verify_blocking(req.password, user.password_hash.clone()).await? {
        debug!(user_id = %user.id, "Login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.issue(&user.id, &user.username, &user.email)?;
    info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(state.cookies.issue(token)),
        Json(AuthResponse {
            success: true,
            message: "login successful".to_string(),
            user: user.summary(),
        }),
    ))
}

/// `POST /api/v1/auth/logout`
///
/// Tokens are stateless; logging out only clears the cookie.
pub async fn logout(State(state): State<BackendState>, jar: CookieJar) -> impl IntoResponse {
    (
        state.cookies.clear(jar),
        Json(MessageResponse::ok("logout successful")),
    )
}

/// `GET /api/v1/auth/me`
pub async fn me(
    State(state): State<BackendState>,
    CurrentUser(claims): CurrentUser,
) -> AppResult<Json<MeResponse>> {
    let user = state
        .users
        .find_by_id(&claims.sub)
        .await
        .ok_or_else(|| AppError::Internal(format!("user {} does not exist", claims.sub)))?;

    Ok(Json(MeResponse {
        success: true,
        user: user.profile(),
    }))
}

/// `GET /api/v1/products`
pub async fn list_products(
    State(state): State<BackendState>,
    _user: CurrentUser,
    query: Result<Query<ProductListQuery>, QueryRejection>,
) -> AppResult<Json<ProductListResponse>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (data, pagination) = state.catalog.list(&query);

    Ok(Json(ProductListResponse {
        success: true,
        data,
        pagination,
    }))
}

/// `GET /api/v1/products/{id}`
pub async fn get_product(
    State(state): State<BackendState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ProductResponse>> {
    let product = state
        .catalog
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound("product not found".to_string()))?;

    Ok(Json(ProductResponse {
        success: true,
        data: product,
    }))
}

/// `GET /api/v1/health`
pub async fn health() -> Json<BackendHealthResponse> {
    Json(BackendHealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}
