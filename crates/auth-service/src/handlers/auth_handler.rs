//! HTTP handlers for the auth endpoints.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::cookies::{
    self, ACCESS_COOKIE, ACCESS_COOKIE_MAX_AGE, REFRESH_COOKIE, REFRESH_COOKIE_MAX_AGE,
};
use crate::errors::AuthError;
use crate::models::{TokenPair, UserRole};
use crate::services::auth_service;
use crate::services::token_service::{TokenPayload, TokenService};
use crate::services::user_service::UserService;

pub struct AppState {
    pub config: Config,
    pub tokens: TokenService,
    pub users: UserService,
}

/// Missing fields deserialize to empty strings so field-presence checks
/// report 400 instead of a body-rejection status.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

fn token_cookies(state: &AppState, pair: &TokenPair) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    let secure = state.config.production;
    AppendHeaders([
        (
            SET_COOKIE,
            cookies::auth_cookie(ACCESS_COOKIE, &pair.access_token, ACCESS_COOKIE_MAX_AGE, secure),
        ),
        (
            SET_COOKIE,
            cookies::auth_cookie(
                REFRESH_COOKIE,
                &pair.refresh_token,
                REFRESH_COOKIE_MAX_AGE,
                secure,
            ),
        ),
    ])
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let pair = auth_service::login(&state, &request.email, &request.password).await?;
    info!("user logged in");

    Ok((
        token_cookies(&state, &pair),
        Json(json!({ "status": "success", "tokens": pair })),
    ))
}

/// POST /api/auth/register
///
/// Returns the first token pair in the body only; the client logs in to
/// establish cookies.
pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let pair = auth_service::register(
        &state,
        &request.email,
        &request.username,
        &request.password,
        request.role,
    )
    .await?;
    info!("user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "tokens": pair })),
    ))
}

/// POST /api/auth/refresh
pub async fn handle_refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    let refresh = cookies::get_cookie(&headers, REFRESH_COOKIE)
        .ok_or_else(|| AuthError::Unauthenticated("refresh token is missing".to_string()))?;

    let pair = auth_service::refresh_tokens(&state, refresh).await?;

    Ok((
        token_cookies(&state, &pair),
        Json(json!({ "status": "success", "tokens": pair })),
    ))
}

/// GET /api/auth/me
pub async fn handle_me(
    Extension(payload): Extension<TokenPayload>,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(json!({
        "status": "success",
        "user": {
            "id": payload.sub,
            "email": payload.email,
            "role": payload.role,
        }
    })))
}

/// POST /api/auth/logout
///
/// Clears both cookies. There is no revocation store, so the refresh token
/// stays cryptographically valid until it expires on its own.
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    if cookies::get_cookie(&headers, REFRESH_COOKIE).is_none() {
        return Err(AuthError::Unauthenticated(
            "refresh token is missing".to_string(),
        ));
    }

    let secure = state.config.production;

    Ok((
        AppendHeaders([
            (SET_COOKIE, cookies::clear_cookie(ACCESS_COOKIE, secure)),
            (SET_COOKIE, cookies::clear_cookie(REFRESH_COOKIE, secure)),
        ]),
        Json(json!({ "status": "success", "message": "Logged out successfully" })),
    ))
}
