//! Authorization guard with silent access-token renewal.
//!
//! Per request: a verifying access cookie accepts immediately. Otherwise a
//! present refresh cookie is verified and rotated, the request proceeds with
//! the renewed identity, and only the new access cookie is emitted on the
//! response (the refresh cookie is left alone here; the dedicated refresh
//! endpoint rotates both). Public routes simply never carry this layer.
//!
//! Concurrent requests from one client may each mint a new access token;
//! every minted token is independently valid, so the last cookie written
//! winning is acceptable.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::cookies::{self, ACCESS_COOKIE, ACCESS_COOKIE_MAX_AGE, REFRESH_COOKIE};
use crate::errors::AuthError;
use crate::handlers::auth_handler::AppState;

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if let Some(token) = cookies::get_cookie(req.headers(), ACCESS_COOKIE) {
        if let Ok(payload) = state.tokens.verify(token) {
            req.extensions_mut().insert(payload);
            return Ok(next.run(req).await);
        }
        debug!("access token rejected, checking refresh token");
    }

    let refresh = cookies::get_cookie(req.headers(), REFRESH_COOKIE)
        .map(str::to_owned)
        .ok_or_else(|| AuthError::Unauthenticated("Invalid token".to_string()))?;

    // Verify refresh, rotate, and re-verify the minted access token to get
    // the payload attached downstream. Every failure in this chain is the
    // same terminal rejection.
    let pair = state
        .tokens
        .verify(&refresh)
        .and_then(|payload| state.tokens.rotate(&payload))
        .map_err(|_| AuthError::Unauthenticated("Invalid refresh token".to_string()))?;

    let payload = state
        .tokens
        .verify(&pair.access_token)
        .map_err(|_| AuthError::Unauthenticated("Invalid refresh token".to_string()))?;

    req.extensions_mut().insert(payload);

    let mut response = next.run(req).await;

    // A handler that already wrote an access cookie (refresh rotating the
    // pair, logout clearing it) owns the final cookie state; appending the
    // renewal cookie after it would override it in the browser.
    let access_prefix = format!("{ACCESS_COOKIE}=");
    let handler_set_access = response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|c| c.starts_with(&access_prefix));

    if !handler_set_access {
        let access_cookie = cookies::auth_cookie(
            ACCESS_COOKIE,
            &pair.access_token,
            ACCESS_COOKIE_MAX_AGE,
            state.config.production,
        );
        cookies::append_set_cookie(&mut response, &access_cookie);
    }

    Ok(response)
}
