use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::auth_handler::{
    handle_login, handle_logout, handle_me, handle_refresh, handle_register, AppState,
};
use crate::middleware::auth::require_auth;
use crate::middleware::retry::RetryUnauthorizedLayer;

/// Assemble the full route table.
///
/// Public routes are simply built without the guard layer. The retry layer
/// sits inside the guard so a replay re-runs the handler but never the
/// guard, and guard rejections themselves are not retried.
pub fn build_routes(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/api/auth/login", post(handle_login))
        .route("/api/auth/register", post(handle_register))
        .layer(RetryUnauthorizedLayer::new(Arc::clone(&state)));

    let protected = Router::new()
        .route("/api/auth/me", get(handle_me))
        .route("/api/auth/refresh", post(handle_refresh))
        .route("/api/auth/logout", post(handle_logout))
        .layer(RetryUnauthorizedLayer::new(Arc::clone(&state)))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
