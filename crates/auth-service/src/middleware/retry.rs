//! One-shot retry of handlers that fail with 401.
//!
//! The guard only protects against a stale access token at entry; a handler
//! can still reject with 401 deep inside its own logic. When that happens
//! and the client holds a refresh token, this layer rotates the pair, sets
//! both new cookies, and replays the buffered request exactly once. A second
//! 401 (or a failed rotation) propagates the original response unchanged, so
//! there is never more than one retry. Requests without a refresh cookie, or
//! with bodies too large to buffer, pass through untouched with retry
//! disabled.

use axum::{
    body::{to_bytes, Body, Bytes, HttpBody as _},
    extract::Request,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::cookies::{
    self, ACCESS_COOKIE, ACCESS_COOKIE_MAX_AGE, REFRESH_COOKIE, REFRESH_COOKIE_MAX_AGE,
};
use crate::errors::AuthError;
use crate::handlers::auth_handler::AppState;
use crate::services::auth_service;

/// Replay requires buffering the whole body up front.
const BODY_BUFFER_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct RetryUnauthorizedLayer {
    state: Arc<AppState>,
}

impl RetryUnauthorizedLayer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for RetryUnauthorizedLayer {
    type Service = RetryUnauthorized<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryUnauthorized {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

#[derive(Clone)]
pub struct RetryUnauthorized<S> {
    inner: S,
    state: Arc<AppState>,
}

impl<S> Service<Request> for RetryUnauthorized<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let state = Arc::clone(&self.state);
        // The clone takes over; the original (polled-ready) instance drives
        // both the first call and the replay.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let refresh = cookies::get_cookie(req.headers(), REFRESH_COOKIE).map(str::to_owned);

            // Without a refresh token no retry is possible: hand the request
            // straight through instead of buffering it for nothing.
            let Some(refresh) = refresh else {
                return inner.call(req).await;
            };

            // Bodies too large (or of unknown length) are not buffered
            // either; the request proceeds with retry disabled.
            let fits = req
                .body()
                .size_hint()
                .upper()
                .is_some_and(|n| n <= BODY_BUFFER_LIMIT as u64);
            if !fits {
                debug!("request body exceeds buffer limit, retry disabled");
                return inner.call(req).await;
            }

            let (parts, body) = req.into_parts();

            let bytes = match to_bytes(body, BODY_BUFFER_LIMIT).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "failed to buffer request body");
                    return Ok(
                        AuthError::Validation("failed to read request body".to_string())
                            .into_response(),
                    );
                }
            };

            let first = inner.call(rebuild_request(&parts, &bytes)).await?;
            if first.status() != StatusCode::UNAUTHORIZED {
                return Ok(first);
            }

            let pair = match auth_service::refresh_tokens(&state, &refresh).await {
                Ok(pair) => pair,
                Err(e) => {
                    debug!(error = %e, "rotation failed, propagating original 401");
                    return Ok(first);
                }
            };

            let mut retried = inner.call(rebuild_request(&parts, &bytes)).await?;
            if retried.status() == StatusCode::UNAUTHORIZED {
                return Ok(first);
            }

            let secure = state.config.production;
            cookies::append_set_cookie(
                &mut retried,
                &cookies::auth_cookie(
                    ACCESS_COOKIE,
                    &pair.access_token,
                    ACCESS_COOKIE_MAX_AGE,
                    secure,
                ),
            );
            cookies::append_set_cookie(
                &mut retried,
                &cookies::auth_cookie(
                    REFRESH_COOKIE,
                    &pair.refresh_token,
                    REFRESH_COOKIE_MAX_AGE,
                    secure,
                ),
            );

            Ok(retried)
        })
    }
}

/// Rebuild an owned request from saved parts and the buffered body.
fn rebuild_request(parts: &Parts, bytes: &Bytes) -> Request {
    let mut req = Request::new(Body::from(bytes.clone()));
    *req.method_mut() = parts.method.clone();
    *req.uri_mut() = parts.uri.clone();
    *req.version_mut() = parts.version;
    *req.headers_mut() = parts.headers.clone();
    *req.extensions_mut() = parts.extensions.clone();
    req
}
