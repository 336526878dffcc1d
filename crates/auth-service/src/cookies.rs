//! Session cookie handling.
//!
//! Both tokens travel as `HttpOnly; SameSite=Strict; Path=/` cookies so
//! browser scripts never see them; `Secure` is added in production.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue, Response};
use tracing::warn;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Cookie lifetimes match the token lifetimes exactly.
pub const ACCESS_COOKIE_MAX_AGE: i64 = 15 * 60;
pub const REFRESH_COOKIE_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Extract a cookie value from the request headers.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Build a `Set-Cookie` value carrying a token.
pub fn auth_cookie(name: &str, token: &str, max_age: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{name}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age}{secure}")
}

/// Build a `Set-Cookie` value that expires the cookie immediately.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    auth_cookie(name, "", 0, secure)
}

/// Append a `Set-Cookie` header to an already-built response.
///
/// Token material is always ASCII; a malformed value is logged and skipped
/// rather than failing the response.
pub fn append_set_cookie<B>(response: &mut Response<B>, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => warn!(error = %e, "skipping invalid Set-Cookie value"),
    }
}
