//! Set-Cookie assertions for response tests.

use axum::http::header::SET_COOKIE;
use axum::response::Response;

/// All `Set-Cookie` values on a response.
pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("Set-Cookie is not ASCII").to_string())
        .collect()
}

/// The value set for a named cookie, if any `Set-Cookie` targets it.
pub fn set_cookie_value<B>(response: &Response<B>, name: &str) -> Option<String> {
    set_cookies(response).iter().find_map(|cookie| {
        let (pair, _attrs) = cookie.split_once(';')?;
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Build a `cookie` request header value from name/value pairs.
pub fn cookie_header(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}
