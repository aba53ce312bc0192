pub mod health;
pub mod login;
pub mod proxy;
pub mod reset;

// common helpers for the handlers

use crate::gateway::GatewayConfig;
use axum::{
    http::{
        header::{InvalidHeaderValue, COOKIE},
        HeaderMap, HeaderValue,
    },
    Json,
};
use serde_json::{json, Value};

pub(crate) const SESSION_COOKIE_NAME: &str = "fetraf_session";

/// Read the session artifact from the cookie header, if present.
///
/// Presence is all that is checked here; the token is validated by whichever
/// backend call eventually carries it.
pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

/// Build the session cookie carrying the bearer token.
pub(crate) fn session_cookie(
    config: &GatewayConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    // Only mark cookies secure when the dashboard is served over HTTPS.
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(
    config: &GatewayConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Uniform `{ok:false, error}` payload for rejections.
pub(crate) fn error_body(message: &str) -> Json<Value> {
    Json(json!({ "ok": false, "error": message }))
}
