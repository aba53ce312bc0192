//! Login and logout: negotiate upstream credentials, issue the session cookie.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::{clear_session_cookie, error_body, session_cookie};
use crate::gateway::negotiate::{negotiate, NegotiationError};
use crate::gateway::GatewayState;

/// Tolerant login payload: `uid` is accepted as an alias for `email`, and
/// every field defaults to empty so a malformed body degrades instead of
/// failing the handler.
#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session cookie issued"),
        (status = 401, description = "No candidate encoding was accepted upstream"),
        (status = 502, description = "Upstream unreachable")
    ),
    tag = "auth"
)]
pub async fn login(
    state: Extension<Arc<GatewayState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request = payload.map_or_else(LoginRequest::default, |Json(payload)| payload);

    let identifier = if request.email.is_empty() {
        request.uid
    } else {
        request.email
    };
    let identifier = identifier.trim().to_string();
    let secret = SecretString::from(request.password);

    match negotiate(state.http(), &state.config().login_url(), &identifier, &secret).await {
        Ok(token) => {
            let cookie = match session_cookie(state.config(), &token) {
                Ok(cookie) => cookie,
                Err(err) => {
                    error!("Failed to build session cookie: {err}");
                    return (StatusCode::INTERNAL_SERVER_ERROR, error_body("login failed"))
                        .into_response();
                }
            };

            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);

            // The token's only transport to the client is the Set-Cookie
            // header; the body stays a bare acknowledgement.
            (StatusCode::OK, headers, Json(json!({ "ok": true }))).into_response()
        }
        Err(NegotiationError::Rejected { last }) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "ok": false,
                "error": "invalid credentials",
                "detail": last,
            })),
        )
            .into_response(),
        Err(NegotiationError::Unreachable(err)) => {
            error!("Login upstream unreachable: {err}");
            (StatusCode::BAD_GATEWAY, error_body("upstream unreachable")).into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout(state: Extension<Arc<GatewayState>>) -> impl IntoResponse {
    // Always clear the cookie; there is no server-side session to tear down.
    let mut headers = HeaderMap::new();
    match clear_session_cookie(state.config()) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build logout cookie: {err}");
        }
    }
    (StatusCode::OK, headers, Json(json!({ "ok": true })))
}
