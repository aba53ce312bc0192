//! Password reset flow: request a link, confirm with the token.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::error_body;
use crate::gateway::reset::ConsumeOutcome;
use crate::gateway::GatewayState;

#[derive(ToSchema, Deserialize, Debug)]
pub struct ResetRequestBody {
    #[serde(default)]
    pub email: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ResetConfirmBody {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

/// Issue a reset token and hand the link to the notifier.
///
/// The response is identical whether or not the address belongs to an
/// account; only a syntactically hopeless email is rejected.
#[utoipa::path(
    post,
    path = "/reset/request",
    request_body = ResetRequestBody,
    responses(
        (status = 200, description = "Generic acknowledgement, never reveals whether the email exists"),
        (status = 400, description = "Missing or malformed email")
    ),
    tag = "auth"
)]
pub async fn reset_request(
    state: Extension<Arc<GatewayState>>,
    payload: Option<Json<ResetRequestBody>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, error_body("invalid email")).into_response();
    };

    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return (StatusCode::BAD_REQUEST, error_body("invalid email")).into_response();
    }

    let token = match state.reset_tokens().issue(email).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to issue reset token: {err}");
            // Stay generic; an internal hiccup must not become an oracle.
            return Json(json!({ "ok": true })).into_response();
        }
    };

    let reset_url = state.config().reset_url(&token);
    if let Err(err) = state.notifier().deliver(email, &reset_url) {
        error!("Failed to deliver reset link: {err}");
    }

    Json(json!({ "ok": true })).into_response()
}

/// Consume a reset token and relay the new secret to the credential owner.
#[utoipa::path(
    post,
    path = "/reset/confirm",
    request_body = ResetConfirmBody,
    responses(
        (status = 200, description = "Secret updated, token burned"),
        (status = 400, description = "Invalid token, expired token, or weak password")
    ),
    tag = "auth"
)]
pub async fn reset_confirm(
    state: Extension<Arc<GatewayState>>,
    payload: Option<Json<ResetConfirmBody>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, error_body("invalid token")).into_response();
    };

    let token = request.token.trim();
    if token.is_empty() {
        return (StatusCode::BAD_REQUEST, error_body("invalid token")).into_response();
    }

    match state.reset_tokens().consume(token, &request.password).await {
        ConsumeOutcome::Consumed { email } => {
            if let Err(err) = state.credentials().apply_secret(&email, &request.password) {
                error!("Failed to apply new secret: {err}");
                return (StatusCode::INTERNAL_SERVER_ERROR, error_body("reset failed"))
                    .into_response();
            }
            Json(json!({ "ok": true })).into_response()
        }
        ConsumeOutcome::InvalidToken => {
            (StatusCode::BAD_REQUEST, error_body("invalid token")).into_response()
        }
        ConsumeOutcome::ExpiredToken => {
            (StatusCode::BAD_REQUEST, error_body("expired token")).into_response()
        }
        ConsumeOutcome::WeakSecret => (
            StatusCode::BAD_REQUEST,
            error_body("password must be at least 8 characters"),
        )
            .into_response(),
    }
}
