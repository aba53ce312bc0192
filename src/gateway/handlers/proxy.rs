//! Forwarding gateway: re-issue inbound requests to the backend with the
//! server-held bearer credential attached, and stream the response back.
//!
//! The gateway is content-agnostic. Bodies are relayed byte-for-byte, backend
//! errors pass through unchanged, and no retry policy exists at this layer;
//! if retries are ever wanted they belong to the backend or a higher layer.

use axum::{
    body::{Body, Bytes},
    extract::{Extension, Path, Query, RawQuery},
    http::{
        header::{CONNECTION, CONTENT_DISPOSITION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING},
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use super::{error_body, session_token};
use crate::gateway::GatewayState;

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Relay one request upstream and stream the response back.
///
/// Inbound headers are copied minus `host` and per-hop framing headers; the
/// upstream connection negotiates its own framing. `GET` and `HEAD` have no
/// body semantics and never forward one.
async fn forward(
    state: &GatewayState,
    token: &str,
    method: Method,
    target: String,
    inbound: &HeaderMap,
    body: Bytes,
) -> Response {
    let mut headers = inbound.clone();
    let forwarded_host = headers.get(HOST).cloned();
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    headers.remove(TRANSFER_ENCODING);
    headers.remove(CONNECTION);
    if let Some(host) = forwarded_host {
        headers.insert(X_FORWARDED_HOST, host);
    }

    let mut request = state
        .http()
        .request(method.clone(), &target)
        .headers(headers)
        .bearer_auth(token);

    if !matches!(method, Method::GET | Method::HEAD) {
        request = request.body(body);
    }

    let upstream = match request.send().await {
        Ok(upstream) => upstream,
        Err(err) => {
            error!(target = %target, "Upstream unreachable: {err}");
            return (StatusCode::BAD_GATEWAY, error_body("upstream unreachable")).into_response();
        }
    };

    // Status and headers pass through untouched; 4xx/5xx are the backend's
    // answer, not ours to rewrite.
    let mut response = Response::builder().status(upstream.status());
    if let Some(response_headers) = response.headers_mut() {
        for (name, value) in upstream.headers() {
            if name == TRANSFER_ENCODING || name == CONNECTION || name == CONTENT_LENGTH {
                continue;
            }
            response_headers.append(name.clone(), value.clone());
        }
    }

    match response.body(Body::from_stream(upstream.bytes_stream())) {
        Ok(response) => response,
        Err(err) => {
            error!("Failed to assemble proxied response: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("proxy failed")).into_response()
        }
    }
}

/// Relay the session check to the backend identity endpoint.
#[utoipa::path(
    get,
    path = "/session/me",
    responses(
        (status = 200, description = "Backend identity payload, relayed verbatim"),
        (status = 401, description = "No session cookie")
    ),
    tag = "auth"
)]
pub async fn session_me(
    state: Extension<Arc<GatewayState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(token) = session_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, error_body("no session")).into_response();
    };

    let target = state.config().backend_target("/auth/me", None);
    forward(&state, &token, Method::GET, target, &headers, Bytes::new()).await
}

/// Generic resource proxy: any method on `/api/*path` is re-issued to the
/// backend equivalent path with the query string passed through.
pub async fn resource(
    state: Extension<Arc<GatewayState>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(token) = session_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, error_body("no session")).into_response();
    };

    let target = state.config().backend_target(&path, query.as_deref());
    forward(&state, &token, method, target, &headers, body).await
}

#[derive(Deserialize, Debug)]
pub struct DownloadQuery {
    format: Option<String>,
}

/// Report download proxy. Streams the backend payload and guarantees a
/// `content-disposition`, falling back to a deterministic filename when the
/// backend omits it.
pub async fn download(
    state: Extension<Arc<GatewayState>>,
    Path(id): Path<String>,
    Query(params): Query<DownloadQuery>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(token) = session_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, error_body("no session")).into_response();
    };

    let format = params.format.as_deref().unwrap_or("csv");
    let path = format!("/reports/{id}/download");
    let target = state.config().backend_target(&path, query.as_deref());

    let mut response =
        forward(&state, &token, Method::GET, target, &headers, Bytes::new()).await;

    if !response.headers().contains_key(CONTENT_DISPOSITION) {
        if let Ok(value) = HeaderValue::from_str(&fallback_disposition(&id, format)) {
            response.headers_mut().insert(CONTENT_DISPOSITION, value);
        }
    }

    response
}

fn fallback_disposition(id: &str, format: &str) -> String {
    format!("attachment; filename=\"report-{id}.{format}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_disposition_is_deterministic() {
        assert_eq!(
            fallback_disposition("42", "csv"),
            "attachment; filename=\"report-42.csv\""
        );
        assert_eq!(
            fallback_disposition("7", "pdf"),
            "attachment; filename=\"report-7.pdf\""
        );
    }
}
