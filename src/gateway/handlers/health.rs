use axum::{
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::GIT_COMMIT_HASH;

// axum handler for health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service name, version and build")
    ),
    tag = "gateway"
)]
pub async fn health() -> impl IntoResponse {
    let body = Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "build": GIT_COMMIT_HASH,
    }));

    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        &GIT_COMMIT_HASH[0..7]
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
    .parse()
    {
        headers.insert("X-App", value);
    }

    (headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};

    #[tokio::test]
    async fn health_carries_app_header() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let header = response.headers().get("X-App").unwrap().to_str().unwrap();
        assert!(header.starts_with(env!("CARGO_PKG_NAME")));
    }
}
