//! Router assembly and server entry for the gateway.

pub mod guard;
pub(crate) mod handlers;
pub(crate) mod negotiate;
mod openapi;
pub mod reset;
mod state;

pub use openapi::openapi;
pub use state::{GatewayConfig, GatewayState};

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{any, get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

/// Build the full application router.
///
/// The guard layer wraps every route (and the fallback), so protected page
/// prefixes are intercepted before any handler runs.
///
/// # Errors
/// Returns an error if the configured frontend origin cannot be parsed.
pub fn router(state: Arc<GatewayState>) -> Result<Router> {
    let frontend_origin = frontend_origin(state.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/login", post(handlers::login::login))
        .route("/logout", post(handlers::login::logout))
        .route("/session/me", get(handlers::proxy::session_me))
        .route("/reset/request", post(handlers::reset::reset_request))
        .route("/reset/confirm", post(handlers::reset::reset_confirm))
        .route("/api/reports/:id/download", get(handlers::proxy::download))
        .route("/api/*path", any(handlers::proxy::resource))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi()))
        .layer(middleware::from_fn(guard::require_session))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state)),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: Arc<GatewayState>) -> Result<()> {
    let app = router(state)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
