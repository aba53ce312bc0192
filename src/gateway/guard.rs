//! Route guard: block unauthenticated access to protected path prefixes.
//!
//! This is a cheap first line of defense, not the authority: only cookie
//! presence is checked, and the token is validated by whichever backend call
//! eventually carries it.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use url::form_urlencoded;

use super::handlers::session_token;
use super::GatewayState;

/// Login redirect target carrying the original path for post-login resumption.
pub(crate) fn login_redirect(login_page: &str, path: &str) -> String {
    let next: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("{login_page}?next={next}")
}

pub async fn require_session(
    Extension(state): Extension<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if state.config().is_protected(path) && session_token(request.headers()).is_none() {
        let location = login_redirect(state.config().login_page_path(), path);
        return Redirect::temporary(&location).into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirect_encodes_the_original_path() {
        assert_eq!(
            login_redirect("/login", "/dashboard/anything"),
            "/login?next=%2Fdashboard%2Fanything"
        );
        assert_eq!(
            login_redirect("/login", "/dashboard/filiados/42"),
            "/login?next=%2Fdashboard%2Ffiliados%2F42"
        );
    }
}
