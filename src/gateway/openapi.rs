use utoipa::OpenApi;

use super::handlers::{health, login, proxy, reset};

/// Documented endpoints. The resource proxy wildcards and the route guard are
/// intentionally not documented; they relay backend contracts, not ours.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        login::login,
        login::logout,
        proxy::session_me,
        reset::reset_request,
        reset::reset_confirm,
    ),
    components(schemas(
        login::LoginRequest,
        reset::ResetRequestBody,
        reset::ResetConfirmBody,
    )),
    tags(
        (name = "gateway", description = "Service endpoints"),
        (name = "auth", description = "Login, logout and password reset"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
