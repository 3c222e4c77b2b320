use utoipa::OpenApi;

use super::{
    handlers::{health, login, session},
    users::User,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        login::login_link,
        login::redeem,
        session::session,
        session::logout
    ),
    components(schemas(health::Health, login::LoginLinkRequest, login::RedeemRequest, User)),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "auth", description = "Login links and cookie sessions")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
