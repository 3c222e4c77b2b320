//! Session endpoints for cookie auth.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::api::{state::AuthState, users::User};
use crate::session::CookieJar;

/// Current user. Only reachable through `require_session`, which puts the
/// `User` into the request extensions.
#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = User),
        (status = 401, description = "No valid session cookie")
    ),
    tag = "auth"
)]
pub async fn session(Extension(user): Extension<User>) -> impl IntoResponse {
    (StatusCode::OK, Json(user))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Always clear the cookie, even if there was no session.
    let mut jar = CookieJar::from_headers(&headers);
    auth_state.session().logout(&mut jar).await;
    (StatusCode::NO_CONTENT, jar.into_headers())
}
