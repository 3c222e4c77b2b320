use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::{CookieJar, SessionCookieAuth};
use crate::token::Principal;

/// Gate a route behind a valid session cookie.
///
/// On success the principal is inserted into the request extensions, so
/// handlers take it with `Extension<P>`. Without a usable session the request
/// is answered with `401 Unauthorized. <reason>`; a failing backend yields 500.
///
/// ```ignore
/// Router::new()
///     .route("/me", get(me))
///     .route_layer(middleware::from_fn_with_state(auth, require_session::<User>));
/// ```
pub async fn require_session<P>(
    State(auth): State<Arc<SessionCookieAuth<P>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    P: Principal + Clone + Send + Sync + 'static,
{
    let jar = CookieJar::from_headers(request.headers());

    match auth.authenticate(&jar).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(rejection) if rejection.is_unauthorized() => {
            debug!("session rejected: {rejection}");
            (StatusCode::UNAUTHORIZED, format!("Unauthorized. {rejection}")).into_response()
        }
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Session lookup failed").into_response(),
    }
}
