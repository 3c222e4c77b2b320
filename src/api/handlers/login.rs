//! Login-link request and redemption.
//!
//! A link carries a 30-minute `login` token. Redeeming it consumes the token
//! and starts a cookie session; the link cannot be used twice.

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use super::{normalize_email, valid_email};
use crate::api::{email::LoginEmail, state::AuthState};
use crate::session::CookieJar;
use crate::token::{Expiry, SCOPE_LOGIN};

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginLinkRequest {
    email: String,
}

#[derive(ToSchema, Deserialize)]
pub struct RedeemRequest {
    token: String,
}

#[derive(Debug, PartialEq, Eq)]
enum LinkOutcome {
    Sent,
    UnknownUser,
}

/// Email a login link (always returns 204 to avoid user enumeration).
#[utoipa::path(
    post,
    path = "/v1/auth/login-link",
    request_body = LoginLinkRequest,
    responses(
        (status = 204, description = "Request accepted"),
        (status = 400, description = "Missing payload")
    ),
    tag = "auth"
)]
pub async fn login_link(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginLinkRequest>>,
) -> Response {
    let request: LoginLinkRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        // Same answer as for a known address.
        return StatusCode::NO_CONTENT.into_response();
    }

    match send_login_link(&auth_state, &email).await {
        Ok(LinkOutcome::Sent) => debug!("login link sent"),
        Ok(LinkOutcome::UnknownUser) => debug!("login link requested for unknown email"),
        Err(err) => error!("Failed to send login link: {err:#}"),
    }

    StatusCode::NO_CONTENT.into_response()
}

#[instrument(skip(auth_state, email))]
async fn send_login_link(auth_state: &AuthState, email: &str) -> Result<LinkOutcome> {
    let Some(user) = auth_state
        .users()
        .find_by_email(email)
        .await
        .context("failed to lookup user")?
    else {
        return Ok(LinkOutcome::UnknownUser);
    };

    let ttl_minutes = auth_state.config().login_token_ttl_minutes();
    let token = auth_state
        .tokens()
        .issue(&user, Expiry::minutes(ttl_minutes), SCOPE_LOGIN)
        .await
        .context("failed to issue login token")?;
    let login_url = auth_state
        .config()
        .login_url(token.expose_secret())
        .context("failed to build login url")?;

    auth_state
        .mailer()
        .send(&LoginEmail {
            to_email: user.email,
            login_url,
            expires_in_minutes: ttl_minutes,
        })
        .context("failed to deliver login link")?;

    Ok(LinkOutcome::Sent)
}

/// Exchange a login token for a session cookie.
#[utoipa::path(
    post,
    path = "/v1/auth/redeem",
    request_body = RedeemRequest,
    responses(
        (status = 204, description = "Session started, cookie set"),
        (status = 400, description = "Missing payload"),
        (status = 401, description = "Token invalid, expired or already used")
    ),
    tag = "auth"
)]
pub async fn redeem(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RedeemRequest>>,
) -> Response {
    let request: RedeemRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let mut jar = CookieJar::from_headers(&headers);
    let session = auth_state.session();

    // Already signed in: leave the link unused.
    if session.check(&jar).await {
        debug!("redeem skipped, session already active");
        return StatusCode::NO_CONTENT.into_response();
    }

    let user = match auth_state
        .tokens()
        .validate(&request.token, true, Some(SCOPE_LOGIN))
        .await
    {
        Ok(user) => user,
        Err(err) if err.is_rejection() => {
            debug!("login token rejected: {err}");
            return (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
                .into_response();
        }
        Err(err) => {
            error!("Failed to validate login token: {err}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Login failed".to_string())
                .into_response();
        }
    };

    if let Err(err) = session.login(&mut jar, &user).await {
        error!("Failed to start session: {err}");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Login failed".to_string()).into_response();
    }

    (StatusCode::NO_CONTENT, jar.into_headers()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{Outbox, state};
    use crate::token::Principal;
    use axum::http::{HeaderValue, header::{COOKIE, SET_COOKIE}};

    fn token_from(url: &str) -> String {
        url.split_once("?token=")
            .map(|(_, token)| token.to_string())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn unknown_email_is_silent() {
        let (state, _users, outbox) = state();
        let request = LoginLinkRequest {
            email: "nobody@example.com".to_string(),
        };
        let response = login_link(Extension(state), Some(Json(request))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(outbox.messages().is_empty());
    }

    #[tokio::test]
    async fn invalid_email_is_silent() {
        let (state, _users, outbox) = state();
        let request = LoginLinkRequest {
            email: "not-an-email".to_string(),
        };
        let response = login_link(Extension(state), Some(Json(request))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(outbox.messages().is_empty());
    }

    #[tokio::test]
    async fn missing_payload_is_bad_request() {
        let (state, _users, _outbox) = state();
        let response = login_link(Extension(state.clone()), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = redeem(HeaderMap::new(), Extension(state), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn known_email_gets_link_and_redeems_once() {
        let (state, users, outbox) = state();
        let user = users.add("alice@example.com");

        let request = LoginLinkRequest {
            email: " Alice@Example.com".to_string(),
        };
        let response = login_link(Extension(state.clone()), Some(Json(request))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let messages = outbox.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].to_email, "alice@example.com");
        assert_eq!(messages[0].expires_in_minutes, 30);
        assert!(messages[0].login_url.starts_with("http://localhost:8080/login?token="));
        let token = token_from(&messages[0].login_url);

        let response = redeem(
            HeaderMap::new(),
            Extension(state.clone()),
            Some(Json(RedeemRequest {
                token: token.clone(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(cookie.starts_with("auth_token="));

        // Session cookie resolves to the same user.
        let session_value = cookie.split(';').next().unwrap_or_default();
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(session_value) {
            headers.insert(COOKIE, value);
        }
        let current = state
            .session()
            .current_principal(&CookieJar::from_headers(&headers))
            .await;
        assert_eq!(current.map(|u| u.principal_ref()), Some(user.principal_ref()));

        let again = redeem(
            HeaderMap::new(),
            Extension(state),
            Some(Json(RedeemRequest { token })),
        )
        .await;
        assert_eq!(again.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn redeem_with_active_session_keeps_link() {
        let (state, users, outbox) = state();
        let user = users.add("bob@example.com");

        let mut jar = CookieJar::new();
        assert!(state.session().login(&mut jar, &user).await.is_ok());
        let mut headers = HeaderMap::new();
        if let Some(value) = jar
            .get("auth_token")
            .and_then(|token| HeaderValue::from_str(&format!("auth_token={token}")).ok())
        {
            headers.insert(COOKIE, value);
        }

        let request = LoginLinkRequest {
            email: "bob@example.com".to_string(),
        };
        login_link(Extension(state.clone()), Some(Json(request))).await;
        let token = token_from(&outbox.messages()[0].login_url);

        let response = redeem(
            headers,
            Extension(state.clone()),
            Some(Json(RedeemRequest {
                token: token.clone(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(SET_COOKIE).is_none());

        // The link was not consumed.
        let still_valid = state
            .tokens()
            .validate(&token, false, Some(SCOPE_LOGIN))
            .await;
        assert!(still_valid.is_ok());
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let (state, _users, _outbox) = state();
        let response = redeem(
            HeaderMap::new(),
            Extension(state),
            Some(Json(RedeemRequest {
                token: "ABCDEFGHIJKL-nope".to_string(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
