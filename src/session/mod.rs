//! Cookie-backed sessions on top of the token engine.
//!
//! A session is an `auth`-scoped token whose opaque string lives in the
//! `auth_token` cookie. Checks validate without consuming, so the cookie keeps
//! working until the record expires. Nothing else is kept server-side.

pub mod cookie;
pub mod middleware;

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, instrument};

pub use cookie::{Cookie, CookieJar};
pub use middleware::require_session;

use crate::token::{Expiry, Principal, SCOPE_AUTH, TokenError, TokenService};

/// Default cookie name.
pub const COOKIE_NAME: &str = "auth_token";
/// Default session lifetime, 30 days.
pub const DEFAULT_TTL_MINUTES: i64 = 43_200;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    cookie_name: String,
    ttl_minutes: i64,
    secure: bool,
    revoke_on_logout: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: COOKIE_NAME.to_string(),
            ttl_minutes: DEFAULT_TTL_MINUTES,
            secure: true,
            revoke_on_logout: false,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    #[must_use]
    pub fn with_ttl_minutes(mut self, ttl_minutes: i64) -> Self {
        self.ttl_minutes = ttl_minutes;
        self
    }

    /// Plain-HTTP development only.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Delete the token record on logout instead of only clearing the cookie.
    #[must_use]
    pub fn with_revoke_on_logout(mut self, revoke_on_logout: bool) -> Self {
        self.revoke_on_logout = revoke_on_logout;
        self
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn revoke_on_logout(&self) -> bool {
        self.revoke_on_logout
    }
}

/// Why a request carries no usable session.
#[derive(Debug, Error)]
pub enum SessionRejection {
    #[error("No token provided")]
    Missing,
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl SessionRejection {
    /// `true` for client-side causes, `false` when the backend failed.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Token(err) => err.is_rejection(),
        }
    }
}

pub struct SessionCookieAuth<P> {
    tokens: Arc<TokenService<P>>,
    config: SessionConfig,
}

impl<P> SessionCookieAuth<P>
where
    P: Principal + Send + Sync + 'static,
{
    pub fn new(tokens: Arc<TokenService<P>>, config: SessionConfig) -> Self {
        Self { tokens, config }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService<P> {
        &self.tokens
    }

    /// Start a session with the configured lifetime.
    ///
    /// # Errors
    /// Returns the `TokenError` from issuance.
    pub async fn login(&self, jar: &mut CookieJar, principal: &P) -> Result<(), TokenError> {
        self.login_for(jar, principal, self.config.ttl_minutes).await
    }

    /// Start a session lasting `ttl_minutes`; cookie and record expire together.
    ///
    /// # Errors
    /// Returns the `TokenError` from issuance.
    #[instrument(skip(self, jar, principal))]
    pub async fn login_for(
        &self,
        jar: &mut CookieJar,
        principal: &P,
        ttl_minutes: i64,
    ) -> Result<(), TokenError> {
        let token = self
            .tokens
            .issue(principal, Expiry::minutes(ttl_minutes), SCOPE_AUTH)
            .await?;
        jar.queue(Cookie::session(
            &self.config.cookie_name,
            token,
            ttl_minutes,
            self.config.secure,
        ));
        debug!(principal = %principal.principal_ref(), "session started");
        Ok(())
    }

    /// `true` when the jar holds a cookie that resolves to a principal.
    pub async fn check(&self, jar: &CookieJar) -> bool {
        self.current_principal(jar).await.is_some()
    }

    /// The session principal, or `None` for any failure.
    pub async fn current_principal(&self, jar: &CookieJar) -> Option<P> {
        self.authenticate(jar).await.ok()
    }

    /// Like `current_principal`, keeping the reason a request is rejected.
    ///
    /// # Errors
    /// `Missing` without a cookie, otherwise the validation error.
    pub async fn authenticate(&self, jar: &CookieJar) -> Result<P, SessionRejection> {
        let Some(token) = jar.get(&self.config.cookie_name) else {
            return Err(SessionRejection::Missing);
        };
        self.tokens
            .validate(token, false, Some(SCOPE_AUTH))
            .await
            .map_err(|err| {
                if !err.is_rejection() {
                    error!("Failed to validate session: {err}");
                }
                SessionRejection::Token(err)
            })
    }

    /// Clear the cookie. The token record stays valid until it expires unless
    /// `revoke_on_logout` is set.
    pub async fn logout(&self, jar: &mut CookieJar) {
        if self.config.revoke_on_logout {
            if let Some(token) = jar.get(&self.config.cookie_name).map(str::to_string) {
                match self.tokens.revoke(&token, Some(SCOPE_AUTH)).await {
                    Ok(()) => debug!("session token revoked"),
                    Err(err) if err.is_rejection() => debug!("nothing to revoke: {err}"),
                    Err(err) => error!("Failed to revoke session token: {err}"),
                }
            }
        }
        jar.queue(Cookie::removal(&self.config.cookie_name, self.config.secure));
    }
}
