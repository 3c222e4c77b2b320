//! Shared handler state and login-link configuration.

use std::sync::Arc;
use url::Url;

use super::{email::LoginMailer, users::{User, UserDirectory}};
use crate::session::SessionCookieAuth;
use crate::token::TokenService;

const DEFAULT_LOGIN_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    login_token_ttl_minutes: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            login_token_ttl_minutes: DEFAULT_LOGIN_TOKEN_TTL_MINUTES,
        }
    }

    #[must_use]
    pub fn with_login_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.login_token_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn login_token_ttl_minutes(&self) -> i64 {
        self.login_token_ttl_minutes
    }

    /// `<frontend_base_url>?token=<token>`, appending to any existing query.
    ///
    /// # Errors
    /// Returns an error if the base URL does not parse.
    pub fn login_url(&self, token: &str) -> Result<String, url::ParseError> {
        let mut url = Url::parse(&self.frontend_base_url)?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.into())
    }
}

pub struct AuthState {
    config: AuthConfig,
    session: Arc<SessionCookieAuth<User>>,
    users: Arc<dyn UserDirectory>,
    mailer: Arc<dyn LoginMailer>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        session: Arc<SessionCookieAuth<User>>,
        users: Arc<dyn UserDirectory>,
        mailer: Arc<dyn LoginMailer>,
    ) -> Self {
        Self {
            config,
            session,
            users,
            mailer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService<User> {
        self.session.tokens()
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionCookieAuth<User>> {
        &self.session
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserDirectory {
        self.users.as_ref()
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn LoginMailer {
        self.mailer.as_ref()
    }
}
