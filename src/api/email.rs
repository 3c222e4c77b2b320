//! Out-of-band delivery of login links.
//!
//! Delivery is a capability the host supplies. The default `LogLoginMailer`
//! writes the link to the log, which is enough for local development and
//! nothing else.

use anyhow::Result;
use tracing::info;

#[derive(Clone, Debug)]
pub struct LoginEmail {
    pub to_email: String,
    pub login_url: String,
    pub expires_in_minutes: i64,
}

pub trait LoginMailer: Send + Sync {
    /// Deliver the link or return an error; callers log and move on.
    fn send(&self, message: &LoginEmail) -> Result<()>;
}

/// Local dev mailer that logs the link instead of sending it.
#[derive(Clone, Debug)]
pub struct LogLoginMailer;

impl LoginMailer for LogLoginMailer {
    fn send(&self, message: &LoginEmail) -> Result<()> {
        info!(
            to_email = %message.to_email,
            login_url = %message.login_url,
            expires_in_minutes = message.expires_in_minutes,
            "login link send stub"
        );
        Ok(())
    }
}
