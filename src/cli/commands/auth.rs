use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_LOGIN_TOKEN_TTL_MINUTES: &str = "login-token-ttl-minutes";
pub const ARG_SESSION_TTL_MINUTES: &str = "session-ttl-minutes";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_REVOKE_ON_LOGOUT: &str = "revoke-on-logout";
pub const ARG_SWEEP_INTERVAL_SECONDS: &str = "sweep-interval-seconds";

/// Upper bound for either token lifetime: ten years.
pub const MAX_TTL_MINUTES: i64 = 10 * 365 * 24 * 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub frontend_base_url: String,
    pub login_token_ttl_minutes: i64,
    pub session_ttl_minutes: i64,
    pub cookie_secure: bool,
    pub revoke_on_logout: bool,
    pub sweep_interval_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is somehow absent.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .context("missing required argument: --frontend-base-url")?,
            login_token_ttl_minutes: matches
                .get_one::<i64>(ARG_LOGIN_TOKEN_TTL_MINUTES)
                .copied()
                .context("missing required argument: --login-token-ttl-minutes")?,
            session_ttl_minutes: matches
                .get_one::<i64>(ARG_SESSION_TTL_MINUTES)
                .copied()
                .context("missing required argument: --session-ttl-minutes")?,
            cookie_secure: matches
                .get_one::<bool>(ARG_COOKIE_SECURE)
                .copied()
                .unwrap_or(true),
            revoke_on_logout: matches
                .get_one::<bool>(ARG_REVOKE_ON_LOGOUT)
                .copied()
                .unwrap_or(false),
            sweep_interval_seconds: matches
                .get_one::<u64>(ARG_SWEEP_INTERVAL_SECONDS)
                .copied()
                .context("missing required argument: --sweep-interval-seconds")?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_login_args(command);
    with_session_args(command)
}

fn with_login_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Page that redeems login links; the token is appended as ?token=")
                .env("PASSWORDLESS_FRONTEND_BASE_URL")
                .default_value("http://localhost:8080/login"),
        )
        .arg(
            Arg::new(ARG_LOGIN_TOKEN_TTL_MINUTES)
                .long(ARG_LOGIN_TOKEN_TTL_MINUTES)
                .help("Login link lifetime in minutes")
                .env("PASSWORDLESS_LOGIN_TOKEN_TTL_MINUTES")
                .default_value("30")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TTL_MINUTES)),
        )
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_MINUTES)
                .long(ARG_SESSION_TTL_MINUTES)
                .help("Session cookie lifetime in minutes")
                .env("PASSWORDLESS_SESSION_TTL_MINUTES")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TTL_MINUTES)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the session cookie Secure; set to false only for plain-HTTP development")
                .env("PASSWORDLESS_COOKIE_SECURE")
                .default_value("true")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new(ARG_REVOKE_ON_LOGOUT)
                .long(ARG_REVOKE_ON_LOGOUT)
                .help("Delete the session token on logout instead of only clearing the cookie")
                .env("PASSWORDLESS_REVOKE_ON_LOGOUT")
                .default_value("false")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new(ARG_SWEEP_INTERVAL_SECONDS)
                .long(ARG_SWEEP_INTERVAL_SECONDS)
                .help("Seconds between expired-token sweeps")
                .env("PASSWORDLESS_SWEEP_INTERVAL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
