//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an action: the API server by default, or a
//! single expiry sweep with the `sweep` subcommand.

use crate::cli::actions::{Action, server, sweep};
use crate::cli::commands::{ARG_DSN, ARG_PORT, CMD_SWEEP, auth};
use anyhow::{Context, Result};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some(sweep_matches) = matches.subcommand_matches(CMD_SWEEP) {
        let dsn = sweep_matches
            .get_one::<String>(ARG_DSN)
            .cloned()
            .context("missing required argument: --dsn")?;
        return Ok(Action::Sweep(sweep::Args { dsn }));
    }

    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(server::Args {
        port,
        dsn,
        frontend_base_url: auth_opts.frontend_base_url,
        login_token_ttl_minutes: auth_opts.login_token_ttl_minutes,
        session_ttl_minutes: auth_opts.session_ttl_minutes,
        cookie_secure: auth_opts.cookie_secure,
        revoke_on_logout: auth_opts.revoke_on_logout,
        sweep_interval_seconds: auth_opts.sweep_interval_seconds,
    }))
}
