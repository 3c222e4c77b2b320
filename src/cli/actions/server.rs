use crate::{api, session::SessionConfig};
use anyhow::Result;
use std::fmt::Write;
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub login_token_ttl_minutes: i64,
    pub session_ttl_minutes: i64,
    pub cookie_secure: bool,
    pub revoke_on_logout: bool,
    pub sweep_interval_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let auth_config = api::state::AuthConfig::new(args.frontend_base_url)
        .with_login_token_ttl_minutes(args.login_token_ttl_minutes);

    let session_config = SessionConfig::new()
        .with_ttl_minutes(args.session_ttl_minutes)
        .with_secure(args.cookie_secure)
        .with_revoke_on_logout(args.revoke_on_logout);

    api::new(
        args.port,
        args.dsn,
        auth_config,
        session_config,
        Duration::from_secs(args.sweep_interval_seconds),
    )
    .await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        ("frontend_base_url", args.frontend_base_url.clone()),
        (
            "login_token_ttl_minutes",
            args.login_token_ttl_minutes.to_string(),
        ),
        ("session_ttl_minutes", args.session_ttl_minutes.to_string()),
        ("cookie_secure", args.cookie_secure.to_string()),
        ("revoke_on_logout", args.revoke_on_logout.to_string()),
        (
            "sweep_interval_seconds",
            args.sweep_interval_seconds.to_string(),
        ),
    ];
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = String::from("Startup configuration:");
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ = write!(message, "\n  {key}{padding}  {value}");
    }
    info!("{message}");
}

pub(crate) fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}
