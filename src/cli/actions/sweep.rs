use crate::{
    api::users::{PgUsers, User},
    cli::actions::server::redact_dsn,
    sweeper::ExpirySweeper,
    token::{PgTokenStore, TokenService},
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
}

/// Delete expired tokens once.
/// # Errors
/// Returns an error if the database is unreachable or the delete fails.
pub async fn execute(args: Args) -> Result<()> {
    debug!(dsn = %redact_dsn(&args.dsn), "running one-shot sweep");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let tokens: TokenService<User> = TokenService::new(
        Arc::new(PgTokenStore::new(pool.clone())),
        Arc::new(PgUsers::new(pool.clone())),
    );
    let removed = ExpirySweeper::new(Arc::new(tokens))
        .run_once()
        .await
        .context("Failed to delete expired tokens")?;

    pool.close().await;

    println!("{removed}");

    Ok(())
}
