//! `PgTokenStore` against a real database.
//!
//! Runs only when `PASSWORDLESS_TEST_DSN` points at a scratch Postgres
//! database; the schema from `sql/schema.sql` is applied on connect.

use anyhow::{Context, Result, anyhow};
use argon2::Params;
use chrono::{Duration, Utc};
use passwordless::{
    api::users::{PgUsers, User},
    token::{
        ManualClock, PgTokenStore, SCOPE_AUTH, SCOPE_LOGIN, SecretHasher, TokenError,
        TokenService, TokenStore,
    },
};
use secrecy::ExposeSecret;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

async fn pool() -> Result<Option<PgPool>> {
    let Ok(dsn) = std::env::var("PASSWORDLESS_TEST_DSN") else {
        eprintln!("PASSWORDLESS_TEST_DSN not set, skipping");
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&dsn)
        .await
        .context("Failed to connect to test database")?;
    sqlx::raw_sql(SCHEMA_SQL).execute(&pool).await?;
    Ok(Some(pool))
}

async fn insert_user(pool: &PgPool) -> Result<User> {
    let user = User {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", Uuid::new_v4()),
    };
    sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2)")
        .bind(user.id)
        .bind(&user.email)
        .execute(pool)
        .await?;
    Ok(user)
}

fn service(pool: &PgPool, clock: Arc<ManualClock>) -> Result<TokenService<User>> {
    let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
        .map_err(|e| anyhow!("argon2 params: {e}"))?;
    let tokens: TokenService<User> = TokenService::new(
        Arc::new(PgTokenStore::new(pool.clone())),
        Arc::new(PgUsers::new(pool.clone())),
    );
    Ok(tokens.with_clock(clock).with_hasher(SecretHasher::new(params)))
}

#[tokio::test]
async fn issue_validate_consume() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let tokens = service(&pool, clock)?;
    let user = insert_user(&pool).await?;

    let token = tokens.issue(&user, Duration::minutes(30), SCOPE_LOGIN).await?;

    let found = tokens
        .validate(token.expose_secret(), false, Some(SCOPE_LOGIN))
        .await?;
    assert_eq!(found, user);

    let wrong_scope = tokens
        .validate(token.expose_secret(), false, Some(SCOPE_AUTH))
        .await;
    assert!(matches!(wrong_scope, Err(TokenError::NotFound)));

    tokens
        .validate(token.expose_secret(), true, Some(SCOPE_LOGIN))
        .await?;
    let reused = tokens
        .validate(token.expose_secret(), true, Some(SCOPE_LOGIN))
        .await;
    assert!(matches!(reused, Err(TokenError::NotFound)));

    Ok(())
}

#[tokio::test]
async fn expired_rows_are_hidden_then_swept() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let tokens = service(&pool, clock.clone())?;
    let user = insert_user(&pool).await?;

    let token = tokens.issue(&user, Duration::minutes(1), SCOPE_AUTH).await?;
    clock.advance(Duration::minutes(2));

    let expired = tokens
        .validate(token.expose_secret(), false, Some(SCOPE_AUTH))
        .await;
    assert!(matches!(expired, Err(TokenError::NotFound)));

    assert!(tokens.clear_expired().await? >= 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consume_succeeds_once() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let tokens = Arc::new(service(&pool, clock)?);
    let user = insert_user(&pool).await?;

    for _ in 0..10 {
        let token = tokens.issue(&user, Duration::minutes(30), SCOPE_LOGIN).await?;
        let token = token.expose_secret().to_string();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tokens = tokens.clone();
                let token = token.clone();
                tokio::spawn(async move { tokens.validate(&token, true, Some(SCOPE_LOGIN)).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await? {
                Ok(_) => successes += 1,
                Err(TokenError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }
        assert_eq!(successes, 1);
    }

    Ok(())
}

#[tokio::test]
async fn ping_succeeds() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    PgTokenStore::new(pool).ping().await?;
    Ok(())
}
