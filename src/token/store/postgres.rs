use chrono::{DateTime, Utc};
use sqlx::{Connection, PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};

use super::TokenStore;
use crate::token::{
    BoxFuture,
    error::StoreError,
    principal::PrincipalRef,
    record::{NewToken, TokenRecord},
};

/// `passwordless_tokens` table, see `sql/schema.sql`.
#[derive(Clone, Debug)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn record_from_row(row: &PgRow) -> TokenRecord {
    TokenRecord {
        id: row.get("id"),
        identifier: row.get("identifier"),
        secret_hash: row.get("secret_hash"),
        principal: PrincipalRef {
            kind: row.get("principal_type"),
            id: row.get("principal_id"),
        },
        scope: row.get("scope"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}

impl TokenStore for PgTokenStore {
    fn insert<'a>(&'a self, token: NewToken) -> BoxFuture<'a, Result<TokenRecord, StoreError>> {
        Box::pin(async move {
            let query = r"
                INSERT INTO passwordless_tokens
                    (identifier, secret_hash, principal_type, principal_id, scope, expires_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
            ";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "INSERT",
                db.statement = query
            );
            let row = sqlx::query(query)
                .bind(&token.identifier)
                .bind(&token.secret_hash)
                .bind(&token.principal.kind)
                .bind(&token.principal.id)
                .bind(&token.scope)
                .bind(token.expires_at)
                .bind(token.created_at)
                .fetch_one(&self.pool)
                .instrument(span)
                .await
                .map_err(|err| StoreError::with_source("failed to insert token", err))?;

            Ok(TokenRecord::from_new(row.get("id"), token))
        })
    }

    fn find_valid<'a>(
        &'a self,
        identifier: &'a str,
        scope: Option<&'a str>,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<Option<TokenRecord>, StoreError>> {
        Box::pin(async move {
            // An empty scope disables the scope filter.
            let query = r"
                SELECT id, identifier, secret_hash, principal_type, principal_id,
                       scope, expires_at, created_at
                FROM passwordless_tokens
                WHERE identifier = $1
                  AND ($2::text IS NULL OR $2 = '' OR scope = $2)
                  AND expires_at >= $3
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            ";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            let row = sqlx::query(query)
                .bind(identifier)
                .bind(scope)
                .bind(now)
                .fetch_optional(&self.pool)
                .instrument(span)
                .await
                .map_err(|err| StoreError::with_source("failed to lookup token", err))?;

            Ok(row.as_ref().map(record_from_row))
        })
    }

    fn delete<'a>(&'a self, record: &'a TokenRecord) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move {
            // Zero affected rows means another caller removed it first.
            let query = "DELETE FROM passwordless_tokens WHERE id = $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "DELETE",
                db.statement = query
            );
            let result = sqlx::query(query)
                .bind(record.id)
                .execute(&self.pool)
                .instrument(span)
                .await
                .map_err(|err| StoreError::with_source("failed to delete token", err))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            // Single statement, row-level locks only on rows already past expiry.
            let query = "DELETE FROM passwordless_tokens WHERE expires_at < $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "DELETE",
                db.statement = query
            );
            let result = sqlx::query(query)
                .bind(now)
                .execute(&self.pool)
                .instrument(span)
                .await
                .map_err(|err| StoreError::with_source("failed to delete expired tokens", err))?;
            Ok(result.rows_affected())
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let acquire_span = info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            );
            let mut conn = self
                .pool
                .acquire()
                .instrument(acquire_span)
                .await
                .map_err(|err| StoreError::with_source("failed to acquire connection", err))?;
            let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
            conn.ping()
                .instrument(ping_span)
                .await
                .map_err(|err| StoreError::with_source("failed to ping database", err))
        })
    }
}
