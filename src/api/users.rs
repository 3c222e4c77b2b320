//! Users the server issues tokens for.
//!
//! Registration is not handled here: the `users` table is filled by whatever
//! owns accounts, and this directory only reads it.

use serde::Serialize;
use sqlx::{PgPool, Row};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{Instrument, info_span};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::token::{BoxFuture, Principal, PrincipalLookup, PrincipalRef, StoreError};

/// `principal_type` stored for users.
pub const PRINCIPAL_KIND: &str = "user";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

impl Principal for User {
    fn principal_ref(&self) -> PrincipalRef {
        PrincipalRef::new(PRINCIPAL_KIND, self.id.to_string())
    }
}

/// User id from a stored reference, `None` for foreign kinds or bad ids.
fn user_id(reference: &PrincipalRef) -> Option<Uuid> {
    if reference.kind != PRINCIPAL_KIND {
        return None;
    }
    Uuid::parse_str(&reference.id).ok()
}

/// Principal lookup plus the email lookup the login-link flow needs.
pub trait UserDirectory: PrincipalLookup<Principal = User> {
    /// `email` is already normalized (trimmed, lowercase).
    fn find_by_email<'a>(&'a self, email: &'a str)
    -> BoxFuture<'a, Result<Option<User>, StoreError>>;
}

#[derive(Clone, Debug)]
pub struct PgUsers {
    pool: PgPool,
}

impl PgUsers {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PrincipalLookup for PgUsers {
    type Principal = User;

    fn find<'a>(
        &'a self,
        reference: &'a PrincipalRef,
    ) -> BoxFuture<'a, Result<Option<User>, StoreError>> {
        Box::pin(async move {
            let Some(id) = user_id(reference) else {
                return Ok(None);
            };
            let query = "SELECT id, email FROM users WHERE id = $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            let row = sqlx::query(query)
                .bind(id)
                .fetch_optional(&self.pool)
                .instrument(span)
                .await
                .map_err(|err| StoreError::with_source("failed to lookup user", err))?;

            Ok(row.map(|row| User {
                id: row.get("id"),
                email: row.get("email"),
            }))
        })
    }
}

impl UserDirectory for PgUsers {
    fn find_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>, StoreError>> {
        Box::pin(async move {
            let query = "SELECT id, email FROM users WHERE email = $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            let row = sqlx::query(query)
                .bind(email)
                .fetch_optional(&self.pool)
                .instrument(span)
                .await
                .map_err(|err| StoreError::with_source("failed to lookup user by email", err))?;

            Ok(row.map(|row| User {
                id: row.get("id"),
                email: row.get("email"),
            }))
        })
    }
}

/// In-process directory for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryUsers {
    users: Mutex<Vec<User>>,
}

impl MemoryUsers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user with a fresh id; the email is stored normalized.
    pub fn add(&self, email: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
        };
        self.lock().push(user.clone());
        user
    }

    pub fn remove(&self, id: Uuid) {
        self.lock().retain(|user| user.id != id);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<User>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PrincipalLookup for MemoryUsers {
    type Principal = User;

    fn find<'a>(
        &'a self,
        reference: &'a PrincipalRef,
    ) -> BoxFuture<'a, Result<Option<User>, StoreError>> {
        Box::pin(async move {
            let Some(id) = user_id(reference) else {
                return Ok(None);
            };
            Ok(self.lock().iter().find(|user| user.id == id).cloned())
        })
    }
}

impl UserDirectory for MemoryUsers {
    fn find_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>, StoreError>> {
        Box::pin(async move { Ok(self.lock().iter().find(|user| user.email == email).cloned()) })
    }
}
