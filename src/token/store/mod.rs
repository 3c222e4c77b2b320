//! Token persistence.
//!
//! Stores are additive: `insert` never overwrites, so two concurrent issues
//! that happen to draw the same identifier both land, and `find_valid` picks
//! the most recently created one. Nothing here retries; a backend failure is
//! returned to the caller immediately.

mod memory;
mod postgres;

pub use memory::MemoryTokenStore;
pub use postgres::PgTokenStore;

use chrono::{DateTime, Utc};

use super::{
    BoxFuture,
    error::StoreError,
    record::{NewToken, TokenRecord},
};

pub trait TokenStore: Send + Sync {
    /// Persist a new record.
    fn insert<'a>(&'a self, token: NewToken) -> BoxFuture<'a, Result<TokenRecord, StoreError>>;

    /// The newest record with `identifier`, matching `scope` unless it is
    /// `None`/empty, and `expires_at >= now`.
    fn find_valid<'a>(
        &'a self,
        identifier: &'a str,
        scope: Option<&'a str>,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<Option<TokenRecord>, StoreError>>;

    /// Remove a record, returning `false` when it was already gone.
    /// Deleting a missing record is not an error.
    fn delete<'a>(&'a self, record: &'a TokenRecord) -> BoxFuture<'a, Result<bool, StoreError>>;

    /// Remove every record with `expires_at < now`, returning how many went.
    fn delete_expired(&self, now: DateTime<Utc>) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Cheap liveness check for the health endpoint.
    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}
