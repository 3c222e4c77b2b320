use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::TokenStore;
use crate::token::{
    BoxFuture,
    error::StoreError,
    record::{NewToken, TokenRecord},
};

/// Process-local store keyed by insertion id.
///
/// The lock is held for one operation at a time, never across an await, so a
/// sweep cannot stall issuance for longer than a single pass over the map.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    records: BTreeMap<i64, TokenRecord>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored record in insertion order.
    #[must_use]
    pub fn records(&self) -> Vec<TokenRecord> {
        self.lock().records.values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic mid-operation cannot leave a half-written record behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn insert<'a>(&'a self, token: NewToken) -> BoxFuture<'a, Result<TokenRecord, StoreError>> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            let record = TokenRecord::from_new(id, token);
            inner.records.insert(id, record.clone());
            Ok(record)
        })
    }

    fn find_valid<'a>(
        &'a self,
        identifier: &'a str,
        scope: Option<&'a str>,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<Option<TokenRecord>, StoreError>> {
        Box::pin(async move {
            let inner = self.lock();
            let found = inner
                .records
                .values()
                .filter(|record| record.is_valid_at(now) && record.matches(identifier, scope))
                .max_by_key(|record| (record.created_at, record.id))
                .cloned();
            Ok(found)
        })
    }

    fn delete<'a>(&'a self, record: &'a TokenRecord) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move { Ok(self.lock().records.remove(&record.id).is_some()) })
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let mut inner = self.lock();
            let before = inner.records.len();
            inner.records.retain(|_, record| record.is_valid_at(now));
            let removed = before - inner.records.len();
            Ok(u64::try_from(removed).unwrap_or(u64::MAX))
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }
}
