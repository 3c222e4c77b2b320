use chrono::{DateTime, Utc};

use super::principal::PrincipalRef;

/// A token row as handed to `TokenStore::insert`.
#[derive(Clone, Debug)]
pub struct NewToken {
    pub identifier: String,
    pub secret_hash: String,
    pub principal: PrincipalRef,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A persisted token. Records are never updated, only deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: i64,
    pub identifier: String,
    pub secret_hash: String,
    pub principal: PrincipalRef,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    #[must_use]
    pub fn from_new(id: i64, token: NewToken) -> Self {
        Self {
            id,
            identifier: token.identifier,
            secret_hash: token.secret_hash,
            principal: token.principal,
            scope: token.scope,
            expires_at: token.expires_at,
            created_at: token.created_at,
        }
    }

    /// Valid means `expires_at >= now`; the sweep takes the strict complement.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at >= now
    }

    /// `scope` of `None` or `""` matches every record.
    #[must_use]
    pub fn matches(&self, identifier: &str, scope: Option<&str>) -> bool {
        self.identifier == identifier
            && scope.is_none_or(|scope| scope.is_empty() || self.scope == scope)
    }
}
