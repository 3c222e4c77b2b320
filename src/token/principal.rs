//! Principals and the capability that resolves them.

use std::fmt;

use super::{BoxFuture, error::StoreError};

/// Stable `(type, id)` reference to the entity a token asserts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PrincipalRef {
    pub kind: String,
    pub id: String,
}

impl PrincipalRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for PrincipalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Anything a token can be issued for.
pub trait Principal {
    fn principal_ref(&self) -> PrincipalRef;
}

/// Host-supplied lookup from a stored reference back to a live principal.
///
/// `Ok(None)` means the entity is gone (e.g. the user was deleted after the
/// token was issued).
pub trait PrincipalLookup: Send + Sync {
    type Principal: Principal + Send;

    fn find<'a>(
        &'a self,
        reference: &'a PrincipalRef,
    ) -> BoxFuture<'a, Result<Option<Self::Principal>, StoreError>>;
}
