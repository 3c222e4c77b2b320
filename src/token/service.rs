//! Token issuance and validation.
//!
//! Flow Overview: `issue` draws an identifier and a secret, stores only an
//! Argon2id hash of the secret, and hands back `identifier-secret` exactly
//! once. `validate` parses that string, finds the newest unexpired record for
//! the identifier in the requested scope, verifies the secret, resolves the
//! principal, and deletes the record only when asked to consume it and every
//! check passed.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use secrecy::SecretString;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    clock::{Clock, SystemClock},
    error::TokenError,
    generator::SecureTokenGenerator,
    hash::SecretHasher,
    principal::{Principal, PrincipalLookup},
    record::{NewToken, TokenRecord},
    store::TokenStore,
};

/// Scope of single-use login links.
pub const SCOPE_LOGIN: &str = "login";
/// Scope of long-lived session cookies.
pub const SCOPE_AUTH: &str = "auth";

/// When an issued token stops validating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiry {
    /// Whole minutes after the moment of issuance.
    Minutes(i64),
    /// Relative to the moment of issuance.
    In(Duration),
    /// Absolute instant.
    At(DateTime<Utc>),
}

impl Expiry {
    /// Range is checked at issuance, so any `i64` is accepted here.
    #[must_use]
    pub fn minutes(minutes: i64) -> Self {
        Self::Minutes(minutes)
    }

    fn resolve(self, now: DateTime<Utc>) -> Result<DateTime<Utc>, TokenError> {
        let ttl = match self {
            Self::Minutes(minutes) => {
                Duration::try_minutes(minutes).ok_or(TokenError::InvalidExpiry)?
            }
            Self::In(ttl) => ttl,
            Self::At(at) => return Ok(at),
        };
        now.checked_add_signed(ttl).ok_or(TokenError::InvalidExpiry)
    }
}

impl From<Duration> for Expiry {
    fn from(ttl: Duration) -> Self {
        Self::In(ttl)
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(at: DateTime<Utc>) -> Self {
        Self::At(at)
    }
}

pub struct TokenService<P> {
    store: Arc<dyn TokenStore>,
    principals: Arc<dyn PrincipalLookup<Principal = P>>,
    clock: Arc<dyn Clock>,
    generator: SecureTokenGenerator,
    hasher: SecretHasher,
}

impl<P> TokenService<P>
where
    P: Principal + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<dyn TokenStore>,
        principals: Arc<dyn PrincipalLookup<Principal = P>>,
    ) -> Self {
        Self {
            store,
            principals,
            clock: Arc::new(SystemClock),
            generator: SecureTokenGenerator::new(),
            hasher: SecretHasher::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: SecretHasher) -> Self {
        self.hasher = hasher;
        self
    }

    #[must_use]
    pub fn store(&self) -> &dyn TokenStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Mint a token for `principal` and return the opaque `identifier-secret`.
    ///
    /// The secret is never persisted in recoverable form; this return value
    /// is the only copy.
    ///
    /// # Errors
    /// Returns `InvalidExpiry` when the expiry is out of range, otherwise
    /// `Generation`, `Hashing`, or `Store` errors.
    #[instrument(skip(self, principal, expiry), fields(principal = tracing::field::Empty))]
    pub async fn issue(
        &self,
        principal: &P,
        expiry: impl Into<Expiry>,
        scope: &str,
    ) -> Result<SecretString, TokenError> {
        let principal = principal.principal_ref();
        tracing::Span::current().record("principal", tracing::field::display(&principal));

        let identifier = self.generator.identifier()?;
        let secret = self.generator.secret()?;
        let secret_hash = self.hash_secret(&secret).await?;

        let now = self.clock.now();
        let expires_at = expiry.into().resolve(now)?;
        let record = self
            .store
            .insert(NewToken {
                identifier,
                secret_hash,
                principal,
                scope: scope.to_string(),
                expires_at,
                created_at: now,
            })
            .await?;

        debug!(
            identifier = %record.identifier,
            expires_at = %record.expires_at,
            "token issued"
        );

        Ok(SecretString::from(format!("{}-{secret}", record.identifier)))
    }

    /// Check a presented token and return the principal it was issued for.
    ///
    /// `scope` of `None` (or `""`) accepts a token of any scope. With
    /// `consume`, the record is deleted after, and only after, a successful
    /// check, so a failed attempt never burns a valid token.
    ///
    /// # Errors
    /// `Malformed`, `NotFound` (missing or expired), `Invalid` (wrong secret),
    /// `PrincipalNotFound`, or `Store`/`Hashing` backend failures.
    #[instrument(skip(self, presented))]
    pub async fn validate(
        &self,
        presented: &str,
        consume: bool,
        scope: Option<&str>,
    ) -> Result<P, TokenError> {
        let (record, principal) = self.check(presented, scope).await?;

        // Concurrent consumers can all pass `check`; only the one whose
        // delete removed the row wins.
        if consume {
            if !self.store.delete(&record).await? {
                debug!(identifier = %record.identifier, "token already consumed");
                return Err(TokenError::NotFound);
            }
            debug!(identifier = %record.identifier, "token consumed");
        }

        Ok(principal)
    }

    /// Validate and then delete, regardless of how the token was issued.
    ///
    /// # Errors
    /// Same as `validate`.
    #[instrument(skip(self, presented))]
    pub async fn revoke(&self, presented: &str, scope: Option<&str>) -> Result<(), TokenError> {
        let (record, _principal) = self.check(presented, scope).await?;
        if !self.store.delete(&record).await? {
            return Err(TokenError::NotFound);
        }
        debug!(identifier = %record.identifier, "token revoked");
        Ok(())
    }

    /// Drop every expired record. Hygiene only; expired tokens never validate.
    ///
    /// # Errors
    /// Returns `Store` if the backend fails.
    #[instrument(skip(self))]
    pub async fn clear_expired(&self) -> Result<u64, TokenError> {
        let removed = self.store.delete_expired(self.clock.now()).await?;
        debug!(removed, "expired tokens cleared");
        Ok(removed)
    }

    async fn check(
        &self,
        presented: &str,
        scope: Option<&str>,
    ) -> Result<(TokenRecord, P), TokenError> {
        let (identifier, secret) = parse_presented(presented)?;

        let Some(record) = self
            .store
            .find_valid(&identifier, scope, self.clock.now())
            .await?
        else {
            debug!(%identifier, "no valid token for identifier");
            return Err(TokenError::NotFound);
        };

        if !self.verify_secret(secret, record.secret_hash.clone()).await? {
            debug!(%identifier, "token secret mismatch");
            return Err(TokenError::Invalid);
        }

        let Some(principal) = self.principals.find(&record.principal).await? else {
            debug!(principal = %record.principal, "token principal no longer exists");
            return Err(TokenError::PrincipalNotFound);
        };

        Ok((record, principal))
    }

    async fn hash_secret(&self, secret: &str) -> Result<String, TokenError> {
        // Argon2 is CPU-bound; keep it off the async workers.
        let hasher = self.hasher.clone();
        let secret = secret.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|_| TokenError::Hashing)?
    }

    async fn verify_secret(&self, secret: String, stored: String) -> Result<bool, TokenError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &stored))
            .await
            .map_err(|_| TokenError::Hashing)
    }
}

/// Split a presented token into `(identifier, secret)`.
///
/// Some clients hand back the token re-serialized as a JSON string literal;
/// such input is decoded once. This is a compatibility shim, not a security
/// boundary: anything outside `[A-Za-z0-9- ]` is stripped afterwards anyway.
///
/// PHP `serialize` output (`s:61:"...";`) from legacy clients is not
/// decoded. After stripping it no longer matches any identifier, so it
/// validates as `NotFound`.
pub(crate) fn parse_presented(presented: &str) -> Result<(String, String), TokenError> {
    let decoded = decode_serialized(presented);

    let clean = Regex::new(r"[^A-Za-z0-9\- ]")
        .map(|re| re.replace_all(&decoded, "").into_owned())
        .map_err(|_| TokenError::Malformed)?;

    let Some((identifier, secret)) = clean.split_once('-') else {
        return Err(TokenError::Malformed);
    };
    if identifier.is_empty() || secret.is_empty() {
        return Err(TokenError::Malformed);
    }

    Ok((identifier.to_string(), secret.to_string()))
}

fn decode_serialized(presented: &str) -> Cow<'_, str> {
    match serde_json::from_str::<String>(presented.trim()) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(_) => Cow::Borrowed(presented),
    }
}
