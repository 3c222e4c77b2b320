//! Token lifecycle: generation, hashed storage, scoped lookup, validation,
//! expiry, and single-use consumption.
//!
//! ## Token Format
//!
//! The only client-visible artifact is `identifier-secret`: a 12-character
//! alphanumeric identifier used as the lookup key, and a 48-character
//! alphanumeric secret stored only as an Argon2id hash. Scope and expiry live
//! server-side; nothing about them can be read from the string.
//!
//! ## Validity
//!
//! A record validates while `expires_at >= now`. There is no "used" flag:
//! single use is deletion, and the periodic sweep deletes `expires_at < now`.

pub mod clock;
pub mod error;
pub mod generator;
pub mod hash;
pub mod principal;
pub mod record;
pub mod service;
pub mod store;

use std::future::Future;
use std::pin::Pin;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{GenerationError, StoreError, TokenError};
pub use generator::SecureTokenGenerator;
pub use hash::SecretHasher;
pub use principal::{Principal, PrincipalLookup, PrincipalRef};
pub use record::{NewToken, TokenRecord};
pub use service::{Expiry, SCOPE_AUTH, SCOPE_LOGIN, TokenService};
pub use store::{MemoryTokenStore, PgTokenStore, TokenStore};

/// Boxed future returned by the object-safe store and lookup traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
