use thiserror::Error;

/// Bad generator parameters. Only reachable through programmer error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("token length must be at least 1")]
    InvalidLength,
    #[error("token alphabet must not be empty")]
    EmptyAlphabet,
}

/// Persistence backend failure. Surfaced to the caller as-is, never retried here.
#[derive(Debug, Error)]
#[error("token store failure: {context}")]
pub struct StoreError {
    context: &'static str,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    #[must_use]
    pub fn new(context: &'static str) -> Self {
        Self {
            context,
            source: None,
        }
    }

    pub fn with_source<E>(context: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            context,
            source: Some(Box::new(source)),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::with_source("database error", err)
    }
}

/// Every way issuing or validating a token can fail.
///
/// Callers presenting a result to an end user should collapse all validation
/// kinds into a single "not authenticated" answer; the messages below are
/// safe to show but deliberately say nothing about which stage failed beyond
/// what the end user already knows.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to hash token secret")]
    Hashing,
    #[error("token expiry is out of range")]
    InvalidExpiry,
    #[error("Token malformed")]
    Malformed,
    // Missing and expired tokens share this message on purpose.
    #[error("Token expired or not existent. Try to login again.")]
    NotFound,
    #[error("Token invalid")]
    Invalid,
    #[error("User does not exist")]
    PrincipalNotFound,
}

impl TokenError {
    /// True for failures caused by the presented token rather than the backend.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Malformed | Self::NotFound | Self::Invalid | Self::PrincipalNotFound
        )
    }
}
