//! Argon2id hashing for token secrets.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;

use super::error::TokenError;

/// Salted, deliberately slow hash of token secrets.
///
/// Stored values are PHC strings (`$argon2id$v=19$...`), so verification reads
/// the parameters back from the hash and keeps working after `params` change.
#[derive(Clone, Debug)]
pub struct SecretHasher {
    params: Params,
}

impl SecretHasher {
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Hash a freshly generated secret with a random salt.
    ///
    /// # Errors
    /// Returns `TokenError::Hashing` if Argon2 rejects the input or parameters.
    pub fn hash(&self, secret: &str) -> Result<String, TokenError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|_| TokenError::Hashing)?
            .to_string();
        Ok(hash)
    }

    /// Re-hash `secret` and compare against `stored` in constant time.
    ///
    /// An unparsable stored hash counts as a mismatch.
    #[must_use]
    pub fn verify(&self, secret: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        self.argon2()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for SecretHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> SecretHasher {
    // Minimum cost parameters keep the suite fast; production uses the defaults.
    match Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None) {
        Ok(params) => SecretHasher::new(params),
        Err(_) => SecretHasher::default(),
    }
}
