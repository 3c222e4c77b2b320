//! Random identifier and secret generation.

use rand::{CryptoRng, Rng, RngCore, rngs::OsRng};

use super::error::GenerationError;

/// `[A-Za-z0-9]`, the alphabet for both identifiers and secrets.
pub const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const IDENTIFIER_LEN: usize = 12;
pub const SECRET_LEN: usize = 48;

/// Draws token material from the operating system CSPRNG.
///
/// The generator holds no state, so two calls never share randomness: knowing
/// an identifier gives no advantage when guessing the secret issued with it.
#[derive(Clone, Copy, Debug, Default)]
pub struct SecureTokenGenerator;

impl SecureTokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build a string of `length` characters, each picked uniformly from `alphabet`.
    ///
    /// # Errors
    /// Returns `GenerationError` if `length` is zero or `alphabet` is empty.
    pub fn generate(&self, length: usize, alphabet: &[u8]) -> Result<String, GenerationError> {
        generate_with_rng(&mut OsRng, length, alphabet)
    }

    /// 12-character public lookup key.
    ///
    /// # Errors
    /// Never fails with the built-in alphabet; the `Result` mirrors `generate`.
    pub fn identifier(&self) -> Result<String, GenerationError> {
        self.generate(IDENTIFIER_LEN, ALPHANUMERIC)
    }

    /// 48-character secret, returned to the caller once and only stored hashed.
    ///
    /// # Errors
    /// Never fails with the built-in alphabet; the `Result` mirrors `generate`.
    pub fn secret(&self) -> Result<String, GenerationError> {
        self.generate(SECRET_LEN, ALPHANUMERIC)
    }
}

fn generate_with_rng<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    length: usize,
    alphabet: &[u8],
) -> Result<String, GenerationError> {
    if length < 1 {
        return Err(GenerationError::InvalidLength);
    }
    if alphabet.is_empty() {
        return Err(GenerationError::EmptyAlphabet);
    }

    // gen_range samples without modulo bias.
    let token = (0..length)
        .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
        .collect();
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generate_respects_length_and_alphabet() {
        let generator = SecureTokenGenerator::new();
        let token = generator.generate(64, b"ab").unwrap_or_default();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c == 'a' || c == 'b'));
    }

    #[test]
    fn generate_rejects_zero_length() {
        let generator = SecureTokenGenerator::new();
        assert_eq!(
            generator.generate(0, ALPHANUMERIC),
            Err(GenerationError::InvalidLength)
        );
    }

    #[test]
    fn generate_rejects_empty_alphabet() {
        let generator = SecureTokenGenerator::new();
        assert_eq!(
            generator.generate(12, b""),
            Err(GenerationError::EmptyAlphabet)
        );
    }

    #[test]
    fn single_symbol_alphabet_is_deterministic() {
        let generator = SecureTokenGenerator::new();
        assert_eq!(generator.generate(3, b"x"), Ok("xxx".to_string()));
    }

    #[test]
    fn identifier_and_secret_lengths() -> Result<(), GenerationError> {
        let generator = SecureTokenGenerator::new();
        let identifier = generator.identifier()?;
        let secret = generator.secret()?;
        assert_eq!(identifier.len(), IDENTIFIER_LEN);
        assert_eq!(secret.len(), SECRET_LEN);
        assert!(identifier.bytes().all(|b| ALPHANUMERIC.contains(&b)));
        assert!(secret.bytes().all(|b| ALPHANUMERIC.contains(&b)));
        Ok(())
    }

    #[test]
    fn draws_do_not_repeat() -> Result<(), GenerationError> {
        let generator = SecureTokenGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            assert!(seen.insert(generator.identifier()?));
        }
        Ok(())
    }

    #[test]
    fn every_symbol_is_reachable() -> Result<(), GenerationError> {
        let generator = SecureTokenGenerator::new();
        let sample = generator.generate(4096, ALPHANUMERIC)?;
        let distinct: HashSet<char> = sample.chars().collect();
        assert_eq!(distinct.len(), ALPHANUMERIC.len());
        Ok(())
    }
}
