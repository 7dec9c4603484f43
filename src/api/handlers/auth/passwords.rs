//! Password material: argon2id hashing and random password generation.

use anyhow::{Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};

/// Candidate characters for generated passwords. Ambiguous glyphs
/// (i, l, 1, o, 0, O, I) are excluded because these passwords are read
/// back from an out-of-band message and typed by hand.
const PASSWORD_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub(crate) const DEFAULT_RESET_PASSWORD_LENGTH: usize = 10;

/// Hash a plaintext password into an argon2id PHC string.
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Check a plaintext password against a stored PHC string.
/// Malformed stored hashes verify as false rather than erroring.
pub(crate) fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Source of generated passwords for the reset flow.
pub trait PasswordGenerator: Send + Sync {
    /// Produce a fresh plaintext password.
    fn generate(&self) -> SecretString;
}

/// Default generator: uniform draws from [`PASSWORD_ALPHABET`].
#[derive(Clone, Debug)]
pub struct RandomPasswordGenerator {
    length: usize,
}

impl RandomPasswordGenerator {
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }
}

impl Default for RandomPasswordGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_RESET_PASSWORD_LENGTH)
    }
}

impl PasswordGenerator for RandomPasswordGenerator {
    fn generate(&self) -> SecretString {
        let mut rng = rand::thread_rng();
        let password: String = (0..self.length)
            .map(|_| {
                let index = rng.gen_range(0..PASSWORD_ALPHABET.len());
                char::from(PASSWORD_ALPHABET[index])
            })
            .collect();
        SecretString::from(password)
    }
}
