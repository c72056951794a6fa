//! One-way secret hashing.
//!
//! # Responsibility
//! - Define the `SecretHasher` capability consumed by `UserService`.
//! - Provide the default Argon2id implementation.
//!
//! # Invariants
//! - Plaintext secrets never leave the hasher; only PHC-format hashes are
//!   returned and persisted.
//! - Each hash uses a fresh random salt.

use crate::config::PasswordHashConfig;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use std::error::Error;
use std::fmt::{Display, Formatter};

const HASH_OUTPUT_LEN: usize = 32;

/// Errors from hashing or verifying a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretHashError {
    InvalidParams(String),
    Hash(String),
    MalformedHash(String),
}

impl Display for SecretHashError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParams(message) => write!(f, "invalid hash parameters: {message}"),
            Self::Hash(message) => write!(f, "failed to hash secret: {message}"),
            Self::MalformedHash(message) => write!(f, "malformed secret hash: {message}"),
        }
    }
}

impl Error for SecretHashError {}

/// Pluggable one-way hashing capability.
pub trait SecretHasher {
    fn hash_secret(&self, plaintext: &str) -> Result<String, SecretHashError>;
    fn verify_secret(&self, plaintext: &str, hash: &str) -> Result<bool, SecretHashError>;
}

impl<H: SecretHasher + ?Sized> SecretHasher for &H {
    fn hash_secret(&self, plaintext: &str) -> Result<String, SecretHashError> {
        (**self).hash_secret(plaintext)
    }

    fn verify_secret(&self, plaintext: &str, hash: &str) -> Result<bool, SecretHashError> {
        (**self).verify_secret(plaintext, hash)
    }
}

/// Argon2id hasher producing PHC strings (`$argon2id$v=19$...`).
#[derive(Debug, Clone)]
pub struct Argon2SecretHasher {
    params: Params,
}

impl Argon2SecretHasher {
    /// Builds a hasher from configured cost parameters.
    pub fn from_config(config: &PasswordHashConfig) -> Result<Self, SecretHashError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            Some(HASH_OUTPUT_LEN),
        )
        .map_err(|err| SecretHashError::InvalidParams(err.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl SecretHasher for Argon2SecretHasher {
    fn hash_secret(&self, plaintext: &str) -> Result<String, SecretHashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| SecretHashError::Hash(err.to_string()))
    }

    fn verify_secret(&self, plaintext: &str, hash: &str) -> Result<bool, SecretHashError> {
        let parsed =
            PasswordHash::new(hash).map_err(|err| SecretHashError::MalformedHash(err.to_string()))?;
        // Cost parameters are read from the PHC string, not from `self`.
        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(SecretHashError::Hash(err.to_string())),
        }
    }
}
