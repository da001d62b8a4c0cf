//! One-way password hashing.
//!
//! The credential service only needs two operations, `hash` and `verify`, so
//! the algorithm sits behind [`PasswordScheme`]. The production scheme is
//! Argon2id with parameters taken from `[security]` in the config.

use std::sync::Arc;

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::SecurityConfig;

/// Slow, salted, one-way password hashing.
pub trait PasswordScheme: Send + Sync {
    /// Produce an opaque hash for `plaintext`.
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Check `plaintext` against a hash previously produced by [`PasswordScheme::hash`].
    ///
    /// A mismatch is `Ok(false)`; only an unreadable stored hash is an error.
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct Argon2Scheme {
    params: Params,
}

impl Argon2Scheme {
    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordScheme for Argon2Scheme {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        // Cost parameters are read back from the PHC string, so hashes made
        // under older settings still verify.
        Ok(self
            .argon2()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Hash on the blocking pool; Argon2 is CPU-bound and would stall the runtime.
pub async fn hash_blocking(scheme: Arc<dyn PasswordScheme>, plaintext: &str) -> Result<String> {
    let plaintext = plaintext.to_string();
    task::spawn_blocking(move || scheme.hash(&plaintext))
        .await
        .context("Password hashing task panicked")?
}

/// Verify on the blocking pool.
pub async fn verify_blocking(
    scheme: Arc<dyn PasswordScheme>,
    plaintext: &str,
    hash: &str,
) -> Result<bool> {
    let plaintext = plaintext.to_string();
    let hash = hash.to_string();
    task::spawn_blocking(move || scheme.verify(&plaintext, &hash))
        .await
        .context("Password verification task panicked")?
}
