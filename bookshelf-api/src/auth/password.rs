use std::fmt;

use thiserror::Error;
use tokio::task::{JoinError, spawn_blocking};
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password hashing task did not complete: {0}")]
    Task(#[from] JoinError),
}

/// A bcrypt hash in its modular crypt format (`$2b$<cost>$<salt><digest>`).
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash([REDACTED])")
    }
}

/// Hashes `raw` with a fresh random salt at the given bcrypt `cost`.
///
/// Runs on the blocking pool since a single hash takes hundreds of milliseconds at
/// production costs.
pub async fn hash_password(raw: &str, cost: u32) -> Result<PasswordHash, PasswordError> {
    let raw = raw.to_owned();
    let hash = spawn_blocking(move || bcrypt::hash(raw, cost)).await??;

    Ok(PasswordHash(hash))
}

/// Returns `true` only when `raw` matches `hash`.
///
/// Fails closed: a malformed hash or a failed hashing task yields `false`.
pub async fn verify_password(raw: &str, hash: &str) -> bool {
    let raw = raw.to_owned();
    let hash = hash.to_owned();

    match spawn_blocking(move || bcrypt::verify(raw, &hash)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(err)) => {
            warn!(error = %err, "stored password hash could not be parsed");
            false
        }
        Err(err) => {
            error!(error = %err, "password verification task did not complete");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn matching_password_verifies() {
        let hash = hash_password("correct horse", TEST_COST).await.unwrap();

        assert!(verify_password("correct horse", hash.as_str()).await);
        assert!(!verify_password("battery staple", hash.as_str()).await);
    }

    #[tokio::test]
    async fn verification_is_deterministic() {
        let hash = hash_password("s3cret", TEST_COST).await.unwrap();

        for _ in 0..3 {
            assert!(verify_password("s3cret", hash.as_str()).await);
            assert!(!verify_password("S3cret", hash.as_str()).await);
        }
    }

    #[tokio::test]
    async fn each_hash_uses_a_fresh_salt() {
        let first = hash_password("s3cret", TEST_COST).await.unwrap();
        let second = hash_password("s3cret", TEST_COST).await.unwrap();

        assert_ne!(first, second);
        assert!(first.as_str().starts_with("$2b$04$"));
    }

    #[tokio::test]
    async fn malformed_hash_fails_closed() {
        assert!(!verify_password("s3cret", "not-a-bcrypt-hash").await);
        assert!(!verify_password("", "").await);
    }

    #[test]
    fn debug_output_hides_the_hash() {
        let hash = PasswordHash("$2b$04$abcdefghijklmnopqrstuv".to_string());

        assert_eq!(format!("{hash:?}"), "PasswordHash([REDACTED])");
    }
}
