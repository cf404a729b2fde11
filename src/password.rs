use std::sync::{Arc, OnceLock};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::error;

/// CredentialError
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("stored credential is malformed: {0}")]
    MalformedHash(String),
}

/// CredentialVerifier
///
/// One-way credential service. Plaintext secrets go in, only opaque hashes are
/// ever stored or compared.
pub trait CredentialVerifier: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, CredentialError>;

    /// Returns `Ok(false)` for a wrong secret; `Err` only when the stored hash is unusable.
    fn verify(&self, plain: &str, hash: &str) -> Result<bool, CredentialError>;

    /// A well-formed hash matching no real account. Logins for unknown emails verify
    /// against it so they cost as much as a wrong password.
    fn decoy_hash(&self) -> String;
}

/// Shared handle placed in `AppState`.
pub type CredentialState = Arc<dyn CredentialVerifier>;

/// Argon2id with the crate's default parameters, producing PHC strings.
#[derive(Debug, Clone, Default)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, plain: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                CredentialError::Hash(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, plain: &str, hash: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            CredentialError::MalformedHash(e.to_string())
        })?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    fn decoy_hash(&self) -> String {
        static DECOY: OnceLock<String> = OnceLock::new();
        DECOY
            .get_or_init(|| {
                // Default parameters match stored hashes; only the salt differs.
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(b"decoy-credential", &salt)
                    .map(|hash| hash.to_string())
                    .unwrap_or_default()
            })
            .clone()
    }
}
