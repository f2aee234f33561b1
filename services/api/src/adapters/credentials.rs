//! services/api/src/adapters/credentials.rs
//!
//! Argon2-backed implementation of the admin `CredentialVerifier`. The shared
//! password is hashed once at startup; only the hash is kept in memory.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use clinic_core::admin::CredentialVerifier;
use clinic_core::ports::{PortError, PortResult};
use tracing::error;

pub struct Argon2Credential {
    hash: String,
}

impl Argon2Credential {
    pub fn from_password(password: &str) -> PortResult<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PortError::Unexpected(format!("Failed to hash admin password: {}", e)))?
            .to_string();
        Ok(Self { hash })
    }
}

impl CredentialVerifier for Argon2Credential {
    fn verify(&self, candidate: &str) -> bool {
        let parsed = match PasswordHash::new(&self.hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Failed to parse admin password hash: {:?}", e);
                return false;
            }
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }
}
