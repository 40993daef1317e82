//! Salted argon2id password hashing.

use anyhow::anyhow;
use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use serde::{Deserialize, Serialize};

/// Cost parameters for newly created hashes. Verification always uses the
/// parameters embedded in the stored PHC string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Hash a plain password with argon2id and a fresh random salt.
pub fn hash_password(password: &str, params: &HashingParams) -> anyhow::Result<String> {
    let cost = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
        .map_err(|e| anyhow!("invalid argon2 parameters: {e}"))?;
    let salt = SaltString::generate(&mut OsRng);

    Argon2::new(Algorithm::Argon2id, Version::V0x13, cost)
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow!("password hashing failed: {e}"))
}

/// Verify a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEAP: HashingParams = HashingParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn hash_verifies_and_is_salted() {
        let a = hash_password("juanjo123", &CHEAP).unwrap();
        let b = hash_password("juanjo123", &CHEAP).unwrap();

        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(verify_password("juanjo123", &a));
        assert!(verify_password("juanjo123", &b));
        assert!(!verify_password("juanjo124", &a));
    }

    #[test]
    fn plaintext_or_garbage_never_verifies() {
        assert!(!verify_password("secret", "secret"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn rejects_impossible_params() {
        let bad = HashingParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(hash_password("x", &bad).is_err());
    }
}
