//! Key Derivation Functions (KDF)
//!
//! Turns a login credential into the 32-byte key that wraps an account's
//! private key. Argon2id is used because the input is a human-chosen secret.
//! The salt is derived from the account id, so the same credential yields
//! different keys for different accounts without storing anything extra.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

const SALT_DOMAIN: &[u8] = b"keyshare:credential-salt:v1";

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialKdf {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for CredentialKdf {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl CredentialKdf {
    fn params(&self) -> Result<Params> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, Some(32))
            .map_err(|e| Error::Kdf(format!("invalid Argon2 parameters: {}", e)))
    }

    /// Check the parameters without deriving anything
    pub fn validate(&self) -> Result<()> {
        self.params().map(|_| ())
    }

    /// Derive the wrapping key for `context` (the account id) from `credential`
    pub fn derive(&self, credential: &[u8], context: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params()?);
        let salt = context_salt(context);

        let mut okm = Zeroizing::new([0u8; 32]);
        argon2
            .hash_password_into(credential, &salt, &mut okm[..])
            .map_err(|e| Error::Kdf(format!("Argon2 derivation failed: {}", e)))?;
        Ok(okm)
    }
}

/// 16-byte salt bound to `context`
pub fn context_salt(context: &[u8]) -> [u8; 16] {
    let mut hasher = Sha256::new();
    hasher.update(SALT_DOMAIN);
    hasher.update(context);
    let digest = hasher.finalize();

    let mut salt = [0u8; 16];
    salt.copy_from_slice(&digest[..16]);
    salt
}
