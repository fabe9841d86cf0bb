//! Symmetric wrapping of private keys
//!
//! A private key is wrapped under a 32-byte key derived from the holder's
//! credential (see [`crate::kdf`]). Two nonce policies exist:
//!
//! - [`WrapMode::FixedNonce`]: a constant all-zero nonce. Each derived key is
//!   bound to one account and only ever seals that account's private key, which
//!   never changes, so the nonce is never reused across distinct plaintexts.
//! - [`WrapMode::RandomNonce`]: a fresh random nonce stored in front of the
//!   ciphertext, for deployments that want the stricter AEAD discipline.
//!
//! Both modes authenticate, so a wrong credential surfaces as an error rather
//! than as garbage plaintext.

pub mod aes;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub use self::aes::Aes;
use crate::error::Result;

const FIXED_NONCE: [u8; aes::NONCE_LEN] = [0u8; aes::NONCE_LEN];

/// Nonce policy for credential wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapMode {
    FixedNonce,
    RandomNonce,
}

impl Default for WrapMode {
    fn default() -> Self {
        Self::FixedNonce
    }
}

impl WrapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixedNonce => "fixed-nonce",
            Self::RandomNonce => "random-nonce",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fixed-nonce" => Some(Self::FixedNonce),
            "random-nonce" => Some(Self::RandomNonce),
            _ => None,
        }
    }
}

/// Wrap `plaintext` under `key`, binding it to `aad`
pub fn wrap(key: &[u8; 32], plaintext: &[u8], aad: &[u8], mode: WrapMode) -> Result<Vec<u8>> {
    let cipher = Aes::new(key);
    match mode {
        WrapMode::FixedNonce => cipher.encrypt_with_nonce_and_aad(plaintext, &FIXED_NONCE, aad),
        WrapMode::RandomNonce => cipher.encrypt_with_aad(plaintext, aad),
    }
}

/// Reverse [`wrap`]; fails when `key` or `aad` differ from the wrapping call
pub fn unwrap(
    key: &[u8; 32],
    wrapped: &[u8],
    aad: &[u8],
    mode: WrapMode,
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes::new(key);
    let plaintext = match mode {
        WrapMode::FixedNonce => cipher.decrypt_with_nonce_and_aad(wrapped, &FIXED_NONCE, aad)?,
        WrapMode::RandomNonce => cipher.decrypt_with_aad(wrapped, aad)?,
    };
    Ok(Zeroizing::new(plaintext))
}
