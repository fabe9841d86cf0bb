//! AES-GCM authenticated encryption
//!
//! Provides AEAD encryption using AES-GCM algorithm with 256-bit keys.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};

use crate::error::{Error, Result};

/// Nonce length for AES-GCM
pub const NONCE_LEN: usize = 12;
/// Authentication tag length for AES-GCM
pub const TAG_LEN: usize = 16;

/// AES-256-GCM cipher wrapper
pub struct Aes {
    cipher: Aes256Gcm,
}

impl Aes {
    /// Create a new AES-256-GCM cipher from a 32-byte key
    pub fn new(key: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Self { cipher }
    }

    /// Encrypt with a random nonce and AAD
    ///
    /// Returns encrypted data with the 12-byte nonce prepended
    pub fn encrypt_with_aad(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, Payload { msg: plaintext, aad })
            .map_err(|e| Error::Symmetric(format!("AES-GCM encryption failed: {}", e)))?;

        let mut result = Vec::with_capacity(nonce.len() + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    /// Decrypt data produced by [`Aes::encrypt_with_aad`]
    pub fn decrypt_with_aad(&self, encrypted_data: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if encrypted_data.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::Symmetric(
                "Encrypted data too short for AES-GCM".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_LEN);
        let nonce: &[u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| Error::Symmetric("Invalid AES-GCM nonce".to_string()))?;
        self.decrypt_with_nonce_and_aad(ciphertext, nonce, aad)
    }

    /// Encrypt with an external nonce and AAD
    ///
    /// # Arguments
    /// * `plaintext` - Data to encrypt
    /// * `nonce` - 12-byte nonce for encryption
    /// * `aad` - Additional authenticated data (can be empty)
    ///
    /// # Returns
    /// Encrypted data with authentication tag, nonce NOT prepended
    pub fn encrypt_with_nonce_and_aad(
        &self,
        plaintext: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.cipher
            .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
            .map_err(|e| Error::Symmetric(format!("AES-GCM encryption with AAD failed: {}", e)))
    }

    /// Decrypt with an external nonce and AAD
    pub fn decrypt_with_nonce_and_aad(
        &self,
        encrypted_data: &[u8],
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        if encrypted_data.len() < TAG_LEN {
            return Err(Error::Symmetric(
                "Encrypted data too short for AES-GCM tag".to_string(),
            ));
        }

        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: encrypted_data,
                    aad,
                },
            )
            .map_err(|e| Error::Symmetric(format!("AES-GCM decryption with AAD failed: {}", e)))
    }
}
