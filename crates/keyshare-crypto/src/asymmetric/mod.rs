//! Asymmetric cryptography providers
//!
//! A provider generates account key pairs and wraps short secrets for a single
//! recipient. Callers only ever hand it fixed-size symmetric secrets; private keys
//! are protected with the symmetric primitives instead.

pub mod rsa;

use zeroize::Zeroizing;

pub use self::rsa::{RsaPadding, RsaProvider};
use crate::{
    algorithm::{AlgorithmDescriptor, GeneratedKeyPair},
    error::{Error, Result},
};

const SELF_TEST_PAYLOAD: &[u8] = b"keyshare:provider-self-test";

pub trait AsymmetricProvider: Send + Sync + 'static {
    /// Scheme and parameters this provider was built for
    fn descriptor(&self) -> AlgorithmDescriptor;

    /// Generate a fresh key pair
    fn generate_keypair(&self) -> Result<GeneratedKeyPair>;

    /// Encrypt `data` so that only the holder of the matching private key can read it
    fn encrypt_with_public(&self, data: &[u8], public_key: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt a payload produced by [`AsymmetricProvider::encrypt_with_public`]
    fn decrypt_with_private(
        &self,
        ciphertext: &[u8],
        private_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// Largest payload `encrypt_with_public` accepts for `public_key`
    fn max_payload(&self, public_key: &[u8]) -> Result<usize>;

    /// Structural check that `private_key` is a key this provider can use
    fn check_private_key(&self, private_key: &[u8]) -> Result<()>;

    /// Setup-time self check: a generated pair must round-trip a payload
    fn validate(&self) -> Result<()> {
        let pair = self.generate_keypair()?;
        let ciphertext = self
            .encrypt_with_public(SELF_TEST_PAYLOAD, &pair.public_key)
            .map_err(|e| Error::Generation(format!("self-test encryption failed: {}", e)))?;
        let plaintext = self
            .decrypt_with_private(&ciphertext, &pair.private_key)
            .map_err(|e| Error::Generation(format!("self-test decryption failed: {}", e)))?;

        if plaintext.as_slice() != SELF_TEST_PAYLOAD {
            return Err(Error::Generation(
                "self-test payload did not round-trip".to_string(),
            ));
        }
        Ok(())
    }
}
