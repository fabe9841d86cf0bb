use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{traits::PublicKeyParts, Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::AsymmetricProvider;
use crate::{
    algorithm::{AlgorithmDescriptor, AlgorithmId, GeneratedKeyPair},
    error::{Error, Result},
};

/// Encryption padding used by [`RsaProvider`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPadding {
    /// OAEP with SHA-256 and MGF1-SHA-256
    OaepSha256,
    /// PKCS#1 v1.5
    Pkcs1v15,
}

impl RsaPadding {
    /// Bytes of the modulus consumed by the padding
    pub fn overhead(self) -> usize {
        match self {
            // 2 * hLen + 2
            Self::OaepSha256 => 66,
            Self::Pkcs1v15 => 11,
        }
    }

    fn algorithm_id(self) -> AlgorithmId {
        match self {
            Self::OaepSha256 => AlgorithmId::RsaOaepSha256,
            Self::Pkcs1v15 => AlgorithmId::RsaPkcs1v15,
        }
    }
}

pub struct Rsa {
    pub inner: RsaPrivateKey,
}

impl From<RsaPrivateKey> for Rsa {
    fn from(value: RsaPrivateKey) -> Self {
        Self { inner: value }
    }
}

impl Rsa {
    /// Generate a new RSA key pair with specified bit length
    pub fn generate(bits: usize) -> Result<Self> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| Error::Generation(format!("Failed to generate RSA key: {}", e)))?;
        Ok(private_key.into())
    }

    /// Import from PKCS8 DER format
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_der(der)?;
        Ok(private_key.into())
    }

    /// Export private key to PKCS8 DER format
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let der = self.inner.to_pkcs8_der()?;
        Ok(Zeroizing::new(der.as_bytes().to_vec()))
    }

    /// Export public key to SPKI DER format
    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        let der = self.inner.to_public_key().to_public_key_der()?;
        Ok(der.as_bytes().to_vec())
    }

    /// Get key size in bits
    pub fn size(&self) -> usize {
        self.inner.size() * 8
    }

    pub fn decrypt(&self, padding: RsaPadding, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let result = match padding {
            RsaPadding::OaepSha256 => self.inner.decrypt(Oaep::new::<Sha256>(), ciphertext),
            RsaPadding::Pkcs1v15 => self.inner.decrypt(Pkcs1v15Encrypt, ciphertext),
        };
        result.map_err(|e| Error::Decrypt(format!("RSA decryption failed: {}", e)))
    }
}

/// Import public key from SPKI DER format
pub fn public_key_from_spki_der(der: &[u8]) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_der(der).map_err(Into::into)
}

/// Encrypt data using an RSA public key
pub fn encrypt(
    public_key: &RsaPublicKey,
    padding: RsaPadding,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let max = public_key.size().saturating_sub(padding.overhead());
    if plaintext.len() > max {
        return Err(Error::PayloadTooLarge {
            len: plaintext.len(),
            max,
        });
    }

    let mut rng = rand::thread_rng();
    let result = match padding {
        RsaPadding::OaepSha256 => public_key.encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext),
        RsaPadding::Pkcs1v15 => public_key.encrypt(&mut rng, Pkcs1v15Encrypt, plaintext),
    };
    result.map_err(|e| Error::Encrypt(format!("RSA encryption failed: {}", e)))
}

// ============================================================================
// Provider
// ============================================================================

/// RSA-class [`AsymmetricProvider`]
///
/// Public keys travel as SPKI DER and private keys as PKCS#8 DER. Every call
/// draws from its own thread-local RNG, so the provider is safe to share.
#[derive(Debug, Clone)]
pub struct RsaProvider {
    padding: RsaPadding,
    bits: usize,
}

impl RsaProvider {
    pub fn new(padding: RsaPadding, bits: usize) -> Self {
        Self { padding, bits }
    }

    pub fn padding(&self) -> RsaPadding {
        self.padding
    }
}

impl AsymmetricProvider for RsaProvider {
    fn descriptor(&self) -> AlgorithmDescriptor {
        AlgorithmDescriptor {
            id: self.padding.algorithm_id(),
            key_size: self.bits,
        }
    }

    fn generate_keypair(&self) -> Result<GeneratedKeyPair> {
        let key = Rsa::generate(self.bits)?;
        let public_key = key
            .to_spki_der()
            .map_err(|e| Error::Generation(format!("RSA public key export failed: {}", e)))?;
        let private_key = key
            .to_pkcs8_der()
            .map_err(|e| Error::Generation(format!("RSA private key export failed: {}", e)))?;

        Ok(GeneratedKeyPair {
            public_key,
            private_key,
            algorithm: self.descriptor(),
        })
    }

    fn encrypt_with_public(&self, data: &[u8], public_key: &[u8]) -> Result<Vec<u8>> {
        let public_key = public_key_from_spki_der(public_key)
            .map_err(|e| Error::Encrypt(format!("invalid RSA public key: {}", e)))?;
        encrypt(&public_key, self.padding, data)
    }

    fn decrypt_with_private(
        &self,
        ciphertext: &[u8],
        private_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let key = Rsa::from_pkcs8_der(private_key)
            .map_err(|e| Error::Decrypt(format!("invalid RSA private key: {}", e)))?;
        key.decrypt(self.padding, ciphertext).map(Zeroizing::new)
    }

    fn max_payload(&self, public_key: &[u8]) -> Result<usize> {
        let public_key = public_key_from_spki_der(public_key)?;
        Ok(public_key.size().saturating_sub(self.padding.overhead()))
    }

    fn check_private_key(&self, private_key: &[u8]) -> Result<()> {
        let key = Rsa::from_pkcs8_der(private_key)?;
        key.inner
            .validate()
            .map_err(|e| Error::Other(format!("RSA private key failed validation: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(padding: RsaPadding) -> RsaProvider {
        RsaProvider::new(padding, 2048)
    }

    #[test]
    fn test_key_generation() {
        let pair = provider(RsaPadding::OaepSha256).generate_keypair().unwrap();
        let key = Rsa::from_pkcs8_der(&pair.private_key).unwrap();
        assert_eq!(key.size(), 2048);
        assert_eq!(key.to_spki_der().unwrap(), pair.public_key);
        assert_eq!(pair.algorithm.id, AlgorithmId::RsaOaepSha256);
    }

    #[test]
    fn test_encrypt_decrypt_both_paddings() {
        for padding in [RsaPadding::OaepSha256, RsaPadding::Pkcs1v15] {
            let provider = provider(padding);
            let pair = provider.generate_keypair().unwrap();
            let secret = [7u8; 16];

            let ciphertext = provider.encrypt_with_public(&secret, &pair.public_key).unwrap();
            assert_ne!(ciphertext.as_slice(), secret.as_slice());

            let plaintext = provider
                .decrypt_with_private(&ciphertext, &pair.private_key)
                .unwrap();
            assert_eq!(plaintext.as_slice(), secret.as_slice());
        }
    }

    #[test]
    fn test_decrypt_with_other_key_fails() {
        let provider = provider(RsaPadding::OaepSha256);
        let alice = provider.generate_keypair().unwrap();
        let bob = provider.generate_keypair().unwrap();

        let ciphertext = provider.encrypt_with_public(b"for alice", &alice.public_key).unwrap();
        let result = provider.decrypt_with_private(&ciphertext, &bob.private_key);
        assert!(matches!(result, Err(Error::Decrypt(_))));
    }

    #[test]
    fn test_payload_bound() {
        let provider = provider(RsaPadding::OaepSha256);
        let pair = provider.generate_keypair().unwrap();

        let max = provider.max_payload(&pair.public_key).unwrap();
        assert_eq!(max, 256 - 66);

        let at_limit = vec![1u8; max];
        assert!(provider.encrypt_with_public(&at_limit, &pair.public_key).is_ok());

        let too_long = vec![1u8; max + 1];
        let result = provider.encrypt_with_public(&too_long, &pair.public_key);
        assert!(matches!(result, Err(Error::PayloadTooLarge { .. })));
    }

    #[test]
    fn test_malformed_inputs() {
        let provider = provider(RsaPadding::Pkcs1v15);
        let pair = provider.generate_keypair().unwrap();

        assert!(matches!(
            provider.encrypt_with_public(b"x", b"not a key"),
            Err(Error::Encrypt(_))
        ));
        assert!(matches!(
            provider.decrypt_with_private(b"garbage", &pair.private_key),
            Err(Error::Decrypt(_))
        ));
        assert!(provider.check_private_key(&pair.private_key).is_ok());
        assert!(provider.check_private_key(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_validation_self_test() {
        assert!(provider(RsaPadding::OaepSha256).validate().is_ok());
    }
}
