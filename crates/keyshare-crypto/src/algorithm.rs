//! Algorithm selection
//!
//! An [`AlgorithmDescriptor`] names the asymmetric scheme that every account key
//! pair and every role share in a deployment is produced with. It is chosen once,
//! when the system is set up, and [`provider_for`] turns it into the matching
//! [`AsymmetricProvider`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    asymmetric::{
        rsa::{RsaPadding, RsaProvider},
        AsymmetricProvider,
    },
    error::{Error, Result},
};

/// Smallest RSA modulus accepted by [`provider_for`]
pub const MIN_RSA_BITS: usize = 2048;

/// Supported asymmetric schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmId {
    /// RSA with OAEP padding over SHA-256
    #[serde(rename = "rsa-oaep-sha256")]
    RsaOaepSha256,
    /// RSA with PKCS#1 v1.5 encryption padding
    #[serde(rename = "rsa-pkcs1v15")]
    RsaPkcs1v15,
}

impl Default for AlgorithmId {
    fn default() -> Self {
        Self::RsaOaepSha256
    }
}

impl std::fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RsaOaepSha256 => write!(f, "rsa-oaep-sha256"),
            Self::RsaPkcs1v15 => write!(f, "rsa-pkcs1v15"),
        }
    }
}

/// Scheme plus its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlgorithmDescriptor {
    pub id: AlgorithmId,
    /// Modulus size in bits
    pub key_size: usize,
}

impl Default for AlgorithmDescriptor {
    fn default() -> Self {
        Self {
            id: AlgorithmId::default(),
            key_size: 4096,
        }
    }
}

impl std::fmt::Display for AlgorithmDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.id, self.key_size)
    }
}

/// Freshly generated key pair
///
/// `public_key` is SPKI DER, `private_key` is PKCS#8 DER.
#[derive(Clone)]
pub struct GeneratedKeyPair {
    pub public_key: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
    pub algorithm: AlgorithmDescriptor,
}

impl std::fmt::Debug for GeneratedKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedKeyPair")
            .field("public_key_len", &self.public_key.len())
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Build the provider described by `descriptor`
///
/// # Example
/// ```
/// use keyshare_crypto::algorithm::{provider_for, AlgorithmDescriptor, AlgorithmId};
///
/// let provider = provider_for(AlgorithmDescriptor {
///     id: AlgorithmId::RsaOaepSha256,
///     key_size: 2048,
/// })
/// .unwrap();
/// assert_eq!(provider.descriptor().key_size, 2048);
/// ```
pub fn provider_for(descriptor: AlgorithmDescriptor) -> Result<Arc<dyn AsymmetricProvider>> {
    if descriptor.key_size < MIN_RSA_BITS {
        return Err(Error::Generation(format!(
            "RSA key size {} is below the {} bit minimum",
            descriptor.key_size, MIN_RSA_BITS
        )));
    }

    let padding = match descriptor.id {
        AlgorithmId::RsaOaepSha256 => RsaPadding::OaepSha256,
        AlgorithmId::RsaPkcs1v15 => RsaPadding::Pkcs1v15,
    };
    Ok(Arc::new(RsaProvider::new(padding, descriptor.key_size)))
}
