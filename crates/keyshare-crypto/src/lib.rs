//! Keyshare Cryptography Library
//!
//! Cryptographic primitives for the keyshare project: pluggable asymmetric
//! providers for per-account key pairs, credential-derived key wrapping and the
//! algorithm descriptor that pins a deployment to one scheme.

pub mod error;

pub mod algorithm;
pub mod asymmetric;
pub mod kdf;
pub mod symmetric;

pub use algorithm::{provider_for, AlgorithmDescriptor, AlgorithmId, GeneratedKeyPair};
pub use asymmetric::{AsymmetricProvider, RsaPadding, RsaProvider};
pub use error::{Error, Result};
pub use kdf::CredentialKdf;
pub use symmetric::WrapMode;
