use std::{path::Path, time::Duration};

use keyshare_crypto::{AlgorithmDescriptor, CredentialKdf, WrapMode};
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    types::RoleId,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub algorithm: AlgorithmDescriptor,
    pub credential: CredentialCfg,
    pub distribution: DistributionCfg,
    pub session: SessionCfg,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialCfg {
    pub wrap_mode: WrapMode,
    /// Argon2id cost parameters
    #[serde(flatten)]
    pub kdf: CredentialKdf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DistributionCfg {
    /// Role secret length in bytes
    pub secret_len: usize,
    /// Roles that never receive a role secret
    pub disabled_roles: Vec<RoleId>,
}

impl Default for DistributionCfg {
    fn default() -> Self {
        Self {
            secret_len: 16,
            disabled_roles: vec![RoleId::from("anonymous"), RoleId::from("authenticated")],
        }
    }
}

impl DistributionCfg {
    pub fn is_disabled(&self, role: &RoleId) -> bool {
        self.disabled_roles.contains(role)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
    /// Lifetime of a session key slot; `None` keeps it until logout
    pub slot_ttl_secs: Option<u64>,
}

impl SessionCfg {
    pub fn slot_ttl(&self) -> Option<Duration> {
        self.slot_ttl_secs.map(Duration::from_secs)
    }
}

impl Settings {
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(config_path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.credential.kdf.validate()?;

        let secret_len = self.distribution.secret_len;
        if !(16..=64).contains(&secret_len) {
            return Err(Error::invalid_configuration(format!(
                "distribution.secret_len must be between 16 and 64 bytes, got {}",
                secret_len
            )));
        }
        if self.session.slot_ttl_secs == Some(0) {
            return Err(Error::invalid_configuration(
                "session.slot_ttl_secs must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use keyshare_crypto::AlgorithmId;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.algorithm, AlgorithmDescriptor::default());
        assert_eq!(settings.credential.wrap_mode, WrapMode::FixedNonce);
        assert_eq!(settings.distribution.secret_len, 16);
        assert!(settings.distribution.is_disabled(&RoleId::from("anonymous")));
        assert!(settings.session.slot_ttl().is_none());
        settings.validate().unwrap();
    }

    #[test]
    fn test_bundled_config_parses() {
        let settings = Settings::from_toml_str(include_str!("../config/default.toml")).unwrap();
        assert_eq!(settings.algorithm.id, AlgorithmId::RsaOaepSha256);
        assert_eq!(settings.algorithm.key_size, 4096);
        assert_eq!(settings.credential.kdf.iterations, 2);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[algorithm]
id = "rsa-pkcs1v15"
key_size = 2048

[credential]
wrap_mode = "random-nonce"
memory_kib = 64
iterations = 1

[session]
slot_ttl_secs = 30
"#
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.algorithm.id, AlgorithmId::RsaPkcs1v15);
        assert_eq!(settings.credential.wrap_mode, WrapMode::RandomNonce);
        assert_eq!(settings.credential.kdf.memory_kib, 64);
        assert_eq!(settings.credential.kdf.parallelism, CredentialKdf::default().parallelism);
        assert_eq!(settings.session.slot_ttl(), Some(Duration::from_secs(30)));
        assert_eq!(settings.distribution.secret_len, 16);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Settings::from_toml_str("[distribution]\nsecret_len = 4").is_err());
        assert!(Settings::from_toml_str("[session]\nslot_ttl_secs = 0").is_err());
        assert!(Settings::from_toml_str("[algorithm]\nid = \"dsa\"\nkey_size = 2048").is_err());
        assert!(Settings::load("/nonexistent/keyshare.toml").is_err());
    }
}
