use std::collections::BTreeMap;

use keyshare_crypto::AlgorithmDescriptor;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Account identifier as issued by the hosting application
    AccountId
);
id_type!(
    /// Role identifier
    RoleId
);
id_type!(
    /// Authenticated session identifier
    SessionId
);

/// Protection state of an account's private key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtectionState {
    /// Private key stored in the clear, before the first login
    Unprotected,
    /// Private key wrapped under the login credential
    Protected,
}

/// An account's key pair as persisted in the account store
///
/// `private_key` holds PKCS#8 DER while `protected` is false and the wrapped
/// ciphertext afterwards. Either form is zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub public_key: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
    pub protected: bool,
}

impl KeyPair {
    pub fn state(&self) -> ProtectionState {
        if self.protected {
            ProtectionState::Protected
        } else {
            ProtectionState::Unprotected
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(&self.public_key))
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}

/// Login credential, held only for the duration of a call
#[derive(Clone)]
pub struct Credential(Zeroizing<Vec<u8>>);

impl Credential {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Plaintext value of a role secret
#[derive(Clone, PartialEq, Eq)]
pub struct RoleSecret(Zeroizing<Vec<u8>>);

impl RoleSecret {
    pub fn new(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for RoleSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RoleSecret(<{} bytes>)", self.0.len())
    }
}

/// One member's wrapped copy of a role secret
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberShare {
    pub account_id: AccountId,
    pub wrapped_secret: Vec<u8>,
}

/// Complete share set of a role
///
/// `algorithm` records the scheme the shares were wrapped with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleShares {
    pub role_id: RoleId,
    pub algorithm: AlgorithmDescriptor,
    pub shares: BTreeMap<AccountId, Vec<u8>>,
}

impl RoleShares {
    pub fn new(role_id: RoleId, algorithm: AlgorithmDescriptor) -> Self {
        Self {
            role_id,
            algorithm,
            shares: BTreeMap::new(),
        }
    }

    pub fn get(&self, account: &AccountId) -> Option<&[u8]> {
        self.shares.get(account).map(Vec::as_slice)
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.shares.contains_key(account)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.shares.keys()
    }

    pub fn member_shares(&self) -> Vec<MemberShare> {
        self.shares
            .iter()
            .map(|(account_id, wrapped_secret)| MemberShare {
                account_id: account_id.clone(),
                wrapped_secret: wrapped_secret.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::from("hunter2");
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("hunter2"));
        assert_eq!(credential.as_bytes(), b"hunter2");
    }

    #[test]
    fn test_role_secret_debug_is_redacted() {
        let secret = RoleSecret::new(Zeroizing::new(vec![0xAB; 16]));
        assert_eq!(format!("{:?}", secret), "RoleSecret(<16 bytes>)");
    }

    #[test]
    fn test_key_pair_state() {
        let mut pair = KeyPair {
            public_key: vec![1, 2],
            private_key: Zeroizing::new(vec![3, 4]),
            protected: false,
        };
        assert_eq!(pair.state(), ProtectionState::Unprotected);
        pair.protected = true;
        assert_eq!(pair.state(), ProtectionState::Protected);
        assert!(!format!("{:?}", pair).contains("private_key"));
    }

    #[test]
    fn test_role_shares_views() {
        let mut shares = RoleShares::new("editors".into(), AlgorithmDescriptor::default());
        shares.shares.insert("alice".into(), vec![1]);
        shares.shares.insert("bob".into(), vec![2]);

        assert!(shares.contains(&"alice".into()));
        assert_eq!(shares.get(&"bob".into()), Some(&[2u8][..]));
        assert_eq!(shares.member_shares().len(), 2);
        assert_eq!(
            shares.accounts().map(AccountId::as_str).collect::<Vec<_>>(),
            vec!["alice", "bob"]
        );
    }
}
