//! Credential-wrapped key lifecycle
//!
//! Every account owns one key pair. The private key is stored in the clear
//! only until the first login; from then on it is wrapped under a key derived
//! from the login credential:
//!
//! ```text
//! Unprotected --protect / on_login--> Protected --rotate_credential--> Protected
//! ```
//!
//! Operations on one account are serialized; different accounts never wait
//! on each other.

use std::sync::Arc;

use keyshare_crypto::{symmetric, AsymmetricProvider, CredentialKdf, WrapMode};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    error::{Error, Result},
    locks::LockTable,
    session::CarryChannel,
    store::{attr, AccountStore},
    types::{AccountId, Credential, KeyPair, ProtectionState, SessionId},
};

const FLAG_PROTECTED: &[u8] = b"1";
const FLAG_UNPROTECTED: &[u8] = b"0";

pub struct KeyLifecycle {
    provider: Arc<dyn AsymmetricProvider>,
    accounts: Arc<dyn AccountStore>,
    carry: Arc<CarryChannel>,
    kdf: CredentialKdf,
    wrap_mode: WrapMode,
    locks: LockTable<AccountId>,
}

impl KeyLifecycle {
    pub fn new(
        provider: Arc<dyn AsymmetricProvider>,
        accounts: Arc<dyn AccountStore>,
        carry: Arc<CarryChannel>,
        kdf: CredentialKdf,
        wrap_mode: WrapMode,
    ) -> Self {
        Self {
            provider,
            accounts,
            carry,
            kdf,
            wrap_mode,
            locks: LockTable::default(),
        }
    }

    /// Generate and store a key pair for a new account
    pub fn initialize(&self, account: &AccountId) -> Result<KeyPair> {
        self.locks.with(account, || {
            if self.accounts.get_attribute(account, attr::PUBLIC_KEY)?.is_some() {
                return Err(Error::KeyPairExists(account.clone()));
            }

            let generated = self.provider.generate_keypair()?;
            let pair = KeyPair {
                public_key: generated.public_key,
                private_key: generated.private_key,
                protected: false,
            };

            self.accounts.set_attributes(
                account,
                vec![
                    (attr::PUBLIC_KEY, pair.public_key.clone()),
                    (attr::PRIVATE_KEY, pair.private_key.to_vec()),
                    (attr::PRIVATE_KEY_PROTECTED, FLAG_UNPROTECTED.to_vec()),
                ],
            )?;

            info!("Key pair generated for account {} ({})", account, generated.algorithm);
            Ok(pair)
        })
    }

    /// Give every listed account a key pair, skipping those that already have one
    ///
    /// Returns the number of pairs generated.
    pub fn initialize_all<'a>(
        &self,
        accounts: impl IntoIterator<Item = &'a AccountId>,
    ) -> Result<usize> {
        let mut generated = 0;
        for account in accounts {
            match self.initialize(account) {
                Ok(_) => generated += 1,
                Err(Error::KeyPairExists(_)) => {
                    debug!("Account {} already has a key pair", account);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(generated)
    }

    /// Stored key pair of `account`
    pub fn key_pair(&self, account: &AccountId) -> Result<KeyPair> {
        let public_key = self
            .accounts
            .get_attribute(account, attr::PUBLIC_KEY)?
            .ok_or_else(|| Error::KeyPairMissing(account.clone()))?;
        let private_key = self
            .accounts
            .get_attribute(account, attr::PRIVATE_KEY)?
            .ok_or_else(|| Error::incomplete_key_pair(account, attr::PRIVATE_KEY))?;
        let flag = self
            .accounts
            .get_attribute(account, attr::PRIVATE_KEY_PROTECTED)?
            .ok_or_else(|| Error::incomplete_key_pair(account, attr::PRIVATE_KEY_PROTECTED))?;

        let protected = match flag.as_slice() {
            FLAG_PROTECTED => true,
            FLAG_UNPROTECTED => false,
            _ => return Err(Error::invalid_attribute(account, attr::PRIVATE_KEY_PROTECTED)),
        };

        Ok(KeyPair {
            public_key,
            private_key: Zeroizing::new(private_key),
            protected,
        })
    }

    pub fn public_key(&self, account: &AccountId) -> Result<Vec<u8>> {
        self.accounts
            .get_attribute(account, attr::PUBLIC_KEY)?
            .ok_or_else(|| Error::KeyPairMissing(account.clone()))
    }

    pub fn state(&self, account: &AccountId) -> Result<ProtectionState> {
        Ok(self.key_pair(account)?.state())
    }

    /// Wrap the plaintext private key under `credential`
    ///
    /// Does nothing when the key is already protected.
    pub fn protect(&self, account: &AccountId, credential: &Credential) -> Result<()> {
        self.locks.with(account, || {
            let pair = self.key_pair(account)?;
            if pair.protected {
                debug!("Private key of account {} is already protected", account);
                return Ok(());
            }
            self.store_wrapped(account, &pair.private_key, credential)?;
            info!("Private key of account {} protected", account);
            Ok(())
        })
    }

    /// Recover the plaintext private key
    pub fn unwrap(
        &self,
        account: &AccountId,
        credential: &Credential,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.locks.with(account, || {
            let pair = self.key_pair(account)?;
            self.open(account, &pair, credential)
        })
    }

    /// Re-wrap the private key under a new credential
    ///
    /// The stored key is only replaced after `old` has been verified, and the
    /// new wrapped value and its flags are written in one update.
    pub fn rotate_credential(
        &self,
        account: &AccountId,
        old: &Credential,
        new: &Credential,
    ) -> Result<()> {
        self.locks.with(account, || {
            let pair = self.key_pair(account)?;
            let plaintext = self.open(account, &pair, old).map_err(|e| {
                warn!("Credential rotation rejected for account {}", account);
                e
            })?;
            self.store_wrapped(account, &plaintext, new)?;
            info!("Credential rotated for account {}", account);
            Ok(())
        })
    }

    /// Login hook: protect on first login, unwrap, and stage the key for `session`
    pub fn on_login(
        &self,
        account: &AccountId,
        credential: &Credential,
        session: &SessionId,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let plaintext = self.locks.with(account, || {
            let mut pair = self.key_pair(account)?;
            if !pair.protected {
                let wrapped = self.store_wrapped(account, &pair.private_key, credential)?;
                pair.private_key = Zeroizing::new(wrapped);
                pair.protected = true;
                info!("Private key of account {} protected at first login", account);
            }
            self.open(account, &pair, credential)
        })?;

        self.carry.put(session, account, plaintext.clone())?;
        Ok(plaintext)
    }

    fn wrap_mode_of(&self, account: &AccountId) -> Result<WrapMode> {
        let raw = self
            .accounts
            .get_attribute(account, attr::PRIVATE_KEY_WRAP)?
            .ok_or_else(|| Error::incomplete_key_pair(account, attr::PRIVATE_KEY_WRAP))?;
        std::str::from_utf8(&raw)
            .ok()
            .and_then(WrapMode::parse)
            .ok_or_else(|| Error::invalid_attribute(account, attr::PRIVATE_KEY_WRAP))
    }

    fn open(
        &self,
        account: &AccountId,
        pair: &KeyPair,
        credential: &Credential,
    ) -> Result<Zeroizing<Vec<u8>>> {
        if !pair.protected {
            return Ok(pair.private_key.clone());
        }

        let mode = self.wrap_mode_of(account)?;
        let context = account.as_str().as_bytes();
        let key = self.kdf.derive(credential.as_bytes(), context)?;
        let plaintext = symmetric::unwrap(&key, &pair.private_key, context, mode)
            .map_err(|_| Error::CredentialMismatch(account.clone()))?;

        self.provider
            .check_private_key(&plaintext)
            .map_err(|_| Error::CredentialMismatch(account.clone()))?;
        Ok(plaintext)
    }

    /// Persist `plaintext` wrapped under `credential`; returns the wrapped bytes
    fn store_wrapped(
        &self,
        account: &AccountId,
        plaintext: &[u8],
        credential: &Credential,
    ) -> Result<Vec<u8>> {
        let context = account.as_str().as_bytes();
        let key = self.kdf.derive(credential.as_bytes(), context)?;
        let wrapped = symmetric::wrap(&key, plaintext, context, self.wrap_mode)?;

        self.accounts.set_attributes(
            account,
            vec![
                (attr::PRIVATE_KEY, wrapped.clone()),
                (attr::PRIVATE_KEY_PROTECTED, FLAG_PROTECTED.to_vec()),
                (attr::PRIVATE_KEY_WRAP, self.wrap_mode.as_str().as_bytes().to_vec()),
            ],
        )?;
        Ok(wrapped)
    }
}
