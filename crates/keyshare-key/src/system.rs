//! System wiring
//!
//! [`Keyshare`] builds the lifecycle, carry channel and distributor around one
//! provider and exposes the hooks the hosting application calls. The
//! algorithm descriptor is fixed once the first role secret exists.

use std::{sync::Arc, time::Duration};

use keyshare_crypto::{provider_for, AlgorithmDescriptor, AsymmetricProvider};
use tracing::info;
use zeroize::Zeroizing;

use crate::{
    config::Settings,
    distributor::{Operator, RoleSecretDistributor},
    error::{Error, Result},
    lifecycle::KeyLifecycle,
    oracle::MembershipOracle,
    session::CarryChannel,
    store::{
        AccountStore, MemoryAccountStore, MemorySessionStore, MemoryShareRegistry,
        SessionKeySlot, SessionStore, ShareRegistry,
    },
    types::{AccountId, Credential, KeyPair, RoleId, RoleSecret, SessionId},
};

/// External capabilities supplied by the hosting application
#[derive(Clone)]
pub struct Collaborators {
    pub accounts: Arc<dyn AccountStore>,
    pub registry: Arc<dyn ShareRegistry>,
    pub oracle: Arc<dyn MembershipOracle>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Collaborators {
    /// In-memory stores around the given membership oracle
    ///
    /// `slot_ttl` bounds how long a staged session key stays readable.
    pub fn in_memory(oracle: Arc<dyn MembershipOracle>, slot_ttl: Option<Duration>) -> Self {
        Self {
            accounts: Arc::new(MemoryAccountStore::new()),
            registry: Arc::new(MemoryShareRegistry::new()),
            oracle,
            sessions: Arc::new(MemorySessionStore::new(slot_ttl)),
        }
    }
}

/// Outcome of [`Keyshare::initialize_system`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitReport {
    pub accounts_initialized: usize,
    pub roles_initialized: usize,
}

pub struct Keyshare {
    settings: Settings,
    provider: Arc<dyn AsymmetricProvider>,
    registry: Arc<dyn ShareRegistry>,
    lifecycle: Arc<KeyLifecycle>,
    carry: Arc<CarryChannel>,
    distributor: RoleSecretDistributor,
}

impl Keyshare {
    /// Build the system from settings
    ///
    /// Fails with [`Error::AlreadyInitialized`] when the registry already holds
    /// shares made with a different algorithm.
    pub fn new(settings: Settings, collaborators: Collaborators) -> Result<Self> {
        settings.validate()?;
        check_algorithm(collaborators.registry.as_ref(), settings.algorithm)?;

        let provider = provider_for(settings.algorithm)?;
        let carry = Arc::new(CarryChannel::new(collaborators.sessions));
        let lifecycle = Arc::new(KeyLifecycle::new(
            provider.clone(),
            collaborators.accounts,
            carry.clone(),
            settings.credential.kdf,
            settings.credential.wrap_mode,
        ));
        let distributor = RoleSecretDistributor::new(
            provider.clone(),
            lifecycle.clone(),
            carry.clone(),
            collaborators.registry.clone(),
            collaborators.oracle,
            settings.distribution.clone(),
        );

        Ok(Self {
            settings,
            provider,
            registry: collaborators.registry,
            lifecycle,
            carry,
            distributor,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn algorithm(&self) -> AlgorithmDescriptor {
        self.provider.descriptor()
    }

    /// Whether a role secret exists, which pins the algorithm
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(!self.registry.roles()?.is_empty())
    }

    pub fn lifecycle(&self) -> &KeyLifecycle {
        &self.lifecycle
    }

    pub fn carry(&self) -> &CarryChannel {
        &self.carry
    }

    pub fn distributor(&self) -> &RoleSecretDistributor {
        &self.distributor
    }

    /// Install path: self-test the provider, then create keys and role secrets
    pub fn initialize_system(
        &self,
        accounts: &[AccountId],
        roles: &[RoleId],
    ) -> Result<InitReport> {
        info!("Validating asymmetric provider {}", self.algorithm());
        self.provider.validate()?;

        let report = InitReport {
            accounts_initialized: self.lifecycle.initialize_all(accounts)?,
            roles_initialized: self.distributor.initialize_role_secrets(roles)?,
        };
        info!(
            "Keyshare initialized: {} key pairs, {} role secrets",
            report.accounts_initialized, report.roles_initialized
        );
        Ok(report)
    }

    pub fn initialize(&self, account: &AccountId) -> Result<KeyPair> {
        self.lifecycle.initialize(account)
    }

    pub fn initialize_all_accounts(&self, accounts: &[AccountId]) -> Result<usize> {
        self.lifecycle.initialize_all(accounts)
    }

    pub fn on_login(
        &self,
        account: &AccountId,
        credential: &Credential,
        session: &SessionId,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.lifecycle.on_login(account, credential, session)
    }

    pub fn rotate_credential(
        &self,
        account: &AccountId,
        old: &Credential,
        new: &Credential,
    ) -> Result<()> {
        self.lifecycle.rotate_credential(account, old, new)
    }

    /// Consume the staged key for the transport layer
    pub fn hand_off(&self, session: &SessionId) -> Result<Option<SessionKeySlot>> {
        self.carry.hand_off(session)
    }

    pub fn end_session(&self, session: &SessionId) -> Result<bool> {
        self.carry.end_session(session)
    }

    pub fn logout(&self, session: &SessionId) -> Result<()> {
        self.end_session(session).map(|_| ())
    }

    pub fn purge_expired_sessions(&self) -> Result<()> {
        self.carry.purge_expired()
    }

    pub fn generate_role_secret(&self, role: &RoleId) -> Result<RoleSecret> {
        self.distributor.generate_role_secret(role)
    }

    pub fn initialize_role_secrets(&self, roles: &[RoleId]) -> Result<usize> {
        self.distributor.initialize_role_secrets(roles)
    }

    pub fn on_membership_changed(&self, role: &RoleId, operator: &Operator) -> Result<()> {
        self.distributor.on_membership_changed(role, operator)
    }

    pub fn on_override_permission_changed(
        &self,
        account: &AccountId,
        operator: &Operator,
    ) -> Result<()> {
        self.distributor.on_override_permission_changed(account, operator)
    }

    pub fn on_role_deleted(&self, role: &RoleId) -> Result<bool> {
        self.distributor.on_role_deleted(role)
    }

    pub fn refresh_all_roles(&self, operator: &Operator) -> Result<usize> {
        self.distributor.refresh_all(operator)
    }

    pub fn get_share(
        &self,
        role: &RoleId,
        account: &AccountId,
        session: &SessionId,
    ) -> Result<RoleSecret> {
        self.distributor.get_share(role, account, session)
    }
}

fn check_algorithm(registry: &dyn ShareRegistry, requested: AlgorithmDescriptor) -> Result<()> {
    for role in registry.roles()? {
        let Some(shares) = registry.get_shares(&role)? else {
            continue;
        };
        if shares.algorithm != requested {
            return Err(Error::AlreadyInitialized {
                active: shares.algorithm.to_string(),
                requested: requested.to_string(),
            });
        }
    }
    Ok(())
}
