//! Role secret distribution
//!
//! Each role has one random symmetric secret. It is never stored in the clear:
//! the registry only holds one copy per authorized account, wrapped under that
//! account's public key. Authorized means member of the role or holder of the
//! override permission. Every membership change rebuilds the full share set,
//! so removing an account from a role deletes its share.

use std::{collections::BTreeSet, sync::Arc};

use keyshare_crypto::AsymmetricProvider;
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    config::DistributionCfg,
    error::{Error, Result},
    lifecycle::KeyLifecycle,
    locks::LockTable,
    oracle::MembershipOracle,
    session::CarryChannel,
    store::ShareRegistry,
    types::{AccountId, RoleId, RoleSecret, RoleShares, SessionId},
};

/// Account acting on behalf of a recomputation
///
/// Rebuilding the share set of an existing role needs the current secret,
/// which can only be opened through an existing share and a live session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub account: AccountId,
    pub session: SessionId,
}

impl Operator {
    pub fn new(account: impl Into<AccountId>, session: impl Into<SessionId>) -> Self {
        Self {
            account: account.into(),
            session: session.into(),
        }
    }
}

pub struct RoleSecretDistributor {
    provider: Arc<dyn AsymmetricProvider>,
    lifecycle: Arc<KeyLifecycle>,
    carry: Arc<CarryChannel>,
    registry: Arc<dyn ShareRegistry>,
    oracle: Arc<dyn MembershipOracle>,
    settings: DistributionCfg,
    locks: LockTable<RoleId>,
}

impl RoleSecretDistributor {
    pub fn new(
        provider: Arc<dyn AsymmetricProvider>,
        lifecycle: Arc<KeyLifecycle>,
        carry: Arc<CarryChannel>,
        registry: Arc<dyn ShareRegistry>,
        oracle: Arc<dyn MembershipOracle>,
        settings: DistributionCfg,
    ) -> Self {
        Self {
            provider,
            lifecycle,
            carry,
            registry,
            oracle,
            settings,
            locks: LockTable::default(),
        }
    }

    fn ensure_enabled(&self, role: &RoleId) -> Result<()> {
        if self.settings.is_disabled(role) {
            return Err(Error::RoleDisabled(role.clone()));
        }
        Ok(())
    }

    /// Create a fresh secret for `role` and share it with every authorized account
    ///
    /// An existing secret is replaced, so previously issued shares become useless.
    pub fn generate_role_secret(&self, role: &RoleId) -> Result<RoleSecret> {
        self.ensure_enabled(role)?;
        self.locks.with(role, || self.generate_locked(role))
    }

    /// Rebuild the share set of `role` from current membership
    pub fn recompute_shares(&self, role: &RoleId, operator: &Operator) -> Result<()> {
        self.ensure_enabled(role)?;
        self.locks.with(role, || self.recompute_locked(role, operator))
    }

    /// Read the role secret through the share of `account`
    pub fn get_share(
        &self,
        role: &RoleId,
        account: &AccountId,
        session: &SessionId,
    ) -> Result<RoleSecret> {
        self.locks.with(role, || {
            let shares = self
                .registry
                .get_shares(role)?
                .ok_or_else(|| Error::RoleNotFound(role.clone()))?;
            self.open_share(&shares, account, session)
        })
    }

    /// Membership of `role` changed
    ///
    /// A role without a secret gets a fresh one; disabled roles are ignored.
    pub fn on_membership_changed(&self, role: &RoleId, operator: &Operator) -> Result<()> {
        if self.settings.is_disabled(role) {
            debug!("Membership change ignored for disabled role {}", role);
            return Ok(());
        }

        self.locks.with(role, || {
            if self.registry.get_shares(role)?.is_none() {
                self.generate_locked(role)?;
                return Ok(());
            }
            self.recompute_locked(role, operator)
        })
    }

    /// The override permission of `account` was granted or revoked
    ///
    /// Override holders have a share in every role, so all roles are rebuilt.
    pub fn on_override_permission_changed(
        &self,
        account: &AccountId,
        operator: &Operator,
    ) -> Result<()> {
        info!("Override permission changed for {}, rebuilding all roles", account);
        for role in self.registry.roles()? {
            if self.settings.is_disabled(&role) {
                continue;
            }
            match self.recompute_shares(&role, operator) {
                // Deleted since the listing
                Err(Error::RoleNotFound(_)) => continue,
                other => other?,
            }
        }
        Ok(())
    }

    /// Discard the secret and every share of a deleted role
    pub fn on_role_deleted(&self, role: &RoleId) -> Result<bool> {
        let removed = self.locks.with(role, || self.registry.remove_role(role))?;
        if removed {
            info!("Role secret of deleted role {} discarded", role);
        }
        Ok(removed)
    }

    /// Generate secrets for every listed role that has none yet
    ///
    /// Disabled roles are skipped. Returns the number of secrets generated.
    pub fn initialize_role_secrets<'a>(
        &self,
        roles: impl IntoIterator<Item = &'a RoleId>,
    ) -> Result<usize> {
        let mut generated = 0;
        for role in roles {
            if self.settings.is_disabled(role) {
                debug!("Skipping disabled role {}", role);
                continue;
            }
            let created = self.locks.with(role, || {
                if self.registry.get_shares(role)?.is_some() {
                    return Ok(false);
                }
                self.generate_locked(role)?;
                Ok(true)
            })?;
            if created {
                generated += 1;
            }
        }
        Ok(generated)
    }

    /// Bring every registered role in line with the current settings
    ///
    /// Roles that became disabled lose their secret; the rest are recomputed.
    /// Returns the number of roles recomputed.
    pub fn refresh_all(&self, operator: &Operator) -> Result<usize> {
        let mut refreshed = 0;
        for role in self.registry.roles()? {
            if self.settings.is_disabled(&role) {
                self.on_role_deleted(&role)?;
                continue;
            }
            match self.recompute_shares(&role, operator) {
                Err(Error::RoleNotFound(_)) => continue,
                other => other?,
            }
            refreshed += 1;
        }
        Ok(refreshed)
    }

    /// Roles that currently have a secret
    pub fn roles(&self) -> Result<Vec<RoleId>> {
        self.registry.roles()
    }

    /// Accounts holding a share of `role`
    pub fn shares(&self, role: &RoleId) -> Result<Vec<AccountId>> {
        let shares = self
            .registry
            .get_shares(role)?
            .ok_or_else(|| Error::RoleNotFound(role.clone()))?;
        Ok(shares.accounts().cloned().collect())
    }

    /// Caller holds the section for `role`
    fn generate_locked(&self, role: &RoleId) -> Result<RoleSecret> {
        let mut bytes = Zeroizing::new(vec![0u8; self.settings.secret_len]);
        OsRng.fill_bytes(&mut bytes);
        let secret = RoleSecret::new(bytes);

        let shares = self.distribute(role, &secret)?;
        info!("Role secret generated for role {} ({} shares)", role, shares);
        Ok(secret)
    }

    /// Caller holds the section for `role`
    fn recompute_locked(&self, role: &RoleId, operator: &Operator) -> Result<()> {
        let current = self
            .registry
            .get_shares(role)?
            .ok_or_else(|| Error::RoleNotFound(role.clone()))?;
        let secret = self.open_share(&current, &operator.account, &operator.session)?;
        let shares = self.distribute(role, &secret)?;
        info!(
            "Shares recomputed for role {} by {} ({} shares)",
            role, operator.account, shares
        );
        Ok(())
    }

    fn authorized_accounts(&self, role: &RoleId) -> Result<BTreeSet<AccountId>> {
        let mut accounts = self.oracle.members_of(role)?;
        accounts.extend(self.oracle.override_holders()?);
        Ok(accounts)
    }

    /// Wrap `secret` for every authorized account and swap in the new set
    ///
    /// Nothing is written unless every share could be built.
    fn distribute(&self, role: &RoleId, secret: &RoleSecret) -> Result<usize> {
        let mut shares = RoleShares::new(role.clone(), self.provider.descriptor());

        for account in self.authorized_accounts(role)? {
            let public_key = self.lifecycle.public_key(&account).map_err(|e| {
                warn!("Cannot share role {} with {}: {}", role, account, e);
                Error::distribution(role, format!("no public key for {}: {}", account, e))
            })?;
            let wrapped = self
                .provider
                .encrypt_with_public(secret.as_bytes(), &public_key)
                .map_err(|e| {
                    warn!("Cannot share role {} with {}: {}", role, account, e);
                    Error::distribution(role, format!("wrapping for {} failed: {}", account, e))
                })?;
            shares.shares.insert(account, wrapped);
        }

        let count = shares.len();
        self.registry.replace_shares(shares)?;
        Ok(count)
    }

    fn open_share(
        &self,
        shares: &RoleShares,
        account: &AccountId,
        session: &SessionId,
    ) -> Result<RoleSecret> {
        let Some(wrapped) = shares.get(account) else {
            debug!("Account {} has no share of role {}", account, shares.role_id);
            return Err(Error::NotAuthorized {
                role: shares.role_id.clone(),
                account: account.clone(),
            });
        };

        let private_key = self.carry.take_for(session, account)?.ok_or_else(|| {
            Error::KeyUnavailable {
                account: account.clone(),
                session: session.clone(),
            }
        })?;

        let secret = self.provider.decrypt_with_private(wrapped, &private_key)?;
        Ok(RoleSecret::new(secret))
    }
}

#[cfg(test)]
mod tests {
    use keyshare_crypto::{provider_for, AlgorithmDescriptor, AlgorithmId, CredentialKdf, WrapMode};

    use super::*;
    use crate::{
        oracle::MemoryMembership,
        store::{MemoryAccountStore, MemorySessionStore, MemoryShareRegistry},
        types::Credential,
    };

    struct Fixture {
        lifecycle: Arc<KeyLifecycle>,
        oracle: Arc<MemoryMembership>,
        distributor: RoleSecretDistributor,
    }

    fn fixture() -> Fixture {
        let provider = provider_for(AlgorithmDescriptor {
            id: AlgorithmId::RsaPkcs1v15,
            key_size: 2048,
        })
        .unwrap();
        let carry = Arc::new(CarryChannel::new(Arc::new(MemorySessionStore::default())));
        let lifecycle = Arc::new(KeyLifecycle::new(
            provider.clone(),
            Arc::new(MemoryAccountStore::new()),
            carry.clone(),
            CredentialKdf {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
            WrapMode::FixedNonce,
        ));
        let oracle = Arc::new(MemoryMembership::new());
        let distributor = RoleSecretDistributor::new(
            provider,
            lifecycle.clone(),
            carry,
            Arc::new(MemoryShareRegistry::new()),
            oracle.clone(),
            DistributionCfg::default(),
        );
        Fixture {
            lifecycle,
            oracle,
            distributor,
        }
    }

    fn login(fx: &Fixture, account: &str) -> Operator {
        let account = AccountId::from(account);
        let session = SessionId::from(format!("{}-session", account));
        fx.lifecycle.initialize(&account).unwrap();
        fx.lifecycle
            .on_login(&account, &Credential::from("pw"), &session)
            .unwrap();
        Operator::new(account, session)
    }

    #[test]
    fn test_members_read_same_secret() {
        let fx = fixture();
        let role = RoleId::from("editors");
        let alice = login(&fx, "alice");
        let bob = login(&fx, "bob");
        fx.oracle.add_member(&role, &alice.account).unwrap();
        fx.oracle.add_member(&role, &bob.account).unwrap();

        let secret = fx.distributor.generate_role_secret(&role).unwrap();

        let a = fx.distributor.get_share(&role, &alice.account, &alice.session).unwrap();
        let b = fx.distributor.get_share(&role, &bob.account, &bob.session).unwrap();
        assert_eq!(a, secret);
        assert_eq!(b, secret);
        assert_eq!(secret.len(), 16);
    }

    #[test]
    fn test_non_member_not_authorized() {
        let fx = fixture();
        let role = RoleId::from("editors");
        let alice = login(&fx, "alice");
        let carol = login(&fx, "carol");
        fx.oracle.add_member(&role, &alice.account).unwrap();
        fx.distributor.generate_role_secret(&role).unwrap();

        assert!(matches!(
            fx.distributor.get_share(&role, &carol.account, &carol.session),
            Err(Error::NotAuthorized { .. })
        ));
        assert!(matches!(
            fx.distributor.get_share(&RoleId::from("ghosts"), &alice.account, &alice.session),
            Err(Error::RoleNotFound(_))
        ));
    }

    #[test]
    fn test_share_without_session_key() {
        let fx = fixture();
        let role = RoleId::from("editors");
        let alice = login(&fx, "alice");
        fx.oracle.add_member(&role, &alice.account).unwrap();
        fx.distributor.generate_role_secret(&role).unwrap();

        assert!(matches!(
            fx.distributor
                .get_share(&role, &alice.account, &SessionId::from("elsewhere")),
            Err(Error::KeyUnavailable { .. })
        ));
    }

    #[test]
    fn test_recompute_preserves_secret_and_revokes() {
        let fx = fixture();
        let role = RoleId::from("editors");
        let alice = login(&fx, "alice");
        let bob = login(&fx, "bob");
        fx.oracle.add_member(&role, &alice.account).unwrap();
        fx.oracle.add_member(&role, &bob.account).unwrap();
        fx.distributor.generate_role_secret(&role).unwrap();
        let before = fx.distributor.get_share(&role, &bob.account, &bob.session).unwrap();

        fx.oracle.remove_member(&role, &bob.account).unwrap();
        fx.distributor.on_membership_changed(&role, &alice).unwrap();

        assert_eq!(fx.distributor.shares(&role).unwrap(), vec![alice.account.clone()]);
        assert!(matches!(
            fx.distributor.get_share(&role, &bob.account, &bob.session),
            Err(Error::NotAuthorized { .. })
        ));
        let after = fx.distributor.get_share(&role, &alice.account, &alice.session).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_distribution_fails_without_public_key() {
        let fx = fixture();
        let role = RoleId::from("editors");
        fx.oracle.add_member(&role, &AccountId::from("ghost")).unwrap();

        let err = fx.distributor.generate_role_secret(&role).unwrap_err();
        assert!(err.is_retryable());
        assert!(fx.distributor.roles().unwrap().is_empty());
    }

    #[test]
    fn test_disabled_roles() {
        let fx = fixture();
        let anonymous = RoleId::from("anonymous");
        let alice = login(&fx, "alice");

        assert!(matches!(
            fx.distributor.generate_role_secret(&anonymous),
            Err(Error::RoleDisabled(_))
        ));
        fx.distributor.on_membership_changed(&anonymous, &alice).unwrap();
        assert_eq!(
            fx.distributor
                .initialize_role_secrets(&[anonymous.clone(), RoleId::from("editors")])
                .unwrap(),
            1
        );
        assert_eq!(fx.distributor.roles().unwrap(), vec![RoleId::from("editors")]);
    }

    #[test]
    fn test_role_deleted() {
        let fx = fixture();
        let role = RoleId::from("editors");
        let alice = login(&fx, "alice");
        fx.oracle.add_member(&role, &alice.account).unwrap();
        fx.distributor.generate_role_secret(&role).unwrap();

        assert!(fx.distributor.on_role_deleted(&role).unwrap());
        assert!(!fx.distributor.on_role_deleted(&role).unwrap());
        assert!(matches!(
            fx.distributor.get_share(&role, &alice.account, &alice.session),
            Err(Error::RoleNotFound(_))
        ));
    }
}
