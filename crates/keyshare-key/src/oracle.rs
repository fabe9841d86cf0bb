//! Role membership and override permission lookups

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::RwLock,
};

use crate::{
    error::{Error, Result},
    types::{AccountId, RoleId},
};

/// Answers who belongs to a role and who holds the override permission
///
/// Override holders can read every role secret regardless of membership.
pub trait MembershipOracle: Send + Sync {
    fn members_of(&self, role: &RoleId) -> Result<BTreeSet<AccountId>>;

    fn has_override(&self, account: &AccountId) -> Result<bool>;

    /// Every account currently holding the override permission
    fn override_holders(&self) -> Result<BTreeSet<AccountId>>;
}

#[derive(Default)]
struct Membership {
    roles: HashMap<RoleId, HashSet<AccountId>>,
    overrides: HashSet<AccountId>,
}

/// In-memory membership table
#[derive(Default)]
pub struct MemoryMembership {
    inner: RwLock<Membership>,
}

impl MemoryMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, role: &RoleId, account: &AccountId) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| Error::lock_error("Failed to acquire write lock"))?;
        inner
            .roles
            .entry(role.clone())
            .or_default()
            .insert(account.clone());
        Ok(())
    }

    pub fn remove_member(&self, role: &RoleId, account: &AccountId) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| Error::lock_error("Failed to acquire write lock"))?;
        if let Some(members) = inner.roles.get_mut(role) {
            members.remove(account);
        }
        Ok(())
    }

    pub fn grant_override(&self, account: &AccountId) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| Error::lock_error("Failed to acquire write lock"))?;
        inner.overrides.insert(account.clone());
        Ok(())
    }

    pub fn revoke_override(&self, account: &AccountId) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| Error::lock_error("Failed to acquire write lock"))?;
        inner.overrides.remove(account);
        Ok(())
    }
}

impl MembershipOracle for MemoryMembership {
    fn members_of(&self, role: &RoleId) -> Result<BTreeSet<AccountId>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::lock_error("Failed to acquire read lock"))?;
        Ok(inner
            .roles
            .get(role)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn has_override(&self, account: &AccountId) -> Result<bool> {
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::lock_error("Failed to acquire read lock"))?;
        Ok(inner.overrides.contains(account))
    }

    fn override_holders(&self) -> Result<BTreeSet<AccountId>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| Error::lock_error("Failed to acquire read lock"))?;
        Ok(inner.overrides.iter().cloned().collect())
    }
}
