use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use moka::sync::Cache;

use super::{AccountStore, SessionKeySlot, SessionStore, ShareRegistry};
use crate::{
    error::{Error, Result},
    types::{AccountId, RoleId, RoleShares, SessionId},
};

/// Type alias for the account attribute map
type AccountRecords = Arc<RwLock<HashMap<AccountId, HashMap<String, Vec<u8>>>>>;

/// In-memory account attribute store
#[derive(Default)]
pub struct MemoryAccountStore {
    records: AccountRecords,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryAccountStore {
    fn get_attribute(&self, account: &AccountId, name: &str) -> Result<Option<Vec<u8>>> {
        let records = self
            .records
            .read()
            .map_err(|_| Error::lock_error("Failed to acquire read lock"))?;

        Ok(records
            .get(account)
            .and_then(|attributes| attributes.get(name))
            .cloned())
    }

    fn set_attributes(&self, account: &AccountId, attributes: Vec<(&str, Vec<u8>)>) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| Error::lock_error("Failed to acquire write lock"))?;

        let record = records.entry(account.clone()).or_default();
        for (name, value) in attributes {
            record.insert(name.to_string(), value);
        }
        Ok(())
    }
}

/// In-memory role share registry
#[derive(Default)]
pub struct MemoryShareRegistry {
    roles: Arc<RwLock<HashMap<RoleId, RoleShares>>>,
}

impl MemoryShareRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShareRegistry for MemoryShareRegistry {
    fn get_shares(&self, role: &RoleId) -> Result<Option<RoleShares>> {
        let roles = self
            .roles
            .read()
            .map_err(|_| Error::lock_error("Failed to acquire read lock"))?;
        Ok(roles.get(role).cloned())
    }

    fn replace_shares(&self, shares: RoleShares) -> Result<()> {
        let mut roles = self
            .roles
            .write()
            .map_err(|_| Error::lock_error("Failed to acquire write lock"))?;
        roles.insert(shares.role_id.clone(), shares);
        Ok(())
    }

    fn remove_role(&self, role: &RoleId) -> Result<bool> {
        let mut roles = self
            .roles
            .write()
            .map_err(|_| Error::lock_error("Failed to acquire write lock"))?;
        Ok(roles.remove(role).is_some())
    }

    fn roles(&self) -> Result<Vec<RoleId>> {
        let roles = self
            .roles
            .read()
            .map_err(|_| Error::lock_error("Failed to acquire read lock"))?;

        let mut ids: Vec<RoleId> = roles.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// In-process session slot store
///
/// Backed by a moka cache; with a TTL, slots expire that long after they were
/// published.
pub struct MemorySessionStore {
    slots: Cache<SessionId, SessionKeySlot>,
}

impl MemorySessionStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        let builder = Cache::builder();
        let slots = match ttl {
            Some(ttl) => builder.time_to_live(ttl).build(),
            None => builder.build(),
        };
        Self { slots }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, session: &SessionId, slot: SessionKeySlot) -> Result<()> {
        self.slots.insert(session.clone(), slot);
        Ok(())
    }

    fn get(&self, session: &SessionId) -> Result<Option<SessionKeySlot>> {
        Ok(self.slots.get(session))
    }

    fn remove(&self, session: &SessionId) -> Result<Option<SessionKeySlot>> {
        Ok(self.slots.remove(session))
    }

    fn purge_expired(&self) -> Result<()> {
        self.slots.run_pending_tasks();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use keyshare_crypto::AlgorithmDescriptor;
    use zeroize::Zeroizing;

    use super::*;

    #[test]
    fn test_account_store_basic_operations() {
        let store = MemoryAccountStore::new();
        let account = AccountId::from("alice");

        assert_eq!(store.get_attribute(&account, "public_key").unwrap(), None);

        store
            .set_attributes(&account, vec![("public_key", vec![1]), ("private_key", vec![2])])
            .unwrap();
        store
            .set_attributes(&account, vec![("private_key", vec![3])])
            .unwrap();

        assert_eq!(store.get_attribute(&account, "public_key").unwrap(), Some(vec![1]));
        assert_eq!(store.get_attribute(&account, "private_key").unwrap(), Some(vec![3]));
    }

    #[test]
    fn test_share_registry_replace_and_remove() {
        let registry = MemoryShareRegistry::new();
        let role = RoleId::from("editors");

        let mut shares = RoleShares::new(role.clone(), AlgorithmDescriptor::default());
        shares.shares.insert("alice".into(), vec![1]);
        registry.replace_shares(shares).unwrap();

        let mut replacement = RoleShares::new(role.clone(), AlgorithmDescriptor::default());
        replacement.shares.insert("bob".into(), vec![2]);
        registry.replace_shares(replacement).unwrap();

        let current = registry.get_shares(&role).unwrap().unwrap();
        assert!(!current.contains(&"alice".into()));
        assert!(current.contains(&"bob".into()));
        assert_eq!(registry.roles().unwrap(), vec![role.clone()]);

        assert!(registry.remove_role(&role).unwrap());
        assert!(!registry.remove_role(&role).unwrap());
        assert!(registry.get_shares(&role).unwrap().is_none());
    }

    #[test]
    fn test_session_store_remove_and_ttl() {
        let store = MemorySessionStore::new(Some(Duration::from_millis(50)));
        let s1 = SessionId::from("s1");
        let s2 = SessionId::from("s2");
        let slot = SessionKeySlot {
            account_id: "alice".into(),
            private_key: Zeroizing::new(vec![9; 8]),
        };

        store.put(&s1, slot.clone()).unwrap();
        store.put(&s2, slot).unwrap();
        assert_eq!(
            store.remove(&s1).unwrap().map(|slot| slot.account_id),
            Some(AccountId::from("alice"))
        );
        assert!(store.remove(&s1).unwrap().is_none());
        assert!(store.get(&s2).unwrap().is_some());

        thread::sleep(Duration::from_millis(120));
        store.purge_expired().unwrap();
        assert!(store.get(&s2).unwrap().is_none());
    }
}
