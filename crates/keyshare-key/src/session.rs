//! Session key carry channel
//!
//! After login the decrypted private key is staged here so later requests in
//! the same session can open role shares without asking for the credential
//! again. Slots live in a [`SessionStore`], which is never durable storage and
//! owns slot expiry.

use std::sync::Arc;

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::{
    error::Result,
    store::{SessionKeySlot, SessionStore},
    types::{AccountId, SessionId},
};

pub struct CarryChannel {
    store: Arc<dyn SessionStore>,
}

impl CarryChannel {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Stage `private_key` for `session`, replacing any previous slot
    pub fn put(
        &self,
        session: &SessionId,
        account: &AccountId,
        private_key: Zeroizing<Vec<u8>>,
    ) -> Result<()> {
        self.store.put(
            session,
            SessionKeySlot {
                account_id: account.clone(),
                private_key,
            },
        )?;
        debug!("Session key published for account {} in session {}", account, session);
        Ok(())
    }

    /// Read the live slot without consuming it
    pub fn take(&self, session: &SessionId) -> Result<Option<SessionKeySlot>> {
        self.store.get(session)
    }

    /// Like [`CarryChannel::take`], but only for the account that published the slot
    pub fn take_for(
        &self,
        session: &SessionId,
        account: &AccountId,
    ) -> Result<Option<Zeroizing<Vec<u8>>>> {
        Ok(self
            .take(session)?
            .filter(|slot| &slot.account_id == account)
            .map(|slot| slot.private_key))
    }

    /// Remove and return the slot in one step
    pub fn hand_off(&self, session: &SessionId) -> Result<Option<SessionKeySlot>> {
        self.store.remove(session)
    }

    pub fn clear(&self, session: &SessionId) -> Result<()> {
        self.store.remove(session)?;
        Ok(())
    }

    /// Purge the slot at logout or session expiry; returns whether one existed
    pub fn end_session(&self, session: &SessionId) -> Result<bool> {
        let existed = self.store.remove(session)?.is_some();
        if existed {
            info!("Session key purged for session {}", session);
        }
        Ok(existed)
    }

    /// Evict slots past their lifetime
    pub fn purge_expired(&self) -> Result<()> {
        self.store.purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;
    use crate::store::MemorySessionStore;

    fn channel(ttl: Option<Duration>) -> CarryChannel {
        CarryChannel::new(Arc::new(MemorySessionStore::new(ttl)))
    }

    fn key(byte: u8) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(vec![byte; 16])
    }

    #[test]
    fn test_put_take_clear() {
        let carry = channel(None);
        let session = SessionId::from("s1");
        let alice = AccountId::from("alice");

        assert!(carry.take(&session).unwrap().is_none());

        carry.put(&session, &alice, key(1)).unwrap();
        carry.put(&session, &alice, key(2)).unwrap();
        let slot = carry.take(&session).unwrap().unwrap();
        assert_eq!(slot.private_key.as_slice(), key(2).as_slice());
        // take does not consume
        assert!(carry.take(&session).unwrap().is_some());

        carry.clear(&session).unwrap();
        assert!(carry.take(&session).unwrap().is_none());
    }

    #[test]
    fn test_take_for_checks_owner() {
        let carry = channel(None);
        let session = SessionId::from("s1");
        carry.put(&session, &"alice".into(), key(1)).unwrap();

        assert!(carry.take_for(&session, &"alice".into()).unwrap().is_some());
        assert!(carry.take_for(&session, &"bob".into()).unwrap().is_none());
    }

    #[test]
    fn test_hand_off_consumes_slot() {
        let carry = channel(None);
        let session = SessionId::from("s1");
        carry.put(&session, &"alice".into(), key(3)).unwrap();

        let slot = carry.hand_off(&session).unwrap().unwrap();
        assert_eq!(slot.account_id, AccountId::from("alice"));
        assert!(carry.hand_off(&session).unwrap().is_none());
        assert!(carry.take(&session).unwrap().is_none());
    }

    #[test]
    fn test_end_session() {
        let carry = channel(None);
        let session = SessionId::from("s1");
        carry.put(&session, &"alice".into(), key(1)).unwrap();

        assert!(carry.end_session(&session).unwrap());
        assert!(!carry.end_session(&session).unwrap());
    }

    #[test]
    fn test_expired_slots_read_as_absent() {
        let carry = channel(Some(Duration::from_millis(50)));
        let s1 = SessionId::from("s1");
        let s2 = SessionId::from("s2");
        carry.put(&s1, &"alice".into(), key(1)).unwrap();
        carry.put(&s2, &"bob".into(), key(2)).unwrap();

        thread::sleep(Duration::from_millis(120));

        assert!(carry.take(&s1).unwrap().is_none());
        assert!(carry.hand_off(&s2).unwrap().is_none());
        carry.purge_expired().unwrap();
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let carry = channel(None);
        let session = SessionId::from("s1");
        carry.put(&session, &"alice".into(), key(1)).unwrap();
        carry.purge_expired().unwrap();
        assert!(carry.take(&session).unwrap().is_some());
    }
}
