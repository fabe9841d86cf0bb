//! Collaborator storage contracts
//!
//! The hosting application owns account records, the role share registry and
//! the per-session ephemeral store. This crate only needs the narrow
//! capabilities below; [`memory`] provides in-process implementations.

mod memory;

pub use memory::{MemoryAccountStore, MemorySessionStore, MemoryShareRegistry};
use zeroize::Zeroizing;

use crate::{
    error::Result,
    types::{AccountId, RoleId, RoleShares, SessionId},
};

/// Attribute names used on account records
pub mod attr {
    /// SPKI DER public key
    pub const PUBLIC_KEY: &str = "public_key";
    /// PKCS#8 DER private key, or its wrapped form once protected
    pub const PRIVATE_KEY: &str = "private_key";
    /// `"1"` when `private_key` is wrapped, `"0"` otherwise
    pub const PRIVATE_KEY_PROTECTED: &str = "private_key_protected";
    /// Nonce policy the private key was wrapped with
    pub const PRIVATE_KEY_WRAP: &str = "private_key_wrap";
}

/// Attribute storage for account records
pub trait AccountStore: Send + Sync {
    /// Read one attribute; `None` when unset
    fn get_attribute(&self, account: &AccountId, name: &str) -> Result<Option<Vec<u8>>>;

    /// Write several attributes in one atomic update
    fn set_attributes(&self, account: &AccountId, attributes: Vec<(&str, Vec<u8>)>) -> Result<()>;
}

/// Durable mapping from role to its share set
pub trait ShareRegistry: Send + Sync {
    /// Current share set of `role`, if the role has a secret
    fn get_shares(&self, role: &RoleId) -> Result<Option<RoleShares>>;

    /// Replace the whole share set of a role in one step
    fn replace_shares(&self, shares: RoleShares) -> Result<()>;

    /// Drop a role and its shares; returns whether it existed
    fn remove_role(&self, role: &RoleId) -> Result<bool>;

    /// Roles that currently have a secret
    fn roles(&self) -> Result<Vec<RoleId>>;
}

/// Plaintext private key staged for one session
#[derive(Clone)]
pub struct SessionKeySlot {
    pub account_id: AccountId,
    pub private_key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for SessionKeySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeySlot")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

/// Ephemeral per-session storage backing the carry channel
///
/// Implementations must never write slots to durable storage. Every method
/// is a single linearizable step, and a slot past its lifetime reads as
/// absent.
pub trait SessionStore: Send + Sync {
    /// Store a slot, replacing any previous one for the session
    fn put(&self, session: &SessionId, slot: SessionKeySlot) -> Result<()>;

    /// Copy of the live slot, if any
    fn get(&self, session: &SessionId) -> Result<Option<SessionKeySlot>>;

    /// Remove and return the live slot
    fn remove(&self, session: &SessionId) -> Result<Option<SessionKeySlot>>;

    /// Evict slots that outlived their lifetime
    fn purge_expired(&self) -> Result<()>;
}
