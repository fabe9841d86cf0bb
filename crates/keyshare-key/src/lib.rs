pub mod config;
pub mod distributor;
pub mod error;
pub mod lifecycle;
mod locks;
pub mod oracle;
pub mod session;
pub mod store;
pub mod system;
pub mod types;

// Re-export core functionality
pub use config::Settings;
pub use distributor::{Operator, RoleSecretDistributor};
pub use error::{Error, Result};
pub use lifecycle::KeyLifecycle;
pub use oracle::{MembershipOracle, MemoryMembership};
pub use session::CarryChannel;
// Re-export store types
pub use store::{
    AccountStore, MemoryAccountStore, MemorySessionStore, MemoryShareRegistry, SessionKeySlot,
    SessionStore, ShareRegistry,
};
pub use system::{Collaborators, InitReport, Keyshare};
pub use types::{
    AccountId, Credential, KeyPair, MemberShare, ProtectionState, RoleId, RoleSecret, RoleShares,
    SessionId,
};
