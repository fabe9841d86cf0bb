mod store;

use thiserror::Error;

use crate::types::{AccountId, RoleId, SessionId};

/// 密钥管理与角色密钥分发的错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 密钥对生成或自检失败
    #[error("Key generation error: {0}")]
    Generation(String),

    /// 公钥加密失败
    #[error("Encryption error: {0}")]
    Encrypt(String),

    /// 私钥解密失败
    #[error("Decryption error: {0}")]
    Decrypt(String),

    /// 凭据无法解开私钥
    #[error("Credential does not unlock the private key of account {0}")]
    CredentialMismatch(AccountId),

    /// 账户没有该角色的共享副本
    #[error("Account {account} is not authorized for role {role}")]
    NotAuthorized { role: RoleId, account: AccountId },

    /// 当前会话中没有可用的私钥
    #[error("No session key available for account {account} in session {session}")]
    KeyUnavailable {
        account: AccountId,
        session: SessionId,
    },

    /// 共享副本重新计算失败
    #[error("Share distribution failed for role {role}: {reason}")]
    Distribution { role: RoleId, reason: String },

    /// 账户已有密钥对
    #[error("Account {0} already has a key pair")]
    KeyPairExists(AccountId),

    /// 账户没有密钥对
    #[error("Account {0} has no key pair")]
    KeyPairMissing(AccountId),

    /// 角色没有角色密钥
    #[error("Role {0} has no role secret")]
    RoleNotFound(RoleId),

    /// 角色未参与密钥分发
    #[error("Role {0} does not participate in secret distribution")]
    RoleDisabled(RoleId),

    /// 系统已初始化，算法不可更改
    #[error("System already initialized with {active}, cannot switch to {requested}")]
    AlreadyInitialized { active: String, requested: String },

    /// 存储错误
    #[error("Store error: {0}")]
    Store(String),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(String),

    #[error("Crypto error: {0}")]
    Crypto(keyshare_crypto::Error),

    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Whether the caller should retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Distribution { .. })
    }
}

impl From<keyshare_crypto::Error> for Error {
    fn from(err: keyshare_crypto::Error) -> Self {
        use keyshare_crypto::Error as CryptoError;

        match err {
            CryptoError::Generation(msg) => Error::Generation(msg),
            CryptoError::Encrypt(msg) => Error::Encrypt(msg),
            e @ CryptoError::PayloadTooLarge { .. } => Error::Encrypt(e.to_string()),
            CryptoError::Decrypt(msg) => Error::Decrypt(msg),
            other => Error::Crypto(other),
        }
    }
}

/// Result类型别名
pub type Result<T> = std::result::Result<T, Error>;
