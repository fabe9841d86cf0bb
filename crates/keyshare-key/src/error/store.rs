use super::Error;
use crate::types::{AccountId, RoleId};

/// 存储与分发相关的错误扩展
impl Error {
    /// 账户记录不完整
    pub fn incomplete_key_pair(account: &AccountId, missing: &str) -> Self {
        Error::Store(format!(
            "Key pair of account {} is missing attribute {}",
            account, missing
        ))
    }

    /// 属性值无法解析
    pub fn invalid_attribute(account: &AccountId, name: &str) -> Self {
        Error::Store(format!(
            "Attribute {} of account {} holds an invalid value",
            name, account
        ))
    }

    /// 分发失败
    pub fn distribution(role: &RoleId, reason: impl std::fmt::Display) -> Self {
        Error::Distribution {
            role: role.clone(),
            reason: reason.to_string(),
        }
    }

    /// 无效配置
    pub fn invalid_configuration(msg: impl std::fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// 锁错误
    pub fn lock_error(msg: impl std::fmt::Display) -> Self {
        Error::Other(format!("Lock error: {}", msg))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::invalid_configuration(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Config(format!("IO error: {}", err))
    }
}
