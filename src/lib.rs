//! # Keyshare - 角色密钥共享
//!
//! 账户密钥对、凭据保护的私钥与按角色分发的共享密钥
//!
//! ## 模块
//!
//! - `keyshare_crypto` - 基础加密原语
//! - `keyshare_key` - 密钥生命周期、会话密钥通道与角色密钥分发

// Re-export all sub-crates
pub use keyshare_crypto;
pub use keyshare_key;
