use thiserror::Error;

/// Crypto模块的错误类型
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

    /// 明文超过算法允许的最大长度
    #[error("Payload of {len} bytes exceeds the {max} byte limit of the key")]
    PayloadTooLarge { len: usize, max: usize },

    /// 对称加解密失败
    #[error("Symmetric cipher error: {0}")]
    Symmetric(String),

    /// 密钥派生失败
    #[error("Key derivation error: {0}")]
    Kdf(String),

    #[error("PKCS8 error: {0}")]
    Pkcs8Error(#[from] pkcs8::Error),

    #[error("SPKI error: {0}")]
    SpkiError(#[from] pkcs8::spki::Error),

    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

/// Result类型别名
pub type Result<T> = std::result::Result<T, Error>;
