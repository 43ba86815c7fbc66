//! Crypto error types.

/// Errors produced by encryption, decryption, and cipher material handling.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The cipher material lacks its key or its IV.
    #[error("cipher material is missing its {0}")]
    CipherMissing(&'static str),

    /// The key is not a supported AES size, or the IV is not one block long.
    #[error("invalid cipher material: {0}")]
    CipherInvalid(String),

    /// The token is not valid base64, decodes to a length that is not a
    /// positive multiple of the block size, or does not unpad to UTF-8.
    #[error("malformed token: {0}")]
    TokenMalformed(String),

    /// The final padding byte is zero or larger than the block size.
    #[error("invalid token padding: padding length {0} outside block bounds")]
    PaddingInvalid(u8),

    /// The trailing padding bytes are not all equal to the padding length.
    #[error("invalid token padding: padding bytes are not homogeneous")]
    PaddingNotHomogeneous,

    /// Reading or writing the cipher material file failed.
    #[error("cipher material io: {0}")]
    MaterialIo(#[from] std::io::Error),

    /// The cipher material file exists but cannot be parsed.
    #[error("cipher material file malformed: {0}")]
    MaterialMalformed(String),
}
