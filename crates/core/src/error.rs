//! Manager error types.

use {tokenvault_crypto::CryptoError, tokenvault_store::StoreError};

/// Errors produced by token manager operations.
///
/// Crypto and store failures bubble up unchanged; the variants here cover
/// the manager's own validation and verification rules.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The same composite key appears more than once in one request.
    #[error("key {0} already present in request, accepting only the first occurrence")]
    DuplicateInRequest(String),

    /// The presented token does not equal the stored token. Carries the
    /// redacted presented token only.
    #[error("presented token does not match stored token: {0}")]
    TokenMismatch(String),

    /// The request shape violates composite-key rules.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
