//! Wire-shaped request and response types.

use serde::{Deserialize, Serialize};

/// One child entry. `value` carries the plaintext on ingress and the issued
/// token on egress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    pub key: String,
    pub value: String,
}

/// Tokenize request: a parent identifier plus child key/value pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizeRequest {
    pub id: String,
    pub data: Vec<Child>,
}

/// Response mirroring the request shape, with each value replaced by its
/// token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizeResponse {
    pub id: String,
    pub data: Vec<Child>,
}

/// Detokenize request: the same shape, with `value` carrying a previously
/// issued token.
pub type DetokenizeRequest = TokenizeRequest;

/// Per-child outcome of a detokenize call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub found: bool,
    pub datum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildReceipt {
    pub key: String,
    pub value: Receipt,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetokenizeReceipt {
    pub id: String,
    pub data: Vec<ChildReceipt>,
}

/// Everything in the vault, grouped by parent identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllTokens {
    pub tokens: Vec<TokenizeResponse>,
}
