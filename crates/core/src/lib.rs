//! Token manager core.
//!
//! The request/response model, composite-key handling, and the [`Manager`]
//! that validates requests and coordinates the crypto primitive with a
//! pluggable [`tokenvault_store::Store`].

pub mod error;
pub mod keys;
pub mod manager;
pub mod model;

pub use {
    error::VaultError,
    keys::{KEY_DELIMITER, composite_key, redact, split_composite},
    manager::{Manager, ValidationFailure},
    model::{
        AllTokens, Child, ChildReceipt, DetokenizeReceipt, DetokenizeRequest, Receipt,
        TokenizeRequest, TokenizeResponse,
    },
};
