//! Deterministic tokenization crypto.
//!
//! AES-CBC with PKCS#7 padding, plus the persisted key/IV pair
//! ([`CipherMaterial`]) that backs a vault instance. Encryption is
//! deliberately deterministic so a stored token can be compared
//! bit-for-bit against a presented one.

pub mod cipher;
pub mod error;
pub mod material;

pub use {
    cipher::{BLOCK_SIZE, decrypt, encrypt},
    error::CryptoError,
    material::{CipherMaterial, IV_LEN, KEY_LEN},
};
