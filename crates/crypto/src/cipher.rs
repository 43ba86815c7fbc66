//! AES-CBC encrypt/decrypt with hand-rolled PKCS#7 padding.
//!
//! Padding is applied and validated here rather than by the mode so that
//! padding failures surface as their own error kinds instead of a single
//! opaque unpad error.

use {
    aes::{Aes128, Aes192, Aes256},
    base64::{Engine, engine::general_purpose::STANDARD},
    cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding},
};

use crate::error::CryptoError;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Encrypt `plaintext` under `key`/`iv` and return the base64 token.
///
/// The key selects the AES variant by length (16, 24, or 32 bytes); the IV
/// must be exactly one block. The output is deterministic for a given
/// `(plaintext, key, iv)` triple.
pub fn encrypt(plaintext: &str, key: &str, iv: &str) -> Result<String, CryptoError> {
    check_material(key, iv)?;

    let mut buf = pad(plaintext.as_bytes());
    match key.len() {
        16 => cbc_encrypt::<cbc::Encryptor<Aes128>>(key.as_bytes(), iv.as_bytes(), &mut buf)?,
        24 => cbc_encrypt::<cbc::Encryptor<Aes192>>(key.as_bytes(), iv.as_bytes(), &mut buf)?,
        32 => cbc_encrypt::<cbc::Encryptor<Aes256>>(key.as_bytes(), iv.as_bytes(), &mut buf)?,
        n => {
            return Err(CryptoError::CipherInvalid(format!(
                "key length {n} is not a supported AES size"
            )));
        },
    }

    Ok(STANDARD.encode(&buf))
}

/// Decrypt a base64 token back to its plaintext.
pub fn decrypt(token: &str, key: &str, iv: &str) -> Result<String, CryptoError> {
    check_material(key, iv)?;

    let mut buf = STANDARD
        .decode(token)
        .map_err(|e| CryptoError::TokenMalformed(e.to_string()))?;
    if buf.is_empty() || buf.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::TokenMalformed(format!(
            "ciphertext length {} is not a positive multiple of the block size",
            buf.len()
        )));
    }

    match key.len() {
        16 => cbc_decrypt::<cbc::Decryptor<Aes128>>(key.as_bytes(), iv.as_bytes(), &mut buf)?,
        24 => cbc_decrypt::<cbc::Decryptor<Aes192>>(key.as_bytes(), iv.as_bytes(), &mut buf)?,
        32 => cbc_decrypt::<cbc::Decryptor<Aes256>>(key.as_bytes(), iv.as_bytes(), &mut buf)?,
        n => {
            return Err(CryptoError::CipherInvalid(format!(
                "key length {n} is not a supported AES size"
            )));
        },
    }

    let unpadded = strip_padding(&buf)?;
    String::from_utf8(unpadded.to_vec()).map_err(|e| CryptoError::TokenMalformed(e.to_string()))
}

fn check_material(key: &str, iv: &str) -> Result<(), CryptoError> {
    if key.is_empty() {
        return Err(CryptoError::CipherMissing("key"));
    }
    if iv.is_empty() {
        return Err(CryptoError::CipherMissing("iv"));
    }
    if iv.len() != BLOCK_SIZE {
        return Err(CryptoError::CipherInvalid(format!(
            "iv must be {BLOCK_SIZE} bytes, got {}",
            iv.len()
        )));
    }
    Ok(())
}

fn cbc_encrypt<E>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), CryptoError>
where
    E: KeyIvInit + BlockEncryptMut,
{
    let enc = E::new_from_slices(key, iv)
        .map_err(|e| CryptoError::CipherInvalid(e.to_string()))?;
    let len = buf.len();
    enc.encrypt_padded_mut::<NoPadding>(buf, len)
        .map_err(|e| CryptoError::CipherInvalid(e.to_string()))?;
    Ok(())
}

fn cbc_decrypt<D>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), CryptoError>
where
    D: KeyIvInit + BlockDecryptMut,
{
    let dec = D::new_from_slices(key, iv)
        .map_err(|e| CryptoError::CipherInvalid(e.to_string()))?;
    dec.decrypt_padded_mut::<NoPadding>(buf)
        .map_err(|e| CryptoError::TokenMalformed(e.to_string()))?;
    Ok(())
}

/// PKCS#7: append `n` bytes of value `n`, with `n` in `[1, BLOCK_SIZE]`.
/// An aligned input gets a full block of padding, never zero.
fn pad(data: &[u8]) -> Vec<u8> {
    let n = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = data.to_vec();
    padded.resize(data.len() + n, n as u8);
    padded
}

fn strip_padding(buf: &[u8]) -> Result<&[u8], CryptoError> {
    let n = buf[buf.len() - 1] as usize;
    if n == 0 || n > BLOCK_SIZE {
        return Err(CryptoError::PaddingInvalid(n as u8));
    }
    if buf[buf.len() - n..].iter().any(|&b| b as usize != n) {
        return Err(CryptoError::PaddingNotHomogeneous);
    }
    Ok(&buf[..buf.len() - n])
}
