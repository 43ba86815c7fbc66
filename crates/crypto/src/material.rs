//! Cipher material: the AES key / IV pair backing one vault instance.
//!
//! The pair is created once, persisted to a small `CIPHER=…` / `IV=…`
//! file, and loaded on every subsequent start. It must never change for
//! the lifetime of the tokens issued under it.

use std::path::Path;

use {
    rand::RngCore,
    tracing::{debug, info},
};

use crate::{cipher, error::CryptoError};

/// File key for the AES cipher string.
pub const MATERIAL_KEY_CIPHER: &str = "CIPHER";
/// File key for the initialization vector.
pub const MATERIAL_KEY_IV: &str = "IV";
/// Generated key length in bytes (selects AES-256).
pub const KEY_LEN: usize = 32;
/// Generated IV length in bytes (one AES block).
pub const IV_LEN: usize = 16;

/// Key material alphabet. Kept to ASCII letters so the file stays portable
/// across vault implementations that read the key as raw characters.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// An AES key and IV pair. Immutable once created.
#[derive(Debug, Clone)]
pub struct CipherMaterial {
    key: String,
    iv: String,
}

impl CipherMaterial {
    pub fn new(key: impl Into<String>, iv: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            iv: iv.into(),
        }
    }

    /// Generate a fresh pair from the process CSPRNG.
    pub fn generate() -> Self {
        Self {
            key: gen_letters(KEY_LEN),
            iv: gen_letters(IV_LEN),
        }
    }

    /// Parse a persisted material file.
    pub fn load(path: &Path) -> Result<Self, CryptoError> {
        let mut key = None;
        let mut iv = None;
        for item in dotenvy::from_path_iter(path)
            .map_err(|e| CryptoError::MaterialMalformed(e.to_string()))?
        {
            let (k, v) = item.map_err(|e| CryptoError::MaterialMalformed(e.to_string()))?;
            match k.as_str() {
                MATERIAL_KEY_CIPHER => key = Some(v),
                MATERIAL_KEY_IV => iv = Some(v),
                _ => {},
            }
        }

        let key = key.ok_or(CryptoError::CipherMissing("key"))?;
        let iv = iv.ok_or(CryptoError::CipherMissing("iv"))?;
        debug!(path = %path.display(), "cipher material loaded");
        Ok(Self { key, iv })
    }

    /// Write the pair to `path` atomically (temp file + rename), `0600` on
    /// Unix.
    pub fn persist(&self, path: &Path) -> Result<(), CryptoError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("tmp");
        let contents = format!(
            "{MATERIAL_KEY_CIPHER}={}\n{MATERIAL_KEY_IV}={}\n",
            self.key, self.iv
        );
        std::fs::write(&tmp, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load the material at `path`, generating and persisting a fresh pair
    /// when the file does not exist yet.
    pub fn load_or_generate(path: &Path) -> Result<Self, CryptoError> {
        if path.exists() {
            return Self::load(path);
        }

        info!(path = %path.display(), "cipher material not found, generating");
        let material = Self::generate();
        material.persist(path)?;
        Ok(material)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn iv(&self) -> &str {
        &self.iv
    }

    /// Encrypt `plaintext` under this material.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        cipher::encrypt(plaintext, &self.key, &self.iv)
    }

    /// Decrypt a token issued under this material.
    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        cipher::decrypt(token, &self.key, &self.iv)
    }
}

/// Random string over [`ALPHABET`]. Draws 6 bits at a time and discards
/// indices past the end of the alphabet rather than folding them, keeping
/// the distribution uniform.
fn gen_letters(n: usize) -> String {
    let mut rng = rand::rng();
    let mut out = String::with_capacity(n);
    while out.len() < n {
        let idx = (rng.next_u32() & 0x3f) as usize;
        if idx < ALPHABET.len() {
            out.push(ALPHABET[idx] as char);
        }
    }
    out
}
