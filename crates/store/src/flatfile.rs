//! Durable backend over a human-readable `key=value` file, the same
//! format as the cipher material file.
//!
//! Every operation performs a full read (and, for mutations, a full
//! rewrite) of the file under a single mutex. This trades throughput for
//! operational simplicity; it is correct for single-process use but writes
//! are not atomic against partial failure.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use {async_trait::async_trait, tokio::sync::Mutex, tracing::debug};

use crate::{Store, ensure_parent_dir, error::StoreError};

/// Text-file store, one `key=value` entry per line.
pub struct FlatFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FlatFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole file. Caller must hold the lock.
    fn read_entries(&self) -> Result<HashMap<String, String>, StoreError> {
        let contents = std::fs::read_to_string(&self.path)?;
        let mut entries = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(StoreError::Corrupt(format!(
                    "line without delimiter in {}",
                    self.path.display()
                )));
            };
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(entries)
    }

    /// Serialize `entries` back to the file, replacing its contents.
    /// Caller must hold the lock.
    fn write_entries(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();

        let mut out = String::new();
        for key in keys {
            out.push_str(key);
            out.push('=');
            out.push_str(&entries[key]);
            out.push('\n');
        }
        std::fs::write(&self.path, out)?;
        Ok(())
    }
}

#[async_trait]
impl Store for FlatFileStore {
    /// Validate the destination and create the file when missing. Existing
    /// contents are preserved.
    async fn connect(&self) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        ensure_parent_dir(&self.path)?;
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        debug!(path = %self.path.display(), "flat-file store ready");
        Ok(true)
    }

    async fn store(&self, id: &str, token: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries()?;
        if entries.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        entries.insert(id.to_string(), token.to_string());
        self.write_entries(&entries)
    }

    async fn retrieve(&self, id: &str) -> Result<String, StoreError> {
        let _guard = self.lock.lock().await;
        let entries = self.read_entries()?;
        entries
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn retrieve_all(&self) -> Result<HashMap<String, String>, StoreError> {
        let _guard = self.lock.lock().await;
        let entries = self.read_entries()?;
        if entries.is_empty() {
            return Err(StoreError::Empty);
        }
        Ok(entries)
    }

    /// Removing a key from an empty store fails with [`StoreError::Empty`];
    /// otherwise the rewrite happens whether or not the key was present and
    /// the result is `true`.
    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries()?;
        if entries.is_empty() {
            return Err(StoreError::Empty);
        }
        entries.remove(id);
        self.write_entries(&entries)?;
        debug!(id, "deleted from flat-file store");
        Ok(true)
    }

    async fn patch(&self, id: &str, token: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries()?;
        let Some(slot) = entries.get_mut(id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        *slot = token.to_string();
        self.write_entries(&entries)?;
        Ok(true)
    }

    async fn flush(&self) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        std::fs::write(&self.path, "")?;
        Ok(true)
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
