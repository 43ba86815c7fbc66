//! Durable backend over a binary whole-map snapshot file.
//!
//! Disk is the source of truth. An in-memory mirror (the *basin*) is
//! rehydrated from the file before every operation and cleared again after
//! every write, so the externally observable behavior is refresh-on-read:
//! a write followed by any read returns the persisted value, and concurrent
//! writers converge on the last writer's state.
//!
//! The snapshot is one bincode-encoded `HashMap<String, String>` per file.

use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    dashmap::DashMap,
    tokio::sync::RwLock,
    tracing::{debug, info},
};

use crate::{Store, ensure_parent_dir, error::StoreError};

/// Binary snapshot store.
///
/// A read-write lock guards the file: refresh takes the read lock, dump and
/// truncation take the write lock. Because every mutating operation is
/// refresh-then-persist, write throughput is effectively serialized.
pub struct SnapshotStore {
    path: PathBuf,
    file: RwLock<File>,
    basin: DashMap<String, String>,
}

impl SnapshotStore {
    /// Open the snapshot at `path`, creating it (and its parent directory)
    /// when missing. With `truncate`, any existing snapshot is discarded.
    pub fn open(path: impl Into<PathBuf>, truncate: bool) -> Result<Self, StoreError> {
        let path = path.into();
        ensure_parent_dir(&path)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        if truncate {
            file.set_len(0)?;
            info!(path = %path.display(), "snapshot store truncated");
        }

        Ok(Self {
            path,
            file: RwLock::new(file),
            basin: DashMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rehydrate the basin from disk.
    ///
    /// An empty file is an empty store, not an error. When the decoded map
    /// is non-empty the basin is flushed and replaced wholesale.
    async fn refresh(&self) -> Result<(), StoreError> {
        let file = self.file.read().await;
        let mut reader = &*file;
        reader.seek(SeekFrom::Start(0))?;

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            debug!(path = %self.path.display(), "snapshot empty, treating as empty store");
            return Ok(());
        }

        let decoded: HashMap<String, String> =
            bincode::deserialize(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if !decoded.is_empty() {
            self.basin.clear();
            for (key, value) in decoded {
                self.basin.insert(key, value);
            }
        }
        Ok(())
    }

    /// Write the basin to disk, truncating first when `replace`.
    ///
    /// Returns the resulting file size, which doubles as an integrity
    /// check: zero bytes after dumping a non-empty map is a failure.
    async fn persist(&self, replace: bool) -> Result<u64, StoreError> {
        let mut file = self.file.write().await;
        if replace {
            file.set_len(0)?;
        }

        let snapshot: HashMap<String, String> = self
            .basin
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        file.seek(SeekFrom::Start(0))?;
        bincode::serialize_into(&mut *file, &snapshot)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        file.sync_all()?;
        // Leave the cursor at the start for the next refresh.
        file.seek(SeekFrom::Start(0))?;

        let size = file.metadata()?.len();
        if size == 0 && !snapshot.is_empty() {
            return Err(StoreError::WriteIncomplete);
        }
        debug!(path = %self.path.display(), bytes = size, "snapshot persisted");
        Ok(size)
    }
}

#[async_trait]
impl Store for SnapshotStore {
    async fn connect(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn store(&self, id: &str, token: &str) -> Result<(), StoreError> {
        self.refresh().await?;
        if self.basin.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        self.basin.insert(id.to_string(), token.to_string());

        self.persist(true).await?;
        self.basin.clear();
        Ok(())
    }

    async fn retrieve(&self, id: &str) -> Result<String, StoreError> {
        self.refresh().await?;
        self.basin
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn retrieve_all(&self) -> Result<HashMap<String, String>, StoreError> {
        self.refresh().await?;
        Ok(self
            .basin
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.refresh().await?;
        if self.basin.remove(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }

        self.persist(true).await?;
        self.basin.clear();
        debug!(id, "deleted from snapshot store");
        Ok(true)
    }

    async fn patch(&self, id: &str, token: &str) -> Result<bool, StoreError> {
        self.refresh().await?;
        {
            let Some(mut entry) = self.basin.get_mut(id) else {
                return Err(StoreError::NotFound(id.to_string()));
            };
            *entry = token.to_string();
        }

        self.persist(true).await?;
        self.basin.clear();
        Ok(true)
    }

    /// Clears both the basin and the on-disk snapshot.
    async fn flush(&self) -> Result<bool, StoreError> {
        self.basin.clear();

        let mut file = self.file.write().await;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(true)
    }

    async fn close(&self) -> Result<(), StoreError> {
        let file = self.file.read().await;
        file.sync_all()?;
        Ok(())
    }
}
