//! In-memory concurrent-map backend. No I/O, no durability.

use std::collections::HashMap;

use {
    async_trait::async_trait,
    dashmap::{DashMap, mapref::entry::Entry},
    tracing::debug,
};

use crate::{Store, error::StoreError};

/// Lock-free concurrent map of composite key → token.
///
/// All operations proceed in parallel without suspension. `delete` is
/// idempotent: removing a missing key returns `true`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn connect(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn store(&self, id: &str, token: &str) -> Result<(), StoreError> {
        match self.entries.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(token.to_string());
                Ok(())
            },
        }
    }

    async fn retrieve(&self, id: &str) -> Result<String, StoreError> {
        self.entries
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn retrieve_all(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.entries.remove(id);
        debug!(id, "deleted from memory store");
        Ok(true)
    }

    async fn patch(&self, id: &str, token: &str) -> Result<bool, StoreError> {
        match self.entries.get_mut(id) {
            Some(mut entry) => {
                *entry = token.to_string();
                Ok(true)
            },
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn flush(&self) -> Result<bool, StoreError> {
        self.entries.clear();
        Ok(true)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_always_succeeds() {
        let store = MemoryStore::new();
        assert!(store.connect().await.unwrap());
    }

    #[tokio::test]
    async fn store_then_retrieve() {
        let store = MemoryStore::new();
        store.store("u1__ssn", "token-a").await.unwrap();
        assert_eq!(store.retrieve("u1__ssn").await.unwrap(), "token-a");
    }

    #[tokio::test]
    async fn duplicate_store_fails() {
        let store = MemoryStore::new();
        store.store("u1__ssn", "token-a").await.unwrap();
        let err = store.store("u1__ssn", "token-b").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        // The first value is untouched.
        assert_eq!(store.retrieve("u1__ssn").await.unwrap(), "token-a");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.store("k", "v").await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(matches!(
            store.retrieve("k").await,
            Err(StoreError::NotFound(_))
        ));
        // Second delete of the same key does not fail.
        assert!(store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn patch_requires_existing_key() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.patch("missing", "v").await,
            Err(StoreError::NotFound(_))
        ));

        store.store("k", "old").await.unwrap();
        assert!(store.patch("k", "new").await.unwrap());
        assert_eq!(store.retrieve("k").await.unwrap(), "new");
    }

    #[tokio::test]
    async fn flush_clears_everything() {
        let store = MemoryStore::new();
        store.store("a", "1").await.unwrap();
        store.store("b", "2").await.unwrap();

        assert!(store.flush().await.unwrap());
        assert!(store.retrieve_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retrieve_all_snapshots_entries() {
        let store = MemoryStore::new();
        store.store("a", "1").await.unwrap();
        store.store("b", "2").await.unwrap();

        let all = store.retrieve_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"], "1");
        assert_eq!(all["b"], "2");
    }
}
