//! Pluggable key/value storage for issued tokens.
//!
//! Every backend satisfies one capability set ([`Store`]); they differ in
//! durability, concurrency, and refresh semantics. The manager depends only
//! on the trait, never on a concrete backend.

pub mod config;
pub mod error;
pub mod flatfile;
pub mod memory;
pub mod remote;
pub mod snapshot;

use std::{collections::HashMap, path::Path};

use {async_trait::async_trait, tracing::debug};

pub use {
    config::StoreConfig,
    error::StoreError,
    flatfile::FlatFileStore,
    memory::MemoryStore,
    remote::RemoteStore,
    snapshot::SnapshotStore,
};

/// The capability set shared by all backends.
///
/// Implementations must be `Send + Sync`; one instance is shared across
/// request handlers behind an `Arc<dyn Store>`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Establish or verify connectivity. Idempotent.
    async fn connect(&self) -> Result<bool, StoreError>;

    /// Insert a new entry. Fails with [`StoreError::AlreadyExists`] when the
    /// id is present; updates go through [`patch`](Store::patch).
    async fn store(&self, id: &str, token: &str) -> Result<(), StoreError>;

    /// Fetch the token for `id`, [`StoreError::NotFound`] when absent.
    async fn retrieve(&self, id: &str) -> Result<String, StoreError>;

    /// Snapshot of every entry.
    async fn retrieve_all(&self) -> Result<HashMap<String, String>, StoreError>;

    /// Remove `id`. Behavior on a missing id is backend-specific; see the
    /// individual implementations.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Update an existing entry only; fails with [`StoreError::NotFound`]
    /// when the id is absent.
    async fn patch(&self, id: &str, token: &str) -> Result<bool, StoreError>;

    /// Clear every entry.
    async fn flush(&self) -> Result<bool, StoreError>;

    /// Release backend resources.
    async fn close(&self) -> Result<(), StoreError>;
}

/// Ensure the directory that will hold `path` exists, creating it if not.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        debug!(dir = %parent.display(), "store directory missing, creating");
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
