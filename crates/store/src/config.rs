//! Backend selection shared by the service and the CLI.

use std::{path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    FlatFileStore, MemoryStore, RemoteStore, SnapshotStore, Store, error::StoreError,
};

/// Which backend a vault instance persists to, plus its parameters.
///
/// Serializes with a `type` tag so it can live inside the CLI's persisted
/// instance config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory concurrent map; nothing survives the process.
    Memory,
    /// Human-readable `key=value` text file.
    File { path: PathBuf },
    /// Binary whole-map snapshot file.
    Snapshot {
        path: PathBuf,
        #[serde(default)]
        truncate: bool,
    },
    /// Remote key/value cache addressed by URL.
    Remote { url: String },
}

impl StoreConfig {
    /// Construct the backend this configuration describes.
    pub fn build(&self) -> Result<Arc<dyn Store>, StoreError> {
        match self {
            Self::Memory => Ok(Arc::new(MemoryStore::new())),
            Self::File { path } => Ok(Arc::new(FlatFileStore::new(path.clone()))),
            Self::Snapshot { path, truncate } => {
                Ok(Arc::new(SnapshotStore::open(path.clone(), *truncate)?))
            },
            Self::Remote { url } => Ok(Arc::new(RemoteStore::new(url.clone())?)),
        }
    }

    /// Short backend name used in logs and CLI flags.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
            Self::Snapshot { .. } => "snapshot",
            Self::Remote { .. } => "remote",
        }
    }
}
