//! JSON File Storage
//!
//! One structured document per file:
//! - pool: `<data_dir>/addresses.txt`
//! - ledgers: `<data_dir>/AccountInfo/<address>.txt`
//!
//! Writes go to a temporary file in the target directory which is fsynced
//! and then renamed over the destination, so a crash mid-write leaves the
//! previous document intact.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::traits::{
    ledger_key, DocumentGuard, DocumentLocks, LedgerStore, PoolStore, StorageError,
    StorageResult, POOL_KEY,
};
use crate::types::{Ledger, LedgerDocument, PoolDocument};

const LEDGER_EXTENSION: &str = "txt";

/// Pool document backed by a JSON file
pub struct FilePoolStore {
    path: PathBuf,
    locks: DocumentLocks,
}

impl FilePoolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            locks: DocumentLocks::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PoolStore for FilePoolStore {
    async fn load(&self) -> StorageResult<PoolDocument> {
        read_document(&self.path, POOL_KEY).await
    }

    async fn save(&self, pool: &PoolDocument) -> StorageResult<()> {
        write_document(&self.path, POOL_KEY, pool).await
    }

    async fn lock(&self) -> DocumentGuard {
        self.locks.acquire(POOL_KEY).await
    }
}

/// Ledgers stored as one JSON file per address
pub struct FileLedgerStore {
    dir: PathBuf,
    locks: DocumentLocks,
}

impl FileLedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: DocumentLocks::new(),
        }
    }

    /// File holding the ledger of `address`
    pub fn ledger_path(&self, address: &str) -> StorageResult<PathBuf> {
        let key = ledger_key(address);
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(StorageError::Io {
                key,
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a valid address"),
            });
        }
        Ok(self.dir.join(format!("{}.{}", key, LEDGER_EXTENSION)))
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn load(&self, address: &str) -> StorageResult<Ledger> {
        let key = ledger_key(address);
        let path = self.ledger_path(address)?;
        let doc: LedgerDocument = read_document(&path, &key).await?;

        Ledger::try_from(doc).map_err(|e| StorageError::Conversion {
            key,
            message: e.to_string(),
        })
    }

    async fn save(&self, address: &str, ledger: &Ledger) -> StorageResult<()> {
        let key = ledger_key(address);
        let path = self.ledger_path(address)?;
        write_document(&path, &key, &LedgerDocument::from(ledger)).await
    }

    async fn exists(&self, address: &str) -> StorageResult<bool> {
        let key = ledger_key(address);
        let path = self.ledger_path(address)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|source| StorageError::Io { key, source })
    }

    async fn lock(&self, address: &str) -> DocumentGuard {
        self.locks.acquire(&ledger_key(address)).await
    }
}

/// Read and validate one document
async fn read_document<T: DeserializeOwned>(path: &Path, key: &str) -> StorageResult<T> {
    let bytes = tokio::fs::read(path).await.map_err(|source| StorageError::Io {
        key: key.to_string(),
        source,
    })?;

    serde_json::from_slice(&bytes).map_err(|e| StorageError::Format {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Serialize and atomically replace one document
async fn write_document<T: Serialize>(path: &Path, key: &str, doc: &T) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(doc).map_err(|e| StorageError::Format {
        key: key.to_string(),
        message: e.to_string(),
    })?;

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
        .await
        .map_err(|e| StorageError::Io {
            key: key.to_string(),
            source: io::Error::new(io::ErrorKind::Other, e),
        })?
        .map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })?;

    debug!(target: "custody::storage", key, path = %path.display(), "Document written");
    Ok(())
}

/// Temp file + fsync + rename
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
