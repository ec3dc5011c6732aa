//! Whole-document JSON snapshot persistence.
//!
//! The durable representation of the catalog is a single JSON file rewritten
//! wholesale on every flush. There is no indexing and no partial write: a
//! reader either sees the previous snapshot or the new one, never a half of
//! each.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Errors from the snapshot store. Every variant means the store is
/// unavailable for the requested operation; nothing here is retried by the
/// core.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("store snapshot corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Storage backend for one snapshot document.
#[async_trait]
pub trait SnapshotStore<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Load the full snapshot. A snapshot that does not exist yet is an
    /// empty catalog, not an error.
    async fn load(&self) -> Result<Vec<T>, StoreError>;

    /// Replace the stored snapshot with `items`, creating the storage root
    /// if needed.
    async fn save(&self, items: &[T]) -> Result<(), StoreError>;
}

/// Filesystem-backed snapshot store: one pretty-printed JSON file under the
/// storage root (`gallery_info.json` for the catalog, `albums_list.json` for
/// albums).
pub struct FsSnapshotStore<T> {
    root: PathBuf,
    file_path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FsSnapshotStore<T> {
    pub fn new(root: impl Into<PathBuf>, file_name: &str) -> Self {
        let root = root.into();
        let file_path = root.join(file_name);
        Self {
            root,
            file_path,
            _marker: PhantomData,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

#[async_trait]
impl<T> SnapshotStore<T> for FsSnapshotStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn load(&self) -> Result<Vec<T>, StoreError> {
        let data = match fs::read(&self.file_path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {:?}, starting empty", self.file_path);
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        let items = serde_json::from_slice(&data)?;
        Ok(items)
    }

    async fn save(&self, items: &[T]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await?;
        let data = serde_json::to_vec_pretty(items)?;

        // Write-then-rename so a concurrent reader never observes a
        // half-written snapshot.
        let root = self.root.clone();
        let target = self.file_path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), std::io::Error> {
            let mut tmp = tempfile::NamedTempFile::new_in(&root)?;
            std::io::Write::write_all(&mut tmp, &data)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;

        debug!("Wrote snapshot {:?} ({} records)", self.file_path, items.len());
        Ok(())
    }
}
