//! Catalog storage: serde models, the durable JSON snapshot store and the
//! TTL cache layered on top of it.

mod cache;
mod models;
mod snapshot_store;

pub use cache::{Clock, SnapshotCache, SystemClock, DEFAULT_CACHE_TTL_MS};
pub use models::{Album, ImagePatch, ImageRecord, PresentationInfo, PresentationSettings};
pub use snapshot_store::{FsSnapshotStore, SnapshotStore, StoreError};

/// Snapshot file name for the image catalog.
pub const CATALOG_FILE_NAME: &str = "gallery_info.json";

/// Snapshot file name for the album list.
pub const ALBUMS_FILE_NAME: &str = "albums_list.json";
