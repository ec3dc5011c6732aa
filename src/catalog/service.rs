//! GalleryCatalog - the catalog core's exposed surface.
//!
//! Orchestrates ingestion (persist original → derive renditions → append →
//! flush), point mutations (update, delete) and the read queries, all
//! against the two snapshot caches. The routing/auth layer sits above this
//! and is not part of the core.

use super::file_handler::{sanitize_filename, FileHandler, FileHandlerError};
use crate::catalog_store::{
    Album, Clock, FsSnapshotStore, ImagePatch, ImageRecord, SnapshotCache, StoreError,
    SystemClock, ALBUMS_FILE_NAME, CATALOG_FILE_NAME, DEFAULT_CACHE_TTL_MS,
};
use crate::renditions::{
    MediaProcessor, RasterProcessor, RenditionConfig, RenditionError, RenditionPipeline,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Fallback when neither the declared content type nor sniffing yields one.
const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// Default maximum accepted upload size: 100 MB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Per-file failure during ingestion. Wraps the first underlying cause.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    File(#[from] FileHandlerError),

    #[error(transparent)]
    Rendition(#[from] RenditionError),
}

/// Errors surfaced by the catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The durable snapshot could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Mutation target absent; client-correctable.
    #[error("image not found: {0}")]
    NotFound(String),

    /// A file in an ingestion batch failed; the batch was aborted without a
    /// partial catalog commit.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// One file of an ingestion batch, as handed over by the upload layer.
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Content type as declared by the uploader; sniffed from the bytes
    /// when empty.
    pub content_type: String,
    /// Declared size in bytes.
    pub size: u64,
    /// Source file's last-modified time, millis since epoch.
    pub last_modified: i64,
}

/// Configuration for the catalog core.
#[derive(Clone, Debug)]
pub struct GalleryCatalogConfig {
    /// Root directory holding originals, renditions and the snapshot files.
    pub storage_root: PathBuf,
    pub cache_ttl_ms: i64,
    pub max_file_size: u64,
    pub rendition: RenditionConfig,
}

impl GalleryCatalogConfig {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            rendition: RenditionConfig::default(),
        }
    }
}

/// The catalog core: image catalog and album list, each an in-memory cache
/// over its own JSON snapshot.
pub struct GalleryCatalog {
    storage_root: PathBuf,
    file_handler: FileHandler,
    pipeline: RenditionPipeline,
    images: SnapshotCache<ImageRecord>,
    albums: SnapshotCache<Album>,
    clock: Arc<dyn Clock>,
}

impl GalleryCatalog {
    /// Catalog with the stock raster processor and wall clock.
    pub fn new(config: GalleryCatalogConfig) -> Self {
        Self::with_collaborators(config, Arc::new(RasterProcessor), Arc::new(SystemClock))
    }

    /// Catalog with injected collaborators (tests, alternative codecs).
    pub fn with_collaborators(
        config: GalleryCatalogConfig,
        processor: Arc<dyn MediaProcessor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let images_store = Arc::new(FsSnapshotStore::<ImageRecord>::new(
            &config.storage_root,
            CATALOG_FILE_NAME,
        ));
        let albums_store = Arc::new(FsSnapshotStore::<Album>::new(
            &config.storage_root,
            ALBUMS_FILE_NAME,
        ));

        Self {
            file_handler: FileHandler::new(&config.storage_root, config.max_file_size),
            pipeline: RenditionPipeline::new(processor, config.rendition),
            images: SnapshotCache::new(images_store, config.cache_ttl_ms, clock.clone()),
            albums: SnapshotCache::new(albums_store, config.cache_ttl_ms, clock.clone()),
            clock,
            storage_root: config.storage_root,
        }
    }

    // =========================================================================
    // Read queries
    // =========================================================================

    /// The full ordered catalog.
    pub async fn list_catalog(&self) -> Result<Vec<ImageRecord>, CatalogError> {
        Ok(self.images.get().await?)
    }

    /// Ordered view of one album's images. Orphaned records (album id not
    /// matching) are simply excluded.
    pub async fn list_catalog_for_album(
        &self,
        album_id: &str,
    ) -> Result<Vec<ImageRecord>, CatalogError> {
        let catalog = self.images.get().await?;
        Ok(catalog
            .into_iter()
            .filter(|record| record.album_id == album_id)
            .collect())
    }

    /// The album definitions, loaded from their own snapshot.
    pub async fn list_albums(&self) -> Result<Vec<Album>, CatalogError> {
        Ok(self.albums.get().await?)
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Ingest a batch of uploads into `album_id`.
    ///
    /// Files are processed sequentially. A file whose derived id already
    /// exists is skipped (idempotent re-upload). Any failure aborts the
    /// whole batch before the catalog append: nothing accumulated so far is
    /// committed, though originals and renditions already written to disk
    /// stay there.
    ///
    /// Returns the records actually appended.
    pub async fn ingest(
        &self,
        files: Vec<UploadFile>,
        album_id: &str,
    ) -> Result<Vec<ImageRecord>, CatalogError> {
        let catalog = self.images.get().await?;
        let mut known_ids: HashSet<String> =
            catalog.into_iter().map(|record| record.id).collect();

        self.file_handler
            .ensure_album_dir(album_id)
            .await
            .map_err(StorageError::from)?;

        // Renditions are derived outside the write region on purpose: the
        // CPU-bound encoding must not serialize behind catalog writes.
        let mut accumulated = Vec::new();
        for file in files {
            let name = sanitize_filename(&file.name).map_err(StorageError::from)?;
            let id = ImageRecord::derive_id(album_id, &name);
            if known_ids.contains(&id) {
                debug!("Skipping {}: id {} already in catalog", name, id);
                continue;
            }

            let pathname = self
                .file_handler
                .save_original(album_id, &name, &file.bytes)
                .await
                .map_err(StorageError::from)?;

            let derived = self
                .pipeline
                .derive(&self.storage_root, &pathname)
                .await
                .map_err(StorageError::from)?;

            let content_type = resolve_content_type(&file.content_type, &file.bytes);
            let record = ImageRecord {
                aspect_ratio: ImageRecord::compute_aspect_ratio(derived.width, derived.height),
                id: id.clone(),
                album_id: album_id.to_string(),
                name,
                pathname,
                pathname_preview: derived.pathname_preview,
                pathname_thumb: derived.pathname_thumb,
                content_type,
                size: file.size,
                width: derived.width,
                height: derived.height,
                created_at: self.clock.now_millis(),
                updated_at: file.last_modified,
                metadata: (!derived.metadata.is_empty()).then_some(derived.metadata),
                presentation_info: None,
                presentation_settings: None,
            };

            known_ids.insert(id);
            accumulated.push(record);
        }

        if accumulated.is_empty() {
            return Ok(Vec::new());
        }

        // One append + flush for the whole batch, re-checking ids in case a
        // concurrent ingest won the race while renditions were encoding.
        let appended = self
            .images
            .mutate(|snapshot| {
                let mut appended = Vec::new();
                for record in accumulated {
                    if snapshot.iter().any(|r| r.id == record.id) {
                        continue;
                    }
                    snapshot.push(record.clone());
                    appended.push(record);
                }
                Some(appended)
            })
            .await?
            .unwrap_or_default();

        info!("Ingested {} images into album {}", appended.len(), album_id);
        Ok(appended)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Merge a partial update into one record and flush. Fields absent from
    /// the patch are left untouched.
    pub async fn update(&self, id: &str, patch: ImagePatch) -> Result<ImageRecord, CatalogError> {
        let updated = self
            .images
            .mutate(|snapshot| {
                let record = snapshot.iter_mut().find(|r| r.id == id)?;
                if let Some(info) = patch.presentation_info {
                    record
                        .presentation_info
                        .get_or_insert_with(Default::default)
                        .merge(info);
                }
                if let Some(settings) = patch.presentation_settings {
                    record
                        .presentation_settings
                        .get_or_insert_with(Default::default)
                        .merge(settings);
                }
                Some(record.clone())
            })
            .await?;

        updated.ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Remove one record by id and flush. The original and its renditions
    /// stay on disk.
    pub async fn delete(&self, id: &str) -> Result<(), CatalogError> {
        let removed = self
            .images
            .mutate(|snapshot| {
                let index = snapshot.iter().position(|r| r.id == id)?;
                Some(snapshot.remove(index))
            })
            .await?;

        match removed {
            Some(record) => {
                info!("Deleted {} from the catalog", record.id);
                Ok(())
            }
            None => Err(CatalogError::NotFound(id.to_string())),
        }
    }

    /// Register an album definition if its id is not present yet. Returns
    /// true when the album was appended.
    pub async fn register_album(&self, album: Album) -> Result<bool, CatalogError> {
        let appended = self
            .albums
            .mutate(|albums| {
                if albums.iter().any(|a| a.id == album.id) {
                    return None;
                }
                albums.push(album);
                Some(())
            })
            .await?;
        Ok(appended.is_some())
    }
}

fn resolve_content_type(declared: &str, bytes: &[u8]) -> String {
    if !declared.is_empty() {
        return declared.to_string();
    }
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| UNKNOWN_CONTENT_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::{PresentationInfo, PresentationSettings};
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 200, 30]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn upload(name: &str, width: u32, height: u32) -> UploadFile {
        let bytes = png_bytes(width, height);
        UploadFile {
            name: name.to_string(),
            content_type: "image/png".to_string(),
            size: bytes.len() as u64,
            last_modified: 1_700_000_000_000,
            bytes,
        }
    }

    fn catalog(dir: &TempDir) -> GalleryCatalog {
        GalleryCatalog::new(GalleryCatalogConfig::new(dir.path()))
    }

    #[tokio::test]
    async fn test_ingest_builds_complete_record() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);

        let records = catalog
            .ingest(vec![upload("sunset.png", 40, 30)], "vacation")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, "vacation/sunset");
        assert_eq!(record.pathname, "vacation/sunset.png");
        assert_eq!(record.pathname_preview, "vacation/sunset.png.preview.jpg");
        assert_eq!(record.pathname_thumb, "vacation/sunset.png.thumb.jpg");
        assert_eq!((record.width, record.height), (40, 30));
        assert_eq!(record.aspect_ratio, 40.0 / 30.0);
        assert_eq!(record.content_type, "image/png");
        assert_eq!(record.updated_at, 1_700_000_000_000);
        assert!(record.created_at > 0);
        // PNG carries no Exif; lenient mode leaves metadata empty.
        assert!(record.metadata.is_none());

        assert!(dir.path().join("vacation/sunset.png").exists());
        assert!(dir.path().join("vacation/sunset.png.preview.jpg").exists());
        assert!(dir.path().join("vacation/sunset.png.thumb.jpg").exists());
        assert!(dir.path().join(CATALOG_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_ingest_is_idempotent_per_id() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);

        let first = catalog
            .ingest(vec![upload("sunset.png", 16, 16)], "vacation")
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = catalog
            .ingest(vec![upload("sunset.png", 16, 16)], "vacation")
            .await
            .unwrap();
        assert!(second.is_empty());

        assert_eq!(catalog.list_catalog().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_failure_commits_nothing() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);

        let good = upload("first.png", 16, 16);
        let broken = UploadFile {
            name: "broken.png".to_string(),
            bytes: b"not an image".to_vec(),
            content_type: "image/png".to_string(),
            size: 12,
            last_modified: 0,
        };

        let err = catalog.ingest(vec![good, broken], "vacation").await;
        assert!(matches!(err, Err(CatalogError::Storage(_))));

        // The first file made it to disk but not into the catalog.
        assert!(dir.path().join("vacation/first.png").exists());
        assert!(catalog.list_catalog().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_field_level_across_calls() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        catalog
            .ingest(vec![upload("sunset.png", 16, 16)], "vacation")
            .await
            .unwrap();

        catalog
            .update(
                "vacation/sunset",
                ImagePatch {
                    presentation_info: Some(PresentationInfo {
                        title: Some("A".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let updated = catalog
            .update(
                "vacation/sunset",
                ImagePatch {
                    presentation_info: Some(PresentationInfo {
                        author: Some("B".to_string()),
                        ..Default::default()
                    }),
                    presentation_settings: Some(PresentationSettings {
                        sepia: Some(0.4),
                        ..Default::default()
                    }),
                },
            )
            .await
            .unwrap();

        let info = updated.presentation_info.unwrap();
        assert_eq!(info.title.as_deref(), Some("A"));
        assert_eq!(info.author.as_deref(), Some("B"));
        assert_eq!(updated.presentation_settings.unwrap().sepia, Some(0.4));

        // The merge survives a listing too.
        let listed = catalog.list_catalog().await.unwrap();
        let info = listed[0].presentation_info.clone().unwrap();
        assert_eq!(info.title.as_deref(), Some("A"));
        assert_eq!(info.author.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let err = catalog.update("nope/nothing", ImagePatch::default()).await;
        assert!(matches!(err, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one_then_not_found() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        catalog
            .ingest(
                vec![upload("one.png", 16, 16), upload("two.png", 16, 16)],
                "vacation",
            )
            .await
            .unwrap();

        catalog.delete("vacation/one").await.unwrap();
        let listed = catalog.list_catalog().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.iter().all(|r| r.id != "vacation/one"));

        // Files are intentionally left on disk.
        assert!(dir.path().join("vacation/one.png").exists());

        let err = catalog.delete("vacation/one").await;
        assert!(matches!(err, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_album_view_excludes_other_albums() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        catalog
            .ingest(vec![upload("a.png", 16, 16)], "vacation")
            .await
            .unwrap();
        catalog
            .ingest(vec![upload("b.png", 16, 16)], "work")
            .await
            .unwrap();

        let vacation = catalog.list_catalog_for_album("vacation").await.unwrap();
        assert_eq!(vacation.len(), 1);
        assert_eq!(vacation[0].id, "vacation/a");
        assert!(catalog
            .list_catalog_for_album("unknown")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_register_album_appends_once() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        let album = Album {
            id: "vacation".to_string(),
            name: "Vacation".to_string(),
            description: None,
        };

        assert!(catalog.register_album(album.clone()).await.unwrap());
        assert!(!catalog.register_album(album).await.unwrap());
        assert_eq!(catalog.list_albums().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_content_type_sniffs_when_undeclared() {
        let bytes = png_bytes(4, 4);
        assert_eq!(resolve_content_type("image/png", &bytes), "image/png");
        assert_eq!(resolve_content_type("", &bytes), "image/png");
        assert_eq!(resolve_content_type("", b"plain"), UNKNOWN_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_concurrent_updates_on_different_ids_both_survive() {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(catalog(&dir));
        catalog
            .ingest(
                vec![upload("one.png", 16, 16), upload("two.png", 16, 16)],
                "vacation",
            )
            .await
            .unwrap();

        let patch = |title: &str| ImagePatch {
            presentation_info: Some(PresentationInfo {
                title: Some(title.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let a = {
            let catalog = catalog.clone();
            let patch = patch("first");
            tokio::spawn(async move { catalog.update("vacation/one", patch).await })
        };
        let b = {
            let catalog = catalog.clone();
            let patch = patch("second");
            tokio::spawn(async move { catalog.update("vacation/two", patch).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let listed = catalog.list_catalog().await.unwrap();
        let title_of = |id: &str| {
            listed
                .iter()
                .find(|r| r.id == id)
                .and_then(|r| r.presentation_info.as_ref())
                .and_then(|i| i.title.clone())
        };
        assert_eq!(title_of("vacation/one").as_deref(), Some("first"));
        assert_eq!(title_of("vacation/two").as_deref(), Some("second"));
    }
}
