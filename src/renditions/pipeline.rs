//! Rendition derivation for one stored original.
//!
//! Pure derivation: given the path of a persisted original, produce the
//! bounded preview, the thumbnail and the extracted metadata, and probe the
//! original's dimensions. No catalog mutation happens here.

use super::processor::{MediaProcessor, RenditionError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Preview bound (long edge), reference behavior.
pub const PREVIEW_MAX_DIM: u32 = 1600;

/// Thumbnail bound (long edge), reference behavior.
pub const THUMB_MAX_DIM: u32 = 300;

/// Fixed encode quality for both renditions.
pub const RENDITION_QUALITY: u8 = 90;

/// File extension of encoded renditions.
pub const RENDITION_EXT: &str = "jpg";

#[derive(Clone, Debug)]
pub struct RenditionConfig {
    pub preview_max_dim: u32,
    pub thumb_max_dim: u32,
    pub quality: u8,
    /// When true a failed metadata extraction aborts the file's ingestion
    /// instead of proceeding with empty metadata.
    pub strict_metadata: bool,
}

impl Default for RenditionConfig {
    fn default() -> Self {
        Self {
            preview_max_dim: PREVIEW_MAX_DIM,
            thumb_max_dim: THUMB_MAX_DIM,
            quality: RENDITION_QUALITY,
            strict_metadata: false,
        }
    }
}

/// Everything derived from one original.
#[derive(Clone, Debug)]
pub struct DerivedRenditions {
    /// Storage-root-relative preview path.
    pub pathname_preview: String,
    /// Storage-root-relative thumbnail path.
    pub pathname_thumb: String,
    pub metadata: BTreeMap<String, String>,
    pub width: u32,
    pub height: u32,
}

pub struct RenditionPipeline {
    processor: Arc<dyn MediaProcessor>,
    config: RenditionConfig,
}

impl RenditionPipeline {
    pub fn new(processor: Arc<dyn MediaProcessor>, config: RenditionConfig) -> Self {
        Self { processor, config }
    }

    /// Derive preview, thumbnail, metadata and dimensions for the original
    /// at `pathname` (relative to `storage_root`).
    ///
    /// The four sub-operations share no state beyond the read-only source
    /// file and run concurrently. Metadata extraction fails soft unless
    /// `strict_metadata` is set.
    pub async fn derive(
        &self,
        storage_root: &Path,
        pathname: &str,
    ) -> Result<DerivedRenditions, RenditionError> {
        let pathname_preview = format!("{}.preview.{}", pathname, RENDITION_EXT);
        let pathname_thumb = format!("{}.thumb.{}", pathname, RENDITION_EXT);

        let source = storage_root.join(pathname);
        let preview_dest = storage_root.join(&pathname_preview);
        let thumb_dest = storage_root.join(&pathname_thumb);

        let (metadata, preview, thumb, dimensions) = tokio::join!(
            self.processor.read_embedded_metadata(&source),
            self.processor.resize_and_encode(
                &source,
                &preview_dest,
                self.config.preview_max_dim,
                self.config.preview_max_dim,
                self.config.quality,
            ),
            self.processor.resize_and_encode(
                &source,
                &thumb_dest,
                self.config.thumb_max_dim,
                self.config.thumb_max_dim,
                self.config.quality,
            ),
            self.processor.probe_dimensions(&source),
        );

        preview?;
        thumb?;
        let (width, height) = dimensions?;

        let metadata = match metadata {
            Ok(tags) => tags,
            Err(err) if !self.config.strict_metadata => {
                warn!("Metadata extraction failed for {}: {}", pathname, err);
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };

        Ok(DerivedRenditions {
            pathname_preview,
            pathname_thumb,
            metadata,
            width,
            height,
        })
    }
}
