//! Media processing capability behind a trait.
//!
//! The catalog core never touches codec internals directly: resizing,
//! embedded-tag extraction and dimension probing are capabilities it calls.
//! `RasterProcessor` is the stock implementation on top of the `image` and
//! `kamadak-exif` crates; tests substitute their own doubles.

use async_trait::async_trait;
use image::imageops::FilterType;
use std::collections::BTreeMap;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::task;

/// Errors from media processing.
#[derive(Debug, Error)]
pub enum RenditionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("metadata extraction failed: {0}")]
    Metadata(String),

    #[error("processing task failed: {0}")]
    Join(#[from] task::JoinError),
}

/// Capability interface consumed by the rendition pipeline.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Resize `source` to fit inside `max_width` x `max_height` without
    /// upscaling and encode it to a web-efficient lossy format at `quality`,
    /// writing the result to `dest`.
    async fn resize_and_encode(
        &self,
        source: &Path,
        dest: &Path,
        max_width: u32,
        max_height: u32,
        quality: u8,
    ) -> Result<(), RenditionError>;

    /// Extract embedded tags (Exif and friends) from the original.
    async fn read_embedded_metadata(
        &self,
        source: &Path,
    ) -> Result<BTreeMap<String, String>, RenditionError>;

    /// Pixel dimensions of the original, from the header where possible.
    async fn probe_dimensions(&self, source: &Path) -> Result<(u32, u32), RenditionError>;
}

/// `image`-crate backed processor. Decoding and encoding are CPU-bound, so
/// every operation runs on the blocking pool.
pub struct RasterProcessor;

#[async_trait]
impl MediaProcessor for RasterProcessor {
    async fn resize_and_encode(
        &self,
        source: &Path,
        dest: &Path,
        max_width: u32,
        max_height: u32,
        quality: u8,
    ) -> Result<(), RenditionError> {
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();
        task::spawn_blocking(move || resize_and_encode_blocking(&source, &dest, max_width, max_height, quality))
            .await?
    }

    async fn read_embedded_metadata(
        &self,
        source: &Path,
    ) -> Result<BTreeMap<String, String>, RenditionError> {
        let source = source.to_path_buf();
        task::spawn_blocking(move || read_exif_blocking(&source)).await?
    }

    async fn probe_dimensions(&self, source: &Path) -> Result<(u32, u32), RenditionError> {
        let source = source.to_path_buf();
        task::spawn_blocking(move || Ok(image::image_dimensions(&source)?)).await?
    }
}

fn resize_and_encode_blocking(
    source: &Path,
    dest: &Path,
    max_width: u32,
    max_height: u32,
    quality: u8,
) -> Result<(), RenditionError> {
    let img = image::open(source)?;
    let (width, height) = (img.width(), img.height());

    // Proportional fit, never upscale.
    let img = if width > max_width || height > max_height {
        img.resize(max_width, max_height, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel.
    let rgb = img.into_rgb8();
    let file = std::fs::File::create(dest)?;
    let mut writer = BufWriter::new(file);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(())
}

fn read_exif_blocking(source: &Path) -> Result<BTreeMap<String, String>, RenditionError> {
    let file = std::fs::File::open(source)?;
    let mut reader = std::io::BufReader::new(file);
    let exif = exif::Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| RenditionError::Metadata(e.to_string()))?;

    let mut tags = BTreeMap::new();
    for field in exif.fields() {
        // Thumbnail-IFD fields duplicate the primary ones.
        if field.ifd_num != exif::In::PRIMARY {
            continue;
        }
        tags.insert(field.tag.to_string(), field.display_value().to_string());
    }
    Ok(tags)
}
