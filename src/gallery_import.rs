//! Gallery Import Tool
//!
//! Scans a directory for image files and ingests them into one album of a
//! gallery, writing originals, renditions and the catalog snapshot under
//! the gallery directory.

use anyhow::{bail, Context, Result};
use byte_unit::{Byte, UnitType};
use clap::Parser;
use gallery_catalog::catalog::FileHandler;
use gallery_catalog::config::{AppConfig, CliConfig, FileConfig};
use gallery_catalog::{Album, GalleryCatalog, UploadFile};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "gallery-import")]
#[command(about = "Ingest a directory of images into a gallery album")]
struct Args {
    /// Path to the gallery directory (storage root).
    #[arg(value_name = "GALLERY_DIR")]
    gallery_dir: PathBuf,

    /// Album id to ingest into (one path segment, e.g. "vacation").
    #[arg(value_name = "ALBUM_ID")]
    album_id: String,

    /// Directory to scan for image files.
    #[arg(value_name = "SOURCE_DIR")]
    source_dir: PathBuf,

    /// Optional TOML config file; its values override CLI flags.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Register the album in the album list under this display name if it
    /// is not defined yet.
    #[arg(long)]
    album_name: Option<String>,

    /// Snapshot validity window in hours.
    #[arg(long, default_value_t = 24)]
    cache_ttl_hours: u64,

    /// Maximum accepted file size in megabytes.
    #[arg(long, default_value_t = 100)]
    max_file_size_mb: u64,

    /// Abort a file's ingestion when its embedded tags cannot be read,
    /// instead of proceeding with empty metadata.
    #[arg(long, default_value_t = false)]
    strict_metadata: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let cli = CliConfig {
        gallery_dir: Some(args.gallery_dir.clone()),
        cache_ttl_hours: args.cache_ttl_hours,
        max_file_size_mb: args.max_file_size_mb,
        strict_metadata: args.strict_metadata,
    };
    let file_config = args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let config = AppConfig::resolve(&cli, file_config)?;

    info!("Gallery Import Tool");
    info!("===================");
    info!("Gallery: {}", config.gallery_dir.display());
    info!("Album:   {}", args.album_id);
    info!("Source:  {}", args.source_dir.display());

    let files = collect_uploads(&args.source_dir)?;
    if files.is_empty() {
        bail!("No supported image files found in {:?}", args.source_dir);
    }
    let total_bytes: u64 = files.iter().map(|f| f.size).sum();
    info!(
        "Found {} image files ({:.1})",
        files.len(),
        Byte::from_u64(total_bytes).get_appropriate_unit(UnitType::Binary)
    );

    let catalog = GalleryCatalog::new(config.catalog_config());

    if let Some(album_name) = args.album_name {
        let appended = catalog
            .register_album(Album {
                id: args.album_id.clone(),
                name: album_name,
                description: None,
            })
            .await?;
        if appended {
            info!("Registered album {}", args.album_id);
        } else {
            info!("Album {} already defined", args.album_id);
        }
    }

    let file_count = files.len();
    let ingested = catalog.ingest(files, &args.album_id).await?;
    let total = catalog.list_catalog().await?.len();

    info!(
        "Ingested {} new images ({} skipped as already present), catalog now holds {} records",
        ingested.len(),
        file_count - ingested.len(),
        total
    );
    for record in &ingested {
        info!(
            "  {} ({}x{}, {})",
            record.id,
            record.width,
            record.height,
            Byte::from_u64(record.size).get_appropriate_unit(UnitType::Binary)
        );
    }

    Ok(())
}

/// Scan `source_dir` recursively for supported image files and read them
/// into upload descriptors.
fn collect_uploads(source_dir: &PathBuf) -> Result<Vec<UploadFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to scan {:?}", source_dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            warn!("Skipping file with non-UTF-8 name: {:?}", entry.path());
            continue;
        };
        if !FileHandler::is_supported_image(name) {
            continue;
        }

        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to stat {:?}", entry.path()))?;
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {:?}", entry.path()))?;

        files.push(UploadFile {
            name: name.to_string(),
            content_type: String::new(), // sniffed from the bytes
            size: bytes.len() as u64,
            last_modified,
            bytes,
        });
    }
    Ok(files)
}
