mod file_config;

pub use file_config::{FileConfig, RenditionFileConfig};

use crate::catalog::GalleryCatalogConfig;
use crate::renditions::{RenditionConfig, PREVIEW_MAX_DIM, RENDITION_QUALITY, THUMB_MAX_DIM};
use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub gallery_dir: Option<PathBuf>,
    pub cache_ttl_hours: u64,
    pub max_file_size_mb: u64,
    pub strict_metadata: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gallery_dir: PathBuf,
    pub cache_ttl_hours: u64,
    pub max_file_size_mb: u64,
    pub renditions: RenditionSettings,
}

#[derive(Debug, Clone)]
pub struct RenditionSettings {
    pub preview_max_dim: u32,
    pub thumb_max_dim: u32,
    pub quality: u8,
    pub strict_metadata: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let gallery_dir = file
            .gallery_dir
            .map(PathBuf::from)
            .or_else(|| cli.gallery_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("gallery_dir must be specified via --gallery-dir or in config file")
            })?;

        // The gallery dir is created on the first flush, but an existing
        // non-directory path is a configuration mistake.
        if gallery_dir.exists() && !gallery_dir.is_dir() {
            bail!("gallery_dir is not a directory: {:?}", gallery_dir);
        }

        let cache_ttl_hours = file.cache_ttl_hours.unwrap_or(cli.cache_ttl_hours);
        if cache_ttl_hours == 0 {
            bail!("cache_ttl_hours must be at least 1");
        }

        let max_file_size_mb = file.max_file_size_mb.unwrap_or(cli.max_file_size_mb);
        if max_file_size_mb == 0 {
            bail!("max_file_size_mb must be at least 1");
        }

        let renditions_file = file.renditions.unwrap_or_default();
        let renditions = RenditionSettings {
            preview_max_dim: renditions_file.preview_max_dim.unwrap_or(PREVIEW_MAX_DIM),
            thumb_max_dim: renditions_file.thumb_max_dim.unwrap_or(THUMB_MAX_DIM),
            quality: renditions_file.quality.unwrap_or(RENDITION_QUALITY),
            strict_metadata: renditions_file
                .strict_metadata
                .unwrap_or(cli.strict_metadata),
        };
        if renditions.quality == 0 || renditions.quality > 100 {
            bail!("rendition quality must be within 1..=100");
        }

        Ok(Self {
            gallery_dir,
            cache_ttl_hours,
            max_file_size_mb,
            renditions,
        })
    }

    /// The catalog core config derived from this application config.
    pub fn catalog_config(&self) -> GalleryCatalogConfig {
        GalleryCatalogConfig {
            storage_root: self.gallery_dir.clone(),
            cache_ttl_ms: self.cache_ttl_hours as i64 * 3_600_000,
            max_file_size: self.max_file_size_mb * 1024 * 1024,
            rendition: RenditionConfig {
                preview_max_dim: self.renditions.preview_max_dim,
                thumb_max_dim: self.renditions.thumb_max_dim,
                quality: self.renditions.quality,
                strict_metadata: self.renditions.strict_metadata,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_with_gallery(dir: &TempDir) -> CliConfig {
        CliConfig {
            gallery_dir: Some(dir.path().to_path_buf()),
            cache_ttl_hours: 24,
            max_file_size_mb: 100,
            strict_metadata: false,
        }
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&cli_with_gallery(&temp_dir), None).unwrap();

        assert_eq!(config.gallery_dir, temp_dir.path());
        assert_eq!(config.cache_ttl_hours, 24);
        assert_eq!(config.renditions.preview_max_dim, PREVIEW_MAX_DIM);
        assert_eq!(config.renditions.thumb_max_dim, THUMB_MAX_DIM);
        assert_eq!(config.renditions.quality, RENDITION_QUALITY);
        assert!(!config.renditions.strict_metadata);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            gallery_dir: Some(PathBuf::from("/should/be/overridden")),
            cache_ttl_hours: 24,
            max_file_size_mb: 100,
            strict_metadata: false,
        };
        let file = FileConfig {
            gallery_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            cache_ttl_hours: Some(6),
            renditions: Some(RenditionFileConfig {
                thumb_max_dim: Some(256),
                strict_metadata: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();
        assert_eq!(config.gallery_dir, temp_dir.path());
        assert_eq!(config.cache_ttl_hours, 6);
        assert_eq!(config.renditions.thumb_max_dim, 256);
        assert!(config.renditions.strict_metadata);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.max_file_size_mb, 100);
        assert_eq!(config.renditions.preview_max_dim, PREVIEW_MAX_DIM);
    }

    #[test]
    fn test_resolve_missing_gallery_dir_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("gallery_dir must be specified"));
    }

    #[test]
    fn test_resolve_gallery_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            gallery_dir: Some(temp_file.path().to_path_buf()),
            cache_ttl_hours: 24,
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_rejects_invalid_quality() {
        let temp_dir = TempDir::new().unwrap();
        let mut cli = cli_with_gallery(&temp_dir);
        cli.cache_ttl_hours = 24;
        let file = FileConfig {
            renditions: Some(RenditionFileConfig {
                quality: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, Some(file)).is_err());
    }

    #[test]
    fn test_catalog_config_unit_conversion() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&cli_with_gallery(&temp_dir), None).unwrap();
        let catalog = config.catalog_config();
        assert_eq!(catalog.cache_ttl_ms, 24 * 3_600_000);
        assert_eq!(catalog.max_file_size, 100 * 1024 * 1024);
    }
}
