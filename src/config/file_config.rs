use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub gallery_dir: Option<String>,
    pub cache_ttl_hours: Option<u64>,
    pub max_file_size_mb: Option<u64>,

    // Rendition settings
    pub renditions: Option<RenditionFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RenditionFileConfig {
    pub preview_max_dim: Option<u32>,
    pub thumb_max_dim: Option<u32>,
    pub quality: Option<u8>,
    pub strict_metadata: Option<bool>,
}

impl FileConfig {
    /// Load TOML configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }
}
