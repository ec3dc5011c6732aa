//! File handling for image uploads.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Errors that can occur during file handling.
#[derive(Debug, Error)]
pub enum FileHandlerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Invalid album id: {0}")]
    InvalidAlbumId(String),

    #[error("File too large: {0} bytes (max: {1})")]
    FileTooLarge(u64, u64),
}

/// Supported image file extensions.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "tiff", "bmp"];

/// Persists original image bytes under the storage root.
pub struct FileHandler {
    storage_root: PathBuf,
    /// Maximum accepted upload size in bytes.
    max_file_size: u64,
}

impl FileHandler {
    pub fn new(storage_root: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            storage_root: storage_root.into(),
            max_file_size,
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Create the album's storage directory if it does not exist yet.
    pub async fn ensure_album_dir(&self, album_id: &str) -> Result<(), FileHandlerError> {
        let album_id = sanitize_album_id(album_id)?;
        fs::create_dir_all(self.storage_root.join(album_id)).await?;
        Ok(())
    }

    /// Persist raw upload bytes as `{album_id}/{name}` under the storage
    /// root. Returns the sanitized root-relative pathname.
    pub async fn save_original(
        &self,
        album_id: &str,
        name: &str,
        data: &[u8],
    ) -> Result<String, FileHandlerError> {
        let size = data.len() as u64;
        if size > self.max_file_size {
            return Err(FileHandlerError::FileTooLarge(size, self.max_file_size));
        }

        let album_id = sanitize_album_id(album_id)?;
        let safe_name = sanitize_filename(name)?;
        let pathname = format!("{}/{}", album_id, safe_name);

        let file_path = self.storage_root.join(&pathname);
        let mut file = fs::File::create(&file_path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(pathname)
    }

    /// Check if a file is a supported image format.
    pub fn is_supported_image(filename: &str) -> bool {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        ext.map(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
            .unwrap_or(false)
    }
}

/// Sanitize a filename to prevent path traversal attacks.
pub fn sanitize_filename(filename: &str) -> Result<String, FileHandlerError> {
    // Get just the filename part (no path)
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FileHandlerError::InvalidFilename(filename.to_string()))?;

    // Null bytes are never allowed; hidden files and "." / ".." are not
    // valid upload names.
    if name.contains('\0') || name.starts_with('.') {
        return Err(FileHandlerError::InvalidFilename(filename.to_string()));
    }

    // Replace problematic characters (keep Unicode letters/symbols)
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();

    if sanitized.is_empty() {
        return Err(FileHandlerError::InvalidFilename(filename.to_string()));
    }

    Ok(sanitized)
}

/// An album id doubles as a single directory name under the storage root,
/// so it must be one plain path segment.
pub fn sanitize_album_id(album_id: &str) -> Result<&str, FileHandlerError> {
    if album_id.is_empty()
        || album_id.contains('/')
        || album_id.contains('\\')
        || album_id.contains('\0')
        || album_id.starts_with('.')
    {
        return Err(FileHandlerError::InvalidAlbumId(album_id.to_string()));
    }
    Ok(album_id)
}
