//! Gallery Catalog Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod catalog;
pub mod catalog_store;
pub mod config;
pub mod renditions;

// Re-export commonly used types for convenience
pub use catalog::{CatalogError, GalleryCatalog, GalleryCatalogConfig, UploadFile};
pub use catalog_store::{Album, ImagePatch, ImageRecord, StoreError};
pub use renditions::{MediaProcessor, RasterProcessor};
