//! The catalog core: ingestion coordination, point mutations and read
//! queries over the snapshot caches.

mod file_handler;
mod service;

pub use file_handler::{FileHandler, FileHandlerError};
pub use service::{
    CatalogError, GalleryCatalog, GalleryCatalogConfig, StorageError, UploadFile,
    DEFAULT_MAX_FILE_SIZE,
};
