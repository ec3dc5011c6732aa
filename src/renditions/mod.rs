//! Rendition derivation: preview/thumbnail generation and embedded metadata
//! extraction behind the media-processing capability trait.

mod pipeline;
mod processor;

pub use pipeline::{
    DerivedRenditions, RenditionConfig, RenditionPipeline, PREVIEW_MAX_DIM, RENDITION_EXT,
    RENDITION_QUALITY, THUMB_MAX_DIM,
};
pub use processor::{MediaProcessor, RasterProcessor, RenditionError};
