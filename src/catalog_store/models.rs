//! Catalog models for the JSON snapshot store.
//!
//! Serde attributes pin the wire names to the snapshot format produced by
//! earlier deployments (`albumId`, `pathname_preview`, `bluredBackground`,
//! ...), so existing `gallery_info.json` files keep loading unchanged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Image records
// =============================================================================

/// One cataloged image: the stored original plus its derived renditions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// Unique across the catalog: `"{album_id}/{stem}"`.
    pub id: String,
    pub album_id: String,
    /// Original filename as uploaded (sanitized).
    pub name: String,
    /// Path of the original, relative to the storage root.
    pub pathname: String,
    #[serde(rename = "pathname_preview")]
    pub pathname_preview: String,
    #[serde(rename = "pathname_thumb")]
    pub pathname_thumb: String,
    pub content_type: String,
    /// Declared upload size in bytes.
    pub size: u64,
    pub width: u32,
    pub height: u32,
    /// width / height, 1.0 when the height is unknown.
    pub aspect_ratio: f64,
    /// Ingestion time, millis since epoch.
    #[serde(default)]
    pub created_at: i64,
    /// Source file's last-modified time, millis since epoch.
    pub updated_at: i64,
    /// Embedded tags extracted from the original, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_info: Option<PresentationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_settings: Option<PresentationSettings>,
}

impl ImageRecord {
    /// Deterministic record id for a file uploaded into an album.
    ///
    /// The stem is everything before the first `.`, so a re-upload of
    /// `sunset.jpg` and `sunset.png` into the same album collide on purpose.
    pub fn derive_id(album_id: &str, name: &str) -> String {
        let stem = name.split('.').next().unwrap_or(name);
        format!("{}/{}", album_id, stem)
    }

    /// Aspect ratio with the documented zero-height fallback.
    pub fn compute_aspect_ratio(width: u32, height: u32) -> f64 {
        if height == 0 {
            1.0
        } else {
            width as f64 / height as f64
        }
    }
}

/// User-editable descriptive fields. Every field is optional so a partial
/// patch can express "leave untouched" (`None`) vs "overwrite" (`Some`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
}

impl PresentationInfo {
    /// Field-level merge: a `Some` in the patch overwrites, a `None` keeps
    /// the existing value.
    pub fn merge(&mut self, patch: PresentationInfo) {
        if patch.title.is_some() {
            self.title = patch.title;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if patch.author.is_some() {
            self.author = patch.author;
        }
        if patch.copyright.is_some() {
            self.copyright = patch.copyright;
        }
        if patch.license.is_some() {
            self.license = patch.license;
        }
        if patch.tags.is_some() {
            self.tags = patch.tags;
        }
        if patch.is_hidden.is_some() {
            self.is_hidden = patch.is_hidden;
        }
    }
}

/// User-editable display parameters (CSS-filter-style adjustments, crop and
/// frame geometry). Same optional-field patch semantics as
/// [`PresentationInfo`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sepia: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturate: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<bool>,
    // Wire name predates the spelling fix.
    #[serde(
        default,
        rename = "bluredBackground",
        skip_serializing_if = "Option::is_none"
    )]
    pub blurred_background: Option<bool>,
    /// Crop rectangle: x, y, width, height as fractions of the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<[f32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_field: Option<[f32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_color: Option<String>,
}

impl PresentationSettings {
    pub fn merge(&mut self, patch: PresentationSettings) {
        if patch.light.is_some() {
            self.light = patch.light;
        }
        if patch.blur.is_some() {
            self.blur = patch.blur;
        }
        if patch.sepia.is_some() {
            self.sepia = patch.sepia;
        }
        if patch.saturate.is_some() {
            self.saturate = patch.saturate;
        }
        if patch.contrast.is_some() {
            self.contrast = patch.contrast;
        }
        if patch.shadow.is_some() {
            self.shadow = patch.shadow;
        }
        if patch.blurred_background.is_some() {
            self.blurred_background = patch.blurred_background;
        }
        if patch.crop.is_some() {
            self.crop = patch.crop;
        }
        if patch.frame_field.is_some() {
            self.frame_field = patch.frame_field;
        }
        if patch.frame_color.is_some() {
            self.frame_color = patch.frame_color;
        }
    }
}

/// Partial update applied to one [`ImageRecord`] by the update operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_info: Option<PresentationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_settings: Option<PresentationSettings>,
}

// =============================================================================
// Albums
// =============================================================================

/// Album definition as stored in `albums_list.json`.
///
/// Image membership is never persisted here; it is derived by filtering the
/// catalog on `album_id`. Album definitions are authored externally and
/// loaded read-only by this core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
